mod cpu;
mod memory;
mod sampler;

use std::sync::{Arc, Mutex};

use futures::future::{FutureExt, LocalBoxFuture};
use thiserror::Error;

pub use cpu::CpuMonitor;
pub use memory::MemoryMonitor;
pub use sampler::MetricsSampler;

/// Pending result of a host query.
pub type BridgeFuture<T> = LocalBoxFuture<'static, Result<T, BridgeError>>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("host query `{0}` returned no data")]
    Unavailable(&'static str),
    #[error("host query `{0}` panicked on the worker pool")]
    Panicked(&'static str),
    #[error("host query `{0}` found its monitor poisoned")]
    Poisoned(&'static str),
}

/// Queries the host for the metrics painted by the widget.
///
/// Each query is independent and may fail; callers may run them concurrently.
pub trait HostBridge {
    fn cpu_count(&self) -> BridgeFuture<usize>;
    /// Used physical memory as a fraction of total.
    fn memory(&self) -> BridgeFuture<f64>;
    /// Average CPU load across cores as a fraction.
    fn cpu(&self) -> BridgeFuture<f64>;
}

/// Host bridge backed by sysinfo, with every query run on the GIO blocking pool
pub struct SysinfoBridge {
    cpu: Arc<Mutex<CpuMonitor>>,
    memory: Arc<Mutex<MemoryMonitor>>,
}

impl SysinfoBridge {
    pub fn new() -> Self {
        Self {
            cpu: Arc::new(Mutex::new(CpuMonitor::new())),
            memory: Arc::new(Mutex::new(MemoryMonitor::new())),
        }
    }
}

impl Default for SysinfoBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBridge for SysinfoBridge {
    fn cpu_count(&self) -> BridgeFuture<usize> {
        offload("cpu_count", &self.cpu, |cpu| match cpu.core_count() {
            0 => None,
            count => Some(count),
        })
    }

    fn memory(&self) -> BridgeFuture<f64> {
        offload("memory", &self.memory, |memory| {
            memory.refresh();
            memory.usage()
        })
    }

    fn cpu(&self) -> BridgeFuture<f64> {
        offload("cpu", &self.cpu, |cpu| {
            cpu.refresh();
            cpu.average_usage()
        })
    }
}

fn offload<M, T, F>(query: &'static str, monitor: &Arc<Mutex<M>>, read: F) -> BridgeFuture<T>
where
    M: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&mut M) -> Option<T> + Send + 'static,
{
    let monitor = Arc::clone(monitor);
    async move {
        let handle = gio::spawn_blocking(move || {
            let mut guard = monitor.lock().map_err(|_| BridgeError::Poisoned(query))?;
            read(&mut *guard).ok_or(BridgeError::Unavailable(query))
        });
        handle.await.map_err(|_| BridgeError::Panicked(query))?
    }
    .boxed_local()
}
