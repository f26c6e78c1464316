use std::time::Instant;

use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};

pub struct CpuMonitor {
    system: System,
    last_refresh: Instant,
}

impl CpuMonitor {
    pub fn new() -> Self {
        let mut system = System::new();
        // Initial refresh to get baseline
        system.refresh_cpu_usage();
        Self {
            system,
            last_refresh: Instant::now(),
        }
    }

    /// Refresh usage counters. Calls closer together than sysinfo can measure
    /// keep the previous reading.
    pub fn refresh(&mut self) {
        if self.last_refresh.elapsed() < MINIMUM_CPU_UPDATE_INTERVAL {
            return;
        }
        self.system.refresh_cpu_usage();
        self.last_refresh = Instant::now();
    }

    /// Returns average CPU usage across all cores as a value between 0.0 and 1.0,
    /// or `None` when the host reports no cores.
    pub fn average_usage(&self) -> Option<f64> {
        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return None;
        }

        let total: f32 = cpus.iter().map(|cpu| cpu.cpu_usage()).sum();
        Some((total / cpus.len() as f32) as f64 / 100.0)
    }

    /// Returns the number of CPU cores
    pub fn core_count(&self) -> usize {
        self.system.cpus().len()
    }
}

impl Default for CpuMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_cores_and_bounded_usage() {
        let mut monitor = CpuMonitor::new();
        monitor.refresh();

        assert!(monitor.core_count() > 0);
        let usage = monitor.average_usage().unwrap();
        assert!((0.0..=1.0).contains(&usage));
    }
}
