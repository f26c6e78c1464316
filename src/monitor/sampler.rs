use std::cell::Cell;

use crate::canvas::{Canvas, Rect, Rgb};

use super::{BridgeError, HostBridge};

/// Height of each usage bar in canvas units
const BAR_HEIGHT: f64 = 10.0;
const BAR_COLOR: Rgb = Rgb::RED;

/// Latest values fetched from the host
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub cpu_count: usize,
    /// Used memory fraction
    pub memory: f64,
    /// CPU load fraction
    pub cpu: f64,
}

/// Caches host metrics and paints them as two horizontal bars.
///
/// Fields are written independently as their queries resolve, so a render that
/// runs while an update is in flight may see a mix of old and new values.
pub struct MetricsSampler {
    bridge: Box<dyn HostBridge>,
    snapshot: Cell<MetricsSnapshot>,
}

impl MetricsSampler {
    pub fn new(bridge: impl HostBridge + 'static) -> Self {
        Self {
            bridge: Box::new(bridge),
            snapshot: Cell::new(MetricsSnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.snapshot.get()
    }

    /// Fetch all three metrics concurrently.
    ///
    /// Every query runs to completion. Fields whose query failed keep their
    /// previous value and the first failure is returned.
    pub async fn update(&self) -> Result<(), BridgeError> {
        let cpu_count = async {
            let value = self.bridge.cpu_count().await?;
            self.store(|s| s.cpu_count = value);
            Ok::<_, BridgeError>(())
        };
        let memory = async {
            let value = self.bridge.memory().await?;
            self.store(|s| s.memory = value);
            Ok::<_, BridgeError>(())
        };
        let cpu = async {
            let value = self.bridge.cpu().await?;
            self.store(|s| s.cpu = value);
            Ok::<_, BridgeError>(())
        };

        let (cpu_count, memory, cpu) = futures::join!(cpu_count, memory, cpu);
        cpu_count.and(memory).and(cpu)
    }

    /// Clear the canvas and paint memory usage at the top, CPU load below it.
    pub fn render(&self, canvas: &mut dyn Canvas) {
        let snapshot = self.snapshot.get();
        let width = canvas.width();

        canvas.clear();
        canvas.fill_rect(
            Rect::new(0.0, 0.0, bar_width(snapshot.memory, width), BAR_HEIGHT),
            BAR_COLOR,
        );
        canvas.fill_rect(
            Rect::new(0.0, BAR_HEIGHT, bar_width(snapshot.cpu, width), BAR_HEIGHT),
            BAR_COLOR,
        );
    }

    fn store(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        let mut snapshot = self.snapshot.get();
        apply(&mut snapshot);
        self.snapshot.set(snapshot);
    }
}

// NaN and negative fractions paint nothing; values above 1 overdraw.
fn bar_width(fraction: f64, canvas_width: f64) -> f64 {
    (fraction * canvas_width).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawOp, RecordingCanvas};
    use crate::monitor::BridgeFuture;
    use futures::executor::block_on;
    use futures::future::{self, FutureExt};
    use std::rc::Rc;

    struct FakeBridge {
        cpu_count: Option<usize>,
        memory: Option<f64>,
        cpu: Option<f64>,
    }

    impl FakeBridge {
        fn ok(cpu_count: usize, memory: f64, cpu: f64) -> Self {
            Self {
                cpu_count: Some(cpu_count),
                memory: Some(memory),
                cpu: Some(cpu),
            }
        }

        fn failing() -> Self {
            Self {
                cpu_count: None,
                memory: None,
                cpu: None,
            }
        }
    }

    fn reply<T: 'static>(query: &'static str, value: Option<T>) -> BridgeFuture<T> {
        future::ready(value.ok_or(BridgeError::Unavailable(query))).boxed_local()
    }

    impl HostBridge for FakeBridge {
        fn cpu_count(&self) -> BridgeFuture<usize> {
            reply("cpu_count", self.cpu_count)
        }

        fn memory(&self) -> BridgeFuture<f64> {
            reply("memory", self.memory)
        }

        fn cpu(&self) -> BridgeFuture<f64> {
            reply("cpu", self.cpu)
        }
    }

    /// Bridge that starts failing CPU queries once `healthy` is cleared
    struct SwitchBridge {
        healthy: Rc<Cell<bool>>,
    }

    impl HostBridge for SwitchBridge {
        fn cpu_count(&self) -> BridgeFuture<usize> {
            reply("cpu_count", Some(8))
        }

        fn memory(&self) -> BridgeFuture<f64> {
            reply("memory", Some(if self.healthy.get() { 0.4 } else { 0.9 }))
        }

        fn cpu(&self) -> BridgeFuture<f64> {
            reply("cpu", self.healthy.get().then_some(0.2))
        }
    }

    #[test]
    fn update_replaces_snapshot() {
        let sampler = MetricsSampler::new(FakeBridge::ok(4, 0.5, 0.25));
        block_on(sampler.update()).unwrap();

        assert_eq!(
            sampler.snapshot(),
            MetricsSnapshot {
                cpu_count: 4,
                memory: 0.5,
                cpu: 0.25,
            }
        );
    }

    #[test]
    fn total_failure_keeps_previous_snapshot() {
        let sampler = MetricsSampler::new(FakeBridge::failing());
        let before = sampler.snapshot();

        assert!(block_on(sampler.update()).is_err());
        assert_eq!(sampler.snapshot(), before);
    }

    #[test]
    fn partial_failure_updates_only_succeeded_fields() {
        let healthy = Rc::new(Cell::new(true));
        let sampler = MetricsSampler::new(SwitchBridge {
            healthy: Rc::clone(&healthy),
        });
        block_on(sampler.update()).unwrap();

        healthy.set(false);
        let err = block_on(sampler.update()).unwrap_err();

        assert!(matches!(err, BridgeError::Unavailable("cpu")));
        let snapshot = sampler.snapshot();
        assert_eq!(snapshot.cpu_count, 8);
        assert_eq!(snapshot.memory, 0.9);
        assert_eq!(snapshot.cpu, 0.2);
    }

    #[test]
    fn render_scales_bars_to_canvas_width() {
        let sampler = MetricsSampler::new(FakeBridge::ok(2, 0.5, 0.25));
        block_on(sampler.update()).unwrap();

        let mut canvas = RecordingCanvas::new(200.0);
        sampler.render(&mut canvas);

        assert_eq!(
            canvas.ops,
            vec![
                DrawOp::Clear,
                DrawOp::Fill(Rect::new(0.0, 0.0, 100.0, 10.0), Rgb::RED),
                DrawOp::Fill(Rect::new(0.0, 10.0, 50.0, 10.0), Rgb::RED),
            ]
        );
    }

    #[test]
    fn render_before_any_update_draws_empty_bars() {
        let sampler = MetricsSampler::new(FakeBridge::failing());

        let mut canvas = RecordingCanvas::new(200.0);
        sampler.render(&mut canvas);

        assert_eq!(canvas.ops[0], DrawOp::Clear);
        assert!(canvas.filled().iter().all(|rect| rect.width == 0.0));
    }

    #[test]
    fn out_of_range_fractions_do_not_panic() {
        let sampler = MetricsSampler::new(FakeBridge::ok(1, f64::NAN, 1.5));
        block_on(sampler.update()).unwrap();

        let mut canvas = RecordingCanvas::new(100.0);
        sampler.render(&mut canvas);

        let filled = canvas.filled();
        assert_eq!(filled[0].width, 0.0);
        assert_eq!(filled[1].width, 150.0);
    }
}
