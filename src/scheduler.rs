use glib::ControlFlow;
use gtk::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::monitor::MetricsSampler;
use crate::settings::{Rates, SettingsStore};

/// How rendering and metric updates share the frame clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerMode {
    /// Every rendered frame first fetches fresh metrics (one gate at `fps`)
    Coupled,
    /// Rendering at `fps` and updates at `ups`, independently
    #[default]
    Decoupled,
}

/// Cancellation flag shared between the scheduler and whoever shuts it down.
///
/// Safe to trigger from any thread, e.g. a signal handler.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fires at most once per interval.
///
/// When it fires, the baseline moves to `now - (elapsed mod interval)`, so the
/// time lost to frame granularity is carried into the next interval instead of
/// accumulating.
#[derive(Debug, Clone, Default)]
pub struct IntervalGate {
    last: Option<f64>,
}

impl IntervalGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when at least `interval` ms have passed since the baseline.
    /// The first poll always fires.
    pub fn poll(&mut self, now: f64, interval: f64) -> bool {
        let Some(last) = self.last else {
            self.last = Some(now);
            return true;
        };

        let elapsed = now - last;
        if elapsed >= interval {
            self.last = Some(now - elapsed % interval);
            true
        } else {
            false
        }
    }

    /// Time already counted toward the next interval
    #[cfg(test)]
    fn carried(&self, now: f64) -> f64 {
        self.last.map_or(0.0, |last| now - last)
    }
}

/// What a tick decided to do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickActions {
    pub render: bool,
    pub update: bool,
}

fn interval_ms(per_second: f64) -> f64 {
    1000.0 / per_second
}

pub struct FrameScheduler {
    mode: SchedulerMode,
    render_gate: IntervalGate,
    update_gate: IntervalGate,
    stop: StopToken,
}

impl FrameScheduler {
    pub fn new(mode: SchedulerMode, stop: StopToken) -> Self {
        Self {
            mode,
            render_gate: IntervalGate::new(),
            update_gate: IntervalGate::new(),
            stop,
        }
    }

    /// Decide what to run at `now` (ms on a monotonic clock).
    ///
    /// Intervals are derived from `rates` on every call, so rate changes apply
    /// to the very next tick. A stopped scheduler never acts.
    pub fn tick(&mut self, now: f64, rates: Rates) -> TickActions {
        if self.stop.is_stopped() {
            return TickActions::default();
        }

        let render = self.render_gate.poll(now, interval_ms(rates.fps));
        let update = match self.mode {
            SchedulerMode::Coupled => render,
            SchedulerMode::Decoupled => self.update_gate.poll(now, interval_ms(rates.ups)),
        };

        TickActions { render, update }
    }

    /// Drive the scheduler from the canvas' frame clock until the stop token
    /// is triggered.
    pub fn attach(
        self,
        canvas: &gtk::DrawingArea,
        sampler: Rc<MetricsSampler>,
        settings: Rc<SettingsStore>,
    ) -> gtk::TickCallbackId {
        tracing::info!("frame scheduler started in {:?} mode", self.mode);

        let stop = self.stop.clone();
        let mode = self.mode;
        let scheduler = RefCell::new(self);
        let origin = RefCell::new(None::<i64>);

        canvas.add_tick_callback(move |canvas, clock| {
            if stop.is_stopped() {
                tracing::info!("frame scheduler stopped");
                return ControlFlow::Break;
            }

            // Frame time is in microseconds.
            let frame_time = clock.frame_time();
            let origin = *origin.borrow_mut().get_or_insert(frame_time);
            let now = (frame_time - origin) as f64 / 1000.0;

            let actions = scheduler.borrow_mut().tick(now, settings.rates());

            match mode {
                SchedulerMode::Coupled if actions.render => {
                    tracing::debug!(now, "fetch and render");
                    spawn_update(&sampler, Some((canvas.clone(), stop.clone())));
                }
                SchedulerMode::Coupled => {}
                SchedulerMode::Decoupled => {
                    if actions.update {
                        tracing::debug!(now, "update");
                        spawn_update(&sampler, None);
                    }
                    if actions.render {
                        tracing::debug!(now, "render");
                        canvas.queue_draw();
                    }
                }
            }

            ControlFlow::Continue
        })
    }
}

/// Run one metrics update on the main context without blocking the tick,
/// optionally redrawing once it lands.
fn spawn_update(sampler: &Rc<MetricsSampler>, redraw: Option<(gtk::DrawingArea, StopToken)>) {
    let sampler = Rc::clone(sampler);
    glib::MainContext::default().spawn_local(async move {
        match sampler.update().await {
            Ok(()) => tracing::trace!(snapshot = ?sampler.snapshot(), "metrics updated"),
            Err(e) => tracing::warn!("skipping metrics update: {}", e),
        }
        if let Some((canvas, stop)) = redraw {
            if !stop.is_stopped() {
                canvas.queue_draw();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f64 = 1000.0 / 60.0;
    /// Tick spacing with exact float arithmetic, for counting tests
    const STEP: f64 = 10.0;

    fn rates(fps: f64, ups: f64) -> Rates {
        Rates { fps, ups }
    }

    #[test]
    fn gate_fires_on_first_poll_then_waits_an_interval() {
        let mut gate = IntervalGate::new();

        assert!(gate.poll(5.0, 100.0));
        assert!(!gate.poll(50.0, 100.0));
        assert!(!gate.poll(104.9, 100.0));
        assert!(gate.poll(105.0, 100.0));
    }

    #[test]
    fn gate_carries_remainder_instead_of_resetting() {
        let mut gate = IntervalGate::new();
        gate.poll(0.0, 100.0);

        assert!(gate.poll(130.0, 100.0));
        // Baseline moved to 100, not 130.
        assert_eq!(gate.carried(130.0), 30.0);
        assert!(gate.poll(200.0, 100.0));
    }

    #[test]
    fn gate_drift_stays_below_one_interval() {
        let interval = 1000.0 / 7.0;
        let mut gate = IntervalGate::new();
        let ticks_per_interval = (interval / FRAME).ceil() as usize;

        let mut fires = 0;
        let mut since_fire = 0;
        for i in 0..6000 {
            let now = i as f64 * FRAME;
            if gate.poll(now, interval) {
                fires += 1;
                since_fire = 0;
                assert!(gate.carried(now) < interval);
            } else {
                since_fire += 1;
                assert!(since_fire < ticks_per_interval + 1);
            }
        }

        let elapsed = 5999.0 * FRAME;
        let expected = (elapsed / interval).floor() as i64 + 1;
        assert!((fires as i64 - expected).abs() <= 1, "fires={} expected={}", fires, expected);
    }

    #[test]
    fn coupled_mode_updates_with_every_render() {
        let mut scheduler = FrameScheduler::new(SchedulerMode::Coupled, StopToken::new());

        let mut renders = 0;
        for i in 0..=200 {
            let actions = scheduler.tick(i as f64 * STEP, rates(4.0, 100.0));
            assert_eq!(actions.render, actions.update);
            renders += actions.render as usize;
        }

        // Two seconds at 4 fps, plus the immediate first frame.
        assert_eq!(renders, 9);
    }

    #[test]
    fn decoupled_mode_runs_gates_independently() {
        let mut scheduler = FrameScheduler::new(SchedulerMode::Decoupled, StopToken::new());

        let (mut renders, mut updates) = (0, 0);
        for i in 0..=200 {
            let actions = scheduler.tick(i as f64 * STEP, rates(1.0, 4.0));
            renders += actions.render as usize;
            updates += actions.update as usize;
        }

        // Two seconds: renders at 0/1000/2000, updates every 250 ms.
        assert_eq!(renders, 3);
        assert_eq!(updates, 9);
    }

    #[test]
    fn rate_change_applies_on_next_tick() {
        let mut scheduler = FrameScheduler::new(SchedulerMode::Decoupled, StopToken::new());
        scheduler.tick(0.0, rates(1.0, 3.0));

        // 100 ms in: too early at 1 fps, due at 30 fps.
        assert!(!scheduler.tick(50.0, rates(1.0, 3.0)).render);
        assert!(scheduler.tick(100.0, rates(30.0, 3.0)).render);
    }

    #[test]
    fn stopped_scheduler_does_nothing() {
        let stop = StopToken::new();
        let mut scheduler = FrameScheduler::new(SchedulerMode::Decoupled, stop.clone());
        assert_eq!(
            scheduler.tick(0.0, rates(1.0, 1.0)),
            TickActions {
                render: true,
                update: true,
            }
        );

        stop.stop();

        assert!(stop.is_stopped());
        assert_eq!(scheduler.tick(5000.0, rates(1.0, 1.0)), TickActions::default());
    }
}
