//! Readiness gate.
//!
//! Samples the clock on a fixed tick and latches "ready" once the tick has
//! arrived without a hiccup for a continuous stretch. Until then the phase
//! machine refuses input: a cold scheduler delivers irregular ticks that
//! would corrupt the first measurement.
//!
//! ```text
//! tick ──> observe(t) ──> ClockSignal { now, ready } ──> watch channel
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::clock::{Clock, Moment};

/// Gate tuning. The constants are heuristics, not load-bearing semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Nominal period between samples.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Largest gap between samples still counted as stable.
    #[serde(default = "default_hang_threshold_ms")]
    pub hang_threshold_ms: u64,
    /// Hiccup-free stretch required before declaring ready.
    #[serde(default = "default_required_stable_ms")]
    pub required_stable_ms: u64,
}

fn default_tick_interval_ms() -> u64 {
    100
}
fn default_hang_threshold_ms() -> u64 {
    250
}
fn default_required_stable_ms() -> u64 {
    2_000
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            hang_threshold_ms: default_hang_threshold_ms(),
            required_stable_ms: default_required_stable_ms(),
        }
    }
}

impl GateConfig {
    pub fn tick_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic.
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn hang_threshold(&self) -> Duration {
        Duration::from_millis(self.hang_threshold_ms)
    }

    pub fn required_stable(&self) -> Duration {
        Duration::from_millis(self.required_stable_ms)
    }
}

/// What the gate publishes on every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSignal {
    pub now: Moment,
    pub ready: bool,
}

impl ClockSignal {
    pub fn new(now: Moment, ready: bool) -> Self {
        Self { now, ready }
    }
}

/// Stability tracker behind the gate loop.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    config: GateConfig,
    last_sample: Option<Duration>,
    stable_since: Option<Duration>,
    ready: bool,
}

impl ReadinessGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            last_sample: None,
            stable_since: None,
            ready: false,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Feed one sample (monotonic offset). Returns the readiness after it.
    ///
    /// Once ready, the gate stays ready; later samples are not evaluated.
    pub fn observe(&mut self, t: Duration) -> bool {
        let dt = self.last_sample.map(|last| t.saturating_sub(last));
        self.last_sample = Some(t);

        if self.ready {
            return true;
        }

        if let Some(dt) = dt {
            if dt > self.config.hang_threshold() {
                tracing::debug!(gap_ms = dt.as_millis() as u64, "tick hiccup, restarting stability window");
                self.stable_since = None;
                return false;
            }
        }

        let since = *self.stable_since.get_or_insert(t);
        if t.saturating_sub(since) >= self.config.required_stable() {
            self.ready = true;
            tracing::info!(at_ms = t.as_millis() as u64, "readiness gate open");
        }
        self.ready
    }

    /// Tick loop. Publishes a [`ClockSignal`] per tick until `shutdown`
    /// flips to true, its sender is dropped, or every signal receiver is
    /// gone. Stops within one tick of cancellation.
    pub async fn run(
        mut self,
        clock: Arc<dyn Clock>,
        signals: watch::Sender<ClockSignal>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let now = clock.now();
            let ready = self.observe(now.mono);
            if signals.send(ClockSignal::new(now, ready)).is_err() {
                tracing::debug!("no clock signal receivers left");
                break;
            }
        }
        tracing::debug!("readiness gate loop stopped");
    }

    /// Spawn the loop on the current runtime.
    pub fn spawn(self, clock: Arc<dyn Clock>) -> (GateHandle, watch::Receiver<ClockSignal>) {
        let (signal_tx, signal_rx) = watch::channel(ClockSignal::new(clock.now(), false));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(clock, signal_tx, shutdown_rx));
        (
            GateHandle {
                shutdown: shutdown_tx,
                task,
            },
            signal_rx,
        )
    }
}

/// Owner of a spawned gate loop. Dropping it also ends the loop.
#[derive(Debug)]
pub struct GateHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl GateHandle {
    /// Request shutdown and wait for the loop to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "readiness gate task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn becomes_ready_after_stable_window() {
        let mut gate = ReadinessGate::new(GateConfig::default());
        let mut t = 0;
        while t < 2_000 {
            assert!(!gate.observe(ms(t)), "ready too early at {t}ms");
            t += 100;
        }
        assert!(gate.observe(ms(2_000)));
    }

    #[test]
    fn hiccup_restarts_the_window() {
        let mut gate = ReadinessGate::new(GateConfig::default());
        gate.observe(ms(0));
        gate.observe(ms(100));
        // 300ms gap exceeds the 250ms threshold.
        assert!(!gate.observe(ms(400)));
        let mut t = 500;
        while t < 2_500 {
            assert!(!gate.observe(ms(t)), "ready too early at {t}ms");
            t += 100;
        }
        assert!(gate.observe(ms(2_500)));
    }

    #[test]
    fn readiness_latches_through_later_delays() {
        let mut gate = ReadinessGate::new(GateConfig {
            required_stable_ms: 300,
            ..GateConfig::default()
        });
        for t in [0, 100, 200, 300] {
            gate.observe(ms(t));
        }
        assert!(gate.is_ready());
        assert!(gate.observe(ms(5_000)));
        assert!(gate.observe(ms(60_000)));
        assert!(gate.is_ready());
    }

    #[test]
    fn gap_at_threshold_is_still_stable() {
        let mut gate = ReadinessGate::new(GateConfig {
            required_stable_ms: 500,
            ..GateConfig::default()
        });
        gate.observe(ms(0));
        gate.observe(ms(250));
        assert!(gate.observe(ms(500)));
    }

    #[test]
    fn zero_required_window_opens_on_first_sample() {
        let mut gate = ReadinessGate::new(GateConfig {
            required_stable_ms: 0,
            ..GateConfig::default()
        });
        assert!(gate.observe(ms(0)));
    }
}
