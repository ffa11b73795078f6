//! Wall-clock pacing of cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Upper bound on a single sleep so a stop request is noticed quickly.
pub const MAX_SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Pacing outcome of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Slept out the remainder of the period.
    OnTime,
    /// The cycle took longer than its period; the next one starts now.
    Overrun,
    /// Stop was requested while waiting.
    Stopped,
    /// Pacing is disabled.
    Unpaced,
}

/// Sleeps out the rest of each cycle period.
///
/// Cooperative: an overrunning cycle is never skipped, the next one just
/// starts immediately.
#[derive(Debug, Clone)]
pub struct Pacer {
    realtime: bool,
    overruns: u64,
}

impl Pacer {
    pub fn new(realtime: bool) -> Self {
        Self {
            realtime,
            overruns: 0,
        }
    }

    pub fn is_realtime(&self) -> bool {
        self.realtime
    }

    /// Number of overrun cycles so far.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Wait until `period` seconds have passed since `started`, or until
    /// `running` is cleared.
    pub fn wait(&mut self, started: Instant, period: f64, running: &AtomicBool) -> Pace {
        if !self.realtime {
            return Pace::Unpaced;
        }
        let period = Duration::try_from_secs_f64(period).unwrap_or(Duration::ZERO);
        let deadline = started + period;
        let elapsed = started.elapsed();
        if elapsed > period {
            self.overruns += 1;
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                period_ms = period.as_millis() as u64,
                "cycle overran its period"
            );
            return Pace::Overrun;
        }
        loop {
            if !running.load(Ordering::SeqCst) {
                return Pace::Stopped;
            }
            let now = Instant::now();
            if now >= deadline {
                return Pace::OnTime;
            }
            std::thread::sleep((deadline - now).min(MAX_SLEEP_SLICE));
        }
    }
}
