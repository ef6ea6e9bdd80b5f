//! [`TickWatchdog`] – loop overrun detector.
//!
//! Every tick must finish within the control period.  The scheduler resets
//! the watchdog at the start of a tick, records a named epoch after each
//! phase (binding poll, ownership resolution, every command's execute) and
//! calls [`TickWatchdog::finish`] at the end.  When the tick took longer than
//! the period the epochs are logged so the slow step can be identified.

use std::time::{Duration, Instant};

use tracing::warn;

/// Default control period (50 Hz).
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(20);

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Report of a tick that exceeded its period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overrun {
    pub elapsed: Duration,
    pub period: Duration,
    /// Named steps of the tick with the time each one took.
    pub epochs: Vec<(String, Duration)>,
}

// ────────────────────────────────────────────────────────────────────────────
// TickWatchdog
// ────────────────────────────────────────────────────────────────────────────

/// Times one tick at a time against a fixed period.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use reefbot_kernel::watchdog::TickWatchdog;
///
/// let mut wd = TickWatchdog::new(Duration::from_secs(1));
/// wd.reset();
/// wd.epoch("poll");
/// assert!(wd.finish().is_none());
/// ```
#[derive(Debug)]
pub struct TickWatchdog {
    period: Duration,
    started: Instant,
    last_epoch: Instant,
    epochs: Vec<(String, Duration)>,
}

impl TickWatchdog {
    pub fn new(period: Duration) -> Self {
        let now = Instant::now();
        Self {
            period,
            started: now,
            last_epoch: now,
            epochs: Vec::new(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start timing a new tick, discarding the previous tick's epochs.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.started = now;
        self.last_epoch = now;
        self.epochs.clear();
    }

    /// Record the time since the previous epoch (or since `reset`) under
    /// `name`.
    pub fn epoch(&mut self, name: impl Into<String>) {
        let now = Instant::now();
        self.epochs.push((name.into(), now - self.last_epoch));
        self.last_epoch = now;
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// `true` once the current tick has run longer than the period.
    pub fn is_expired(&self) -> bool {
        self.elapsed() > self.period
    }

    /// Close the tick.  Returns and logs an [`Overrun`] when the period was
    /// exceeded.
    pub fn finish(&mut self) -> Option<Overrun> {
        let elapsed = self.elapsed();
        if elapsed <= self.period {
            return None;
        }
        let overrun = Overrun {
            elapsed,
            period: self.period,
            epochs: std::mem::take(&mut self.epochs),
        };
        let breakdown: Vec<String> = overrun
            .epochs
            .iter()
            .map(|(name, took)| format!("{name}={took:?}"))
            .collect();
        warn!(
            elapsed_ms = elapsed.as_secs_f64() * 1e3,
            period_ms = self.period.as_secs_f64() * 1e3,
            epochs = %breakdown.join(", "),
            "loop overrun"
        );
        Some(overrun)
    }
}

impl Default for TickWatchdog {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD)
    }
}
