//! Iteration timing helpers for the optional progress UI.
//!
//! Enabled only with the `progress` feature; used by
//! [`Transformer::get_output`](crate::transform::transformer::Transformer::get_output)
//! to report per-chunk throughput next to the progress bar.

use std::time::{Duration, Instant};

/// Smoothed per-chunk timing: an exponential moving average over the elapsed
/// time between consecutive [`tick`](IterTimer::tick) calls.
pub struct IterTimer {
    /// EMA smoothing factor in (0, 1]; 1.0 keeps only the last sample.
    alpha: f64,
    previous: Instant,
    smoothed: Option<Duration>,
}

impl IterTimer {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            previous: Instant::now(),
            smoothed: None,
        }
    }

    /// Record a chunk boundary; returns the raw duration of the chunk that
    /// just finished. The first tick seeds the average.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now - self.previous;
        self.previous = now;

        self.smoothed = Some(match self.smoothed {
            None => dt,
            Some(avg) => {
                let blended =
                    self.alpha * dt.as_secs_f64() + (1.0 - self.alpha) * avg.as_secs_f64();
                Duration::from_secs_f64(blended)
            }
        });
        dt
    }

    /// Smoothed per-chunk duration (zero before the first tick).
    pub fn avg(&self) -> Duration {
        self.smoothed.unwrap_or(Duration::ZERO)
    }
}

/// Compact human-readable rendering of a duration (µs / ms / s).
pub fn fmt_dur(d: Duration) -> String {
    match d.as_micros() {
        us if us < 1_000 => format!("{us}µs"),
        us if us < 1_000_000 => format!("{}ms", us / 1_000),
        _ => format!("{:.2}s", d.as_secs_f32()),
    }
}
