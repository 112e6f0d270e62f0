//! Adaptive pacing: phase bands and randomized delay draws.
//!
//! A runner's inter-tick delay is re-drawn whenever its progress lands inside
//! one of the phase bands below. Bands speed up monotonically toward the
//! finish line:
//!
//! ```text
//! progress (fraction of max)   delay range (ms)
//! below 15%                    initial draw from [300, 700)
//! [15%, 30%]                   [200, 600)
//! [30%, 45%]                   [150, 550)
//! [45%, 60%]                   [150, 500)
//! [60%, 75%]                   [100, 450)
//! [75%, 90%]                   [150, 300)
//! above 90%                    unchanged from the last band entered
//! ```
//!
//! A progress value sitting exactly on a band boundary resolves to the
//! earlier band. The draw itself is pluggable behind [`DelayDraw`] so tests
//! can script exact delay sequences instead of relying on wall-clock luck.

use std::ops::Range;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Millisecond range the construction-time delay is drawn from.
pub const INITIAL_DELAY_MS: Range<u64> = 300..700;

/// Source of randomized delay draws, in milliseconds.
///
/// The production implementation is [`ChaChaDraw`]; test doubles may ignore
/// the range entirely and return scripted values.
pub trait DelayDraw: Send {
    /// Draw one delay from `range` (half-open, as handed to `gen_range`).
    fn draw_ms(&mut self, range: Range<u64>) -> u64;
}

/// ChaCha8-backed draw source, seedable for reproducible races.
pub struct ChaChaDraw {
    rng: ChaCha8Rng,
}

impl ChaChaDraw {
    /// Fresh entropy seed: every race is different.
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Fixed seed: the same seed replays the same delay sequence.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl DelayDraw for ChaChaDraw {
    fn draw_ms(&mut self, range: Range<u64>) -> u64 {
        self.rng.gen_range(range)
    }
}

/// Fixed draw that ignores the requested range.
///
/// Gives a runner a constant tick delay, which makes races fully
/// deterministic under a paused clock. Used by tests and the demo binary.
pub struct ConstantDraw(pub u64);

impl DelayDraw for ConstantDraw {
    fn draw_ms(&mut self, _range: Range<u64>) -> u64 {
        self.0
    }
}

/// The delay range for the band containing `progress`, or `None` when the
/// current delay should be kept (below 15% or past 90% of `max_progress`).
pub fn pace_band(progress: u32, max_progress: u32) -> Option<Range<u64>> {
    let mark = |fraction: f64| (f64::from(max_progress) * fraction) as u32;

    if (mark(0.15)..=mark(0.30)).contains(&progress) {
        Some(200..600)
    } else if (mark(0.30)..=mark(0.45)).contains(&progress) {
        Some(150..550)
    } else if (mark(0.45)..=mark(0.60)).contains(&progress) {
        Some(150..500)
    } else if (mark(0.60)..=mark(0.75)).contains(&progress) {
        Some(100..450)
    } else if (mark(0.75)..=mark(0.90)).contains(&progress) {
        Some(150..300)
    } else {
        None
    }
}
