//! One race contestant: owned progress state plus the cancellable
//! advancement task.
//!
//! A participant's progress and tick delay are mutated only by its own
//! `advance` task (or by `reset` between runs), so no locking is needed.
//! Progress is published through a `watch` channel: the orchestrator and any
//! presentation code read the latest value or await changes without touching
//! the writer.

use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::pace::{pace_band, DelayDraw, INITIAL_DELAY_MS};

/// Default finish line.
pub const DEFAULT_MAX_PROGRESS: u32 = 100;

/// One runner in the race.
pub struct RaceParticipant {
    name: String,
    max_progress: u32,
    progress_increment: u32,
    /// Current inter-tick delay, owned by the advancement task.
    delay: Duration,
    draw: Box<dyn DelayDraw>,
    progress: watch::Sender<u32>,
    /// How many times an advancement run was cancelled mid-wait. Diagnostic
    /// only, not part of the observable contract.
    interruptions: u32,
}

impl RaceParticipant {
    /// Create a participant at progress 0 with an initial delay drawn from
    /// [`INITIAL_DELAY_MS`].
    pub fn new(name: impl Into<String>, mut draw: Box<dyn DelayDraw>) -> Self {
        let delay = Duration::from_millis(draw.draw_ms(INITIAL_DELAY_MS));
        Self {
            name: name.into(),
            max_progress: DEFAULT_MAX_PROGRESS,
            progress_increment: 1,
            delay,
            draw,
            progress: watch::channel(0).0,
            interruptions: 0,
        }
    }

    pub fn with_max_progress(mut self, max_progress: u32) -> Self {
        self.max_progress = max_progress;
        self
    }

    pub fn with_increment(mut self, increment: u32) -> Self {
        self.progress_increment = increment;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_progress(&self) -> u32 {
        self.max_progress
    }

    pub fn current_progress(&self) -> u32 {
        *self.progress.borrow()
    }

    /// Progress as a fraction of the finish line, clamped to `[0, 1]`.
    pub fn progress_factor(&self) -> f64 {
        (f64::from(self.current_progress()) / f64::from(self.max_progress)).clamp(0.0, 1.0)
    }

    /// Watch the live progress value. Receivers stay valid across pauses and
    /// resets for the whole session.
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.progress.subscribe()
    }

    pub fn interruptions(&self) -> u32 {
        self.interruptions
    }

    /// Advance until the finish line or cancellation.
    ///
    /// Each tick sleeps for the current delay, adds the increment clamped to
    /// `max_progress`, then re-draws the delay from the phase band containing
    /// the new progress (bands below 15% and past 90% keep the last delay).
    /// Cancellation during the sleep aborts the run immediately, before the
    /// step lands; it is an expected early stop, not an error.
    pub async fn advance(&mut self, cancel: CancellationToken) {
        while self.current_progress() < self.max_progress {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.interruptions += 1;
                    debug!(
                        runner = %self.name,
                        progress = self.current_progress(),
                        "advance interrupted"
                    );
                    return;
                }
                _ = tokio::time::sleep(self.delay) => {}
            }

            let next = self
                .current_progress()
                .saturating_add(self.progress_increment)
                .min(self.max_progress);
            self.progress.send_replace(next);

            if let Some(range) = pace_band(next, self.max_progress) {
                self.delay = Duration::from_millis(self.draw.draw_ms(range));
            }
        }
        debug!(runner = %self.name, "reached the finish line");
    }

    /// Back to the starting line with a fresh initial delay.
    ///
    /// Callers must cancel any active advancement task first.
    pub fn reset(&mut self) {
        self.progress.send_replace(0);
        self.delay = Duration::from_millis(self.draw.draw_ms(INITIAL_DELAY_MS));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pace::ConstantDraw;

    fn participant(name: &str, tick_ms: u64, increment: u32) -> RaceParticipant {
        RaceParticipant::new(name, Box::new(ConstantDraw(tick_ms))).with_increment(increment)
    }

    #[tokio::test(start_paused = true)]
    async fn advance_reaches_and_clamps_at_max() {
        let mut p = participant("solo", 10, 7);
        p.advance(CancellationToken::new()).await;
        // 14 ticks land on 98, the 15th clamps 105 down to 100.
        assert_eq!(p.current_progress(), 100);
        assert_eq!(p.progress_factor(), 1.0);
        assert_eq!(p.interruptions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_progress_for_good() {
        let mut p = participant("N°1", 50, 1);
        let rx = p.subscribe();
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            p.advance(task_cancel).await;
            p
        });

        // Four 50ms ticks fit in 225ms.
        tokio::time::sleep(Duration::from_millis(225)).await;
        cancel.cancel();
        let p = task.await.unwrap();

        assert_eq!(p.current_progress(), 4);
        assert_eq!(p.interruptions(), 1);

        // No further mutation after cancellation.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(*rx.borrow(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_monotone_and_bounded_while_running() {
        let mut p = participant("solo", 20, 9);
        let mut rx = p.subscribe();
        let watcher = tokio::spawn(async move {
            let mut last = *rx.borrow();
            while rx.changed().await.is_ok() {
                let next = *rx.borrow();
                assert!(next >= last, "progress went backwards: {last} -> {next}");
                assert!(next <= 100);
                last = next;
            }
            last
        });

        p.advance(CancellationToken::new()).await;
        drop(p);
        assert_eq!(watcher.await.unwrap(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_returns_to_the_starting_line() {
        let mut p = participant("solo", 10, 25);
        p.advance(CancellationToken::new()).await;
        assert_eq!(p.current_progress(), 100);

        p.reset();
        assert_eq!(p.current_progress(), 0);
        assert_eq!(p.progress_factor(), 0.0);
    }

    #[test]
    fn progress_factor_is_zero_at_construction() {
        let p = participant("solo", 10, 1);
        assert_eq!(p.current_progress(), 0);
        assert_eq!(p.progress_factor(), 0.0);
        assert_eq!(p.max_progress(), DEFAULT_MAX_PROGRESS);
        assert_eq!(p.name(), "solo");
    }
}
