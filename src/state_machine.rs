//! Race phase machine: explicit states and legal transition guards.
//!
//! The orchestrator guards every command against the current phase and calls
//! `advance()` only for legal moves, so illegal commands degrade to silent
//! no-ops at the API surface while the machine itself stays strict. Each
//! transition is recorded with a reason for diagnostics.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The set of race phases.
///
/// `Running` is the only phase with advancement tasks active and no winner
/// recorded; `Finished` and `OutOfLives` both imply a recorded winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RacePhase {
    /// No race active: picking a runner, or resuming after a pause.
    Idle,
    /// Advancement tasks active, winner not yet recorded.
    Running,
    /// A winner is recorded and lives remain.
    Finished,
    /// A winner is recorded and the last life is gone; only spending points
    /// unlocks the next race.
    OutOfLives,
}

impl std::fmt::Display for RacePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running => write!(f, "Running"),
            Self::Finished => write!(f, "Finished"),
            Self::OutOfLives => write!(f, "OutOfLives"),
        }
    }
}

/// Legal transitions between phases.
///
/// ```text
/// Idle → Running            start
/// Running → Idle            pause, no winner found
/// Running → Finished        winner recorded
/// Finished → Idle           restart
/// Finished → OutOfLives     last life spent on a loss
/// OutOfLives → Idle         continue with points
/// ```
fn is_legal_transition(from: RacePhase, to: RacePhase) -> bool {
    use RacePhase::*;

    matches!(
        (from, to),
        (Idle, Running)
            | (Running, Idle)
            | (Running, Finished)
            | (Finished, Idle)
            | (Finished, OutOfLives)
            | (OutOfLives, Idle)
    )
}

/// A single recorded phase transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: RacePhase,
    pub to: RacePhase,
    /// Race attempt number at the time of transition (first attempt is 1).
    pub attempt: u32,
    /// Milliseconds since the machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone, Error)]
#[error("illegal phase transition: {from} → {to}")]
pub struct IllegalTransition {
    pub from: RacePhase,
    pub to: RacePhase,
}

/// Tracks the current phase, enforces legal transitions, and keeps a
/// transition log for diagnostics.
pub struct PhaseMachine {
    current: RacePhase,
    attempt: u32,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl PhaseMachine {
    /// New machine starting at `Idle` before the first attempt.
    pub fn new() -> Self {
        Self {
            current: RacePhase::Idle,
            attempt: 0,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> RacePhase {
        self.current
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Bump the attempt counter (called when a race starts).
    pub fn next_attempt(&mut self) {
        self.attempt += 1;
    }

    /// Attempt to advance to `to`, recording the move on success.
    pub fn advance(&mut self, to: RacePhase, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        tracing::debug!(from = %self.current, to = %to, attempt = self.attempt, "phase transition");

        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            attempt: self.attempt,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        });
        self.current = to;
        Ok(())
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}
