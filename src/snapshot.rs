//! Read models published to observers.
//!
//! Snapshots are plain serializable values: the presentation layer renders
//! them without ever touching orchestrator internals, and the demo binary can
//! dump them as JSON.

use serde::{Deserialize, Serialize};

use crate::state_machine::RacePhase;

/// One lane's progress as seen at publication time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneSnapshot {
    pub name: String,
    pub current_progress: u32,
    pub max_progress: u32,
    /// Progress as a fraction of the finish line, clamped to `[0, 1]`.
    pub progress_factor: f64,
}

impl LaneSnapshot {
    pub fn new(name: impl Into<String>, current_progress: u32, max_progress: u32) -> Self {
        let progress_factor =
            (f64::from(current_progress) / f64::from(max_progress)).clamp(0.0, 1.0);
        Self {
            name: name.into(),
            current_progress,
            max_progress,
            progress_factor,
        }
    }
}

/// Full session state at one point in time.
///
/// Published on every session mutation. Lane progress here is the value at
/// publication time; for live per-tick progress, watch a
/// [`LaneView`](crate::orchestrator::LaneView) instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub phase: RacePhase,
    pub selected_runner: Option<String>,
    pub winner: Option<String>,
    pub has_won: bool,
    pub race_in_progress: bool,
    pub race_finished: bool,
    pub remaining_lives: u32,
    pub score: u32,
    pub lanes: Vec<LaneSnapshot>,
}

impl RaceSnapshot {
    /// Look up a lane by runner name.
    pub fn lane(&self, name: &str) -> Option<&LaneSnapshot> {
        self.lanes.iter().find(|lane| lane.name == name)
    }
}
