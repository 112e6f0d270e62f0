//! Concurrent race simulation.
//!
//! Independent runners advance a bounded progress counter at randomized,
//! phase-dependent speeds until one crosses the finish line. The crate's core
//! is the coordination logic: cancellable per-runner advancement tasks
//! ([`participant`]), the adaptive pacing policy ([`pace`]), and the
//! orchestrator actor that races them, records the first winner exactly once,
//! and settles lives and score ([`orchestrator`], [`session`]).
//!
//! Presentation is external: it sends commands through a
//! [`RaceTrackerHandle`] and observes state through watch channels.
//!
//! ```no_run
//! use race_tracker::{default_participants, RaceTracker};
//!
//! # async fn demo() {
//! let handle = RaceTracker::spawn(default_participants(None));
//! handle.select_runner("N°2");
//! handle.start();
//! let mut snapshots = handle.subscribe();
//! while snapshots.changed().await.is_ok() {
//!     if snapshots.borrow().race_finished {
//!         break;
//!     }
//! }
//! # }
//! ```

pub mod orchestrator;
pub mod pace;
pub mod participant;
pub mod session;
pub mod snapshot;
pub mod state_machine;

pub use orchestrator::{
    default_participants, LaneView, RaceTracker, RaceTrackerHandle, DEFAULT_RUNNER_NAMES,
};
pub use participant::{RaceParticipant, DEFAULT_MAX_PROGRESS};
pub use session::{RaceSession, CONTINUE_COST, STARTING_LIVES, STARTING_SCORE, WIN_BONUS};
pub use snapshot::{LaneSnapshot, RaceSnapshot};
pub use state_machine::{IllegalTransition, PhaseMachine, RacePhase, TransitionRecord};
