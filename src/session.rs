//! Session state: selected runner, winner, lives, and score.
//!
//! Pure state logic with no tasks or channels; the orchestrator drives it
//! from its single control loop, so there is exactly one writer. Illegal
//! commands are silent no-ops (the methods return whether they acted), which
//! is the whole error contract of the public surface.

use tracing::warn;

use crate::state_machine::{PhaseMachine, RacePhase, TransitionRecord};

/// Lives at the start of a session, and after continuing with points.
pub const STARTING_LIVES: u32 = 3;
/// Score at the start of a session.
pub const STARTING_SCORE: u32 = 150;
/// Score bonus when the selected runner wins.
pub const WIN_BONUS: u32 = 100;
/// Score cost of continuing after losing all lives.
pub const CONTINUE_COST: u32 = 150;

/// Orchestrator-owned session record. Persists across races within one run
/// of the program; never persisted beyond it.
pub struct RaceSession {
    machine: PhaseMachine,
    selected_runner: Option<String>,
    winner: Option<String>,
    has_won: bool,
    remaining_lives: u32,
    score: u32,
}

impl RaceSession {
    pub fn new() -> Self {
        Self {
            machine: PhaseMachine::new(),
            selected_runner: None,
            winner: None,
            has_won: false,
            remaining_lives: STARTING_LIVES,
            score: STARTING_SCORE,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn phase(&self) -> RacePhase {
        self.machine.current()
    }

    pub fn selected_runner(&self) -> Option<&str> {
        self.selected_runner.as_deref()
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn has_won(&self) -> bool {
        self.has_won
    }

    pub fn remaining_lives(&self) -> u32 {
        self.remaining_lives
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// True exactly while advancement tasks are active with no winner yet.
    pub fn race_in_progress(&self) -> bool {
        self.machine.current() == RacePhase::Running
    }

    /// True once a winner is recorded for the current attempt.
    pub fn race_finished(&self) -> bool {
        matches!(
            self.machine.current(),
            RacePhase::Finished | RacePhase::OutOfLives
        )
    }

    /// Phase transition log, for diagnostics.
    pub fn transitions(&self) -> &[TransitionRecord] {
        self.machine.transitions()
    }

    // ── Commands ─────────────────────────────────────────────────────────

    /// Pick the runner to back. Only allowed between races.
    pub fn select_runner(&mut self, name: &str) -> bool {
        if self.machine.current() != RacePhase::Idle {
            return false;
        }
        self.selected_runner = Some(name.to_string());
        true
    }

    /// Open a race attempt: clears any previous winner and moves to
    /// `Running`. Requires a selected runner and at least one life.
    pub fn begin_attempt(&mut self) -> bool {
        if self.machine.current() != RacePhase::Idle
            || self.selected_runner.is_none()
            || self.remaining_lives == 0
        {
            return false;
        }
        self.winner = None;
        self.has_won = false;
        self.machine.next_attempt();
        self.transition(RacePhase::Running, "start");
        true
    }

    /// Suspend the attempt without a winner; progress stays where it is and
    /// a later `begin_attempt` resumes from there.
    pub fn pause(&mut self) -> bool {
        if self.machine.current() != RacePhase::Running {
            return false;
        }
        self.transition(RacePhase::Idle, "pause");
        true
    }

    /// Record the first finisher of this attempt and settle the stakes:
    /// +100 on a win, one life on a loss. Write-once per attempt.
    pub fn record_winner(&mut self, name: &str) -> bool {
        if self.winner.is_some() || self.machine.current() != RacePhase::Running {
            return false;
        }

        self.winner = Some(name.to_string());
        self.has_won = self.selected_runner.as_deref() == Some(name);
        let reason = format!("winner: {name}");
        self.transition(RacePhase::Finished, &reason);

        if self.has_won {
            self.score += WIN_BONUS;
        } else if self.remaining_lives > 0 {
            self.remaining_lives -= 1;
            if self.remaining_lives == 0 {
                self.transition(RacePhase::OutOfLives, "last life lost");
            }
        }
        true
    }

    /// Clear the finished attempt and return to `Idle`. The runner selection
    /// is cleared too: every race starts with a fresh choice.
    pub fn restart(&mut self) -> bool {
        if self.machine.current() != RacePhase::Finished || self.remaining_lives == 0 {
            return false;
        }
        self.clear_attempt();
        self.transition(RacePhase::Idle, "restart");
        true
    }

    /// Buy back in after losing every life: 150 points for a fresh set of
    /// lives and a reset board. No-op when the score does not cover it.
    pub fn continue_with_points(&mut self) -> bool {
        if self.machine.current() != RacePhase::OutOfLives || self.score < CONTINUE_COST {
            return false;
        }
        self.score -= CONTINUE_COST;
        self.remaining_lives = STARTING_LIVES;
        self.clear_attempt();
        self.transition(RacePhase::Idle, "continue with points");
        true
    }

    fn clear_attempt(&mut self) {
        self.winner = None;
        self.has_won = false;
        self.selected_runner = None;
    }

    /// All call sites guard the current phase first, so this only fails if a
    /// guard and the transition table disagree.
    fn transition(&mut self, to: RacePhase, reason: &str) {
        if let Err(err) = self.machine.advance(to, Some(reason)) {
            warn!(error = %err, "phase guard out of sync with transition table");
        }
    }
}

impl Default for RaceSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run one losing attempt: back `backed`, let `actual_winner` finish.
    fn lose_once(session: &mut RaceSession, backed: &str, actual_winner: &str) {
        assert!(session.select_runner(backed));
        assert!(session.begin_attempt());
        assert!(session.record_winner(actual_winner));
    }

    #[test]
    fn fresh_session_defaults() {
        let session = RaceSession::new();
        assert_eq!(session.phase(), RacePhase::Idle);
        assert_eq!(session.score(), 150);
        assert_eq!(session.remaining_lives(), 3);
        assert_eq!(session.selected_runner(), None);
        assert_eq!(session.winner(), None);
        assert!(!session.race_in_progress());
        assert!(!session.race_finished());
    }

    #[test]
    fn start_requires_a_selection() {
        let mut session = RaceSession::new();
        assert!(!session.begin_attempt());
        assert!(session.select_runner("N°1"));
        assert!(session.begin_attempt());
        assert!(session.race_in_progress());
    }

    #[test]
    fn selection_is_locked_while_running_and_after_finish() {
        let mut session = RaceSession::new();
        session.select_runner("N°1");
        session.begin_attempt();
        assert!(!session.select_runner("N°2"));
        session.record_winner("N°1");
        assert!(!session.select_runner("N°2"));
        assert_eq!(session.selected_runner(), Some("N°1"));
    }

    #[test]
    fn backed_runner_wins_pays_the_bonus() {
        let mut session = RaceSession::new();
        session.select_runner("N°2");
        session.begin_attempt();
        assert!(session.record_winner("N°2"));

        assert_eq!(session.winner(), Some("N°2"));
        assert!(session.has_won());
        assert_eq!(session.score(), 250);
        assert_eq!(session.remaining_lives(), 3);
        assert!(session.race_finished());
        assert!(!session.race_in_progress());
    }

    #[test]
    fn loss_costs_one_life_and_no_score() {
        let mut session = RaceSession::new();
        lose_once(&mut session, "N°1", "N°3");

        assert_eq!(session.winner(), Some("N°3"));
        assert!(!session.has_won());
        assert_eq!(session.remaining_lives(), 2);
        assert_eq!(session.score(), 150);
        assert_eq!(session.phase(), RacePhase::Finished);
    }

    #[test]
    fn winner_is_write_once_per_attempt() {
        let mut session = RaceSession::new();
        session.select_runner("N°1");
        session.begin_attempt();
        assert!(session.record_winner("N°3"));
        assert!(!session.record_winner("N°1"));
        assert_eq!(session.winner(), Some("N°3"));
        assert_eq!(session.remaining_lives(), 2);
    }

    #[test]
    fn restart_clears_the_attempt_and_the_selection() {
        let mut session = RaceSession::new();
        lose_once(&mut session, "N°1", "N°2");
        assert!(session.restart());

        assert_eq!(session.phase(), RacePhase::Idle);
        assert_eq!(session.winner(), None);
        assert_eq!(session.selected_runner(), None);
        assert!(!session.has_won());
        // Lives and score carry across restarts.
        assert_eq!(session.remaining_lives(), 2);
        assert_eq!(session.score(), 150);
    }

    #[test]
    fn third_loss_locks_the_session_out() {
        let mut session = RaceSession::new();
        lose_once(&mut session, "N°1", "N°2");
        session.restart();
        lose_once(&mut session, "N°2", "N°3");
        session.restart();
        lose_once(&mut session, "N°3", "N°1");

        assert_eq!(session.remaining_lives(), 0);
        assert_eq!(session.phase(), RacePhase::OutOfLives);
        // No restart, no new race.
        assert!(!session.restart());
        assert!(!session.select_runner("N°1"));
        assert!(!session.begin_attempt());
    }

    #[test]
    fn continue_with_points_buys_back_in() {
        let mut session = RaceSession::new();
        lose_once(&mut session, "N°1", "N°2");
        session.restart();
        lose_once(&mut session, "N°1", "N°2");
        session.restart();
        lose_once(&mut session, "N°1", "N°2");
        session.score = 200;

        assert!(session.continue_with_points());
        assert_eq!(session.score(), 50);
        assert_eq!(session.remaining_lives(), 3);
        assert_eq!(session.phase(), RacePhase::Idle);
        assert_eq!(session.selected_runner(), None);
        assert_eq!(session.winner(), None);
    }

    #[test]
    fn continue_with_points_is_a_noop_when_too_poor() {
        let mut session = RaceSession::new();
        lose_once(&mut session, "N°1", "N°2");
        session.restart();
        lose_once(&mut session, "N°1", "N°2");
        session.restart();
        lose_once(&mut session, "N°1", "N°2");
        session.score = 100;

        assert!(!session.continue_with_points());
        assert_eq!(session.score(), 100);
        assert_eq!(session.remaining_lives(), 0);
        assert_eq!(session.phase(), RacePhase::OutOfLives);
    }

    #[test]
    fn continue_is_a_noop_outside_out_of_lives() {
        let mut session = RaceSession::new();
        assert!(!session.continue_with_points());
        assert_eq!(session.score(), 150);
    }

    #[test]
    fn pause_suspends_without_a_winner() {
        let mut session = RaceSession::new();
        session.select_runner("N°2");
        session.begin_attempt();
        assert!(session.pause());
        assert_eq!(session.phase(), RacePhase::Idle);
        assert_eq!(session.winner(), None);
        // Selection survives a pause, so resuming needs no re-pick.
        assert_eq!(session.selected_runner(), Some("N°2"));
        assert!(session.begin_attempt());
    }

    #[test]
    fn transition_log_records_the_story() {
        let mut session = RaceSession::new();
        session.select_runner("N°2");
        session.begin_attempt();
        session.record_winner("N°2");
        session.restart();

        let reasons: Vec<&str> = session
            .transitions()
            .iter()
            .filter_map(|record| record.reason.as_deref())
            .collect();
        assert_eq!(reasons, ["start", "winner: N°2", "restart"]);
    }
}
