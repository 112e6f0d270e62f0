//! Race orchestrator: one actor task coordinating all advancement tasks.
//!
//! ## Lifecycle
//!
//! ```text
//! RaceTracker::spawn(participants) -> RaceTrackerHandle
//!   handle.select_runner / start / pause / restart / continue_with_points
//!     -> command channel -> actor loop
//!   actor loop: select! { next command | next settled advancement task }
//!     -> mutates RaceSession, publishes RaceSnapshot over a watch channel
//! ```
//!
//! The actor loop is the single writer of session state. Advancement tasks
//! run concurrently in a `JoinSet`; each participant is moved into its task
//! and handed back when the task settles (finish line reached or cancelled),
//! so progress state has exactly one owner at any moment. Because settled
//! tasks are consumed one at a time by the loop, winner evaluation is
//! serialized: the winner is recorded exactly once per attempt, and ties
//! within one evaluation window resolve to the lowest-declared lane.
//!
//! Commands that are not legal in the current phase are dropped with a debug
//! log; nothing on this surface returns an error to the caller.

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pace::{ChaChaDraw, DelayDraw};
use crate::participant::RaceParticipant;
use crate::session::RaceSession;
use crate::snapshot::{LaneSnapshot, RaceSnapshot};
use crate::state_machine::RacePhase;

/// Lane names of the default three-runner field.
pub const DEFAULT_RUNNER_NAMES: [&str; 3] = ["N°1", "N°2", "N°3"];

/// The default field: three runners, increment 1, finish line at 100.
///
/// With a seed, each runner gets its own deterministic delay stream; without
/// one, every race is fresh entropy.
pub fn default_participants(seed: Option<u64>) -> Vec<RaceParticipant> {
    DEFAULT_RUNNER_NAMES
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let draw: Box<dyn DelayDraw> = match seed {
                Some(seed) => Box::new(ChaChaDraw::seeded(seed.wrapping_add(index as u64))),
                None => Box::new(ChaChaDraw::from_entropy()),
            };
            RaceParticipant::new(*name, draw)
        })
        .collect()
}

// ── Commands ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Command {
    SelectRunner(String),
    Start,
    Pause,
    Restart,
    ContinueWithPoints,
}

// ── Lanes ────────────────────────────────────────────────────────────────────

/// Actor-side lane bookkeeping. `participant` is `None` exactly while its
/// advancement task is running.
struct Lane {
    name: String,
    max_progress: u32,
    progress: watch::Receiver<u32>,
    participant: Option<RaceParticipant>,
}

/// Read-only view of one lane, handed to observers.
#[derive(Clone)]
pub struct LaneView {
    name: String,
    max_progress: u32,
    progress: watch::Receiver<u32>,
}

impl LaneView {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_progress(&self) -> u32 {
        self.max_progress
    }

    pub fn progress(&self) -> u32 {
        *self.progress.borrow()
    }

    pub fn progress_factor(&self) -> f64 {
        (f64::from(self.progress()) / f64::from(self.max_progress)).clamp(0.0, 1.0)
    }

    /// A receiver that fires on every progress tick of this lane.
    pub fn watch(&self) -> watch::Receiver<u32> {
        self.progress.clone()
    }
}

// ── Handle ───────────────────────────────────────────────────────────────────

/// Public surface consumed by the presentation layer.
///
/// Commands are fire-and-forget; invalid ones are silently ignored by the
/// actor. State is observed through [`subscribe`](Self::subscribe) and
/// [`lanes`](Self::lanes). The actor exits once every handle is dropped.
#[derive(Clone)]
pub struct RaceTrackerHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<RaceSnapshot>,
    lanes: Vec<LaneView>,
}

impl RaceTrackerHandle {
    pub fn select_runner(&self, name: impl Into<String>) {
        self.send(Command::SelectRunner(name.into()));
    }

    pub fn start(&self) {
        self.send(Command::Start);
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn restart(&self) {
        self.send(Command::Restart);
    }

    pub fn continue_with_points(&self) {
        self.send(Command::ContinueWithPoints);
    }

    /// Watch session snapshots; a new value arrives on every mutation.
    pub fn subscribe(&self) -> watch::Receiver<RaceSnapshot> {
        self.snapshots.clone()
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> RaceSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Per-lane live progress views, in declared (tie-break) order.
    pub fn lanes(&self) -> &[LaneView] {
        &self.lanes
    }

    fn send(&self, command: Command) {
        if let Err(err) = self.commands.try_send(command) {
            warn!(error = %err, "race tracker command dropped");
        }
    }
}

// ── Actor ────────────────────────────────────────────────────────────────────

/// The orchestrator actor. Constructed and consumed by [`RaceTracker::spawn`].
pub struct RaceTracker {
    lanes: Vec<Lane>,
    session: RaceSession,
    tasks: JoinSet<(usize, RaceParticipant)>,
    cancel: CancellationToken,
    commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<RaceSnapshot>,
}

impl RaceTracker {
    /// Spawn the orchestrator for the given field and return its handle.
    pub fn spawn(participants: Vec<RaceParticipant>) -> RaceTrackerHandle {
        let (command_tx, command_rx) = mpsc::channel(32);

        let lanes: Vec<Lane> = participants
            .into_iter()
            .map(|participant| Lane {
                name: participant.name().to_string(),
                max_progress: participant.max_progress(),
                progress: participant.subscribe(),
                participant: Some(participant),
            })
            .collect();

        let views: Vec<LaneView> = lanes
            .iter()
            .map(|lane| LaneView {
                name: lane.name.clone(),
                max_progress: lane.max_progress,
                progress: lane.progress.clone(),
            })
            .collect();

        let session = RaceSession::new();
        let (snapshot_tx, snapshot_rx) = watch::channel(build_snapshot(&session, &lanes));

        let tracker = Self {
            lanes,
            session,
            tasks: JoinSet::new(),
            cancel: CancellationToken::new(),
            commands: command_rx,
            snapshots: snapshot_tx,
        };
        tokio::spawn(tracker.run());

        RaceTrackerHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            lanes: views,
        }
    }

    async fn run(mut self) {
        info!(lanes = self.lanes.len(), "race tracker started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    // Every handle dropped: the session is over.
                    None => break,
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.settle(joined);
                    self.publish();
                }
            }
        }

        self.cancel.cancel();
        while self.tasks.join_next().await.is_some() {}
        info!("race tracker stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        debug!(?command, phase = %self.session.phase(), "command received");
        match command {
            Command::SelectRunner(name) => self.select_runner(name),
            Command::Start => self.start(),
            Command::Pause => self.pause().await,
            Command::Restart => self.restart().await,
            Command::ContinueWithPoints => self.continue_with_points().await,
        }
    }

    // ── Command handlers ─────────────────────────────────────────────────

    fn select_runner(&mut self, name: String) {
        if !self.lanes.iter().any(|lane| lane.name == name) {
            debug!(runner = %name, "ignoring selection of unknown runner");
            return;
        }
        if self.session.select_runner(&name) {
            self.publish();
        } else {
            debug!(runner = %name, "selection ignored in current phase");
        }
    }

    fn start(&mut self) {
        if !self.session.begin_attempt() {
            debug!("start ignored in current phase");
            return;
        }

        self.cancel = CancellationToken::new();
        for (index, lane) in self.lanes.iter_mut().enumerate() {
            // Lanes are always settled in Idle, which is the only phase
            // begin_attempt accepts.
            let Some(mut participant) = lane.participant.take() else {
                warn!(runner = %lane.name, "lane still has an active task");
                continue;
            };
            let cancel = self.cancel.clone();
            self.tasks.spawn(async move {
                participant.advance(cancel).await;
                (index, participant)
            });
        }

        info!(
            backed = ?self.session.selected_runner(),
            lanes = self.lanes.len(),
            "race started"
        );
        self.publish();
    }

    async fn pause(&mut self) {
        if !self.session.race_in_progress() {
            debug!("pause ignored in current phase");
            return;
        }

        self.cancel.cancel();
        self.drain().await;

        // A runner may cross the line in the instant the pause lands; the
        // drained completion then records the winner and the attempt settles
        // as finished instead of pausing.
        if self.session.pause() {
            info!("race paused");
        }
        self.publish();
    }

    async fn restart(&mut self) {
        if self.session.phase() != RacePhase::Finished {
            debug!("restart ignored in current phase");
            return;
        }

        self.cancel.cancel();
        self.drain().await;

        if self.session.restart() {
            self.reset_lanes();
            info!("race restarted");
        }
        self.publish();
    }

    async fn continue_with_points(&mut self) {
        if self.session.phase() != RacePhase::OutOfLives {
            debug!("continue ignored in current phase");
            return;
        }
        if !self.session.continue_with_points() {
            debug!(score = self.session.score(), "continue ignored: not enough points");
            return;
        }

        self.cancel.cancel();
        self.drain().await;
        self.reset_lanes();
        info!(score = self.session.score(), "continued with points");
        self.publish();
    }

    // ── Task completion ──────────────────────────────────────────────────

    /// Take back a settled participant and evaluate the winner.
    ///
    /// Runs for every completed advancement task, whether it reached the
    /// finish line or was cancelled mid-wait.
    fn settle(&mut self, joined: Result<(usize, RaceParticipant), JoinError>) {
        match joined {
            Ok((index, participant)) => {
                debug!(runner = %participant.name(), progress = participant.current_progress(), "lane settled");
                self.lanes[index].participant = Some(participant);
                self.evaluate_winner();
            }
            Err(err) => warn!(error = %err, "advancement task aborted"),
        }
    }

    /// First lane past the finish line, scanned in declared order, wins.
    /// No-op once a winner is recorded for this attempt.
    fn evaluate_winner(&mut self) {
        if self.session.winner().is_some() || !self.session.race_in_progress() {
            return;
        }

        let finisher = self
            .lanes
            .iter()
            .find(|lane| *lane.progress.borrow() >= lane.max_progress)
            .map(|lane| lane.name.clone());

        if let Some(name) = finisher {
            self.session.record_winner(&name);
            info!(
                winner = %name,
                backed = ?self.session.selected_runner(),
                has_won = self.session.has_won(),
                score = self.session.score(),
                lives = self.session.remaining_lives(),
                "race finished"
            );
        }
    }

    // ── Plumbing ─────────────────────────────────────────────────────────

    /// Wait for every advancement task to hand its participant back. Each
    /// drained completion still goes through winner evaluation.
    async fn drain(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            self.settle(joined);
        }
    }

    fn reset_lanes(&mut self) {
        for lane in &mut self.lanes {
            if let Some(participant) = lane.participant.as_mut() {
                participant.reset();
            }
        }
    }

    fn publish(&self) {
        self.snapshots
            .send_replace(build_snapshot(&self.session, &self.lanes));
    }
}

fn build_snapshot(session: &RaceSession, lanes: &[Lane]) -> RaceSnapshot {
    RaceSnapshot {
        phase: session.phase(),
        selected_runner: session.selected_runner().map(String::from),
        winner: session.winner().map(String::from),
        has_won: session.has_won(),
        race_in_progress: session.race_in_progress(),
        race_finished: session.race_finished(),
        remaining_lives: session.remaining_lives(),
        score: session.score(),
        lanes: lanes
            .iter()
            .map(|lane| {
                LaneSnapshot::new(lane.name.clone(), *lane.progress.borrow(), lane.max_progress)
            })
            .collect(),
    }
}
