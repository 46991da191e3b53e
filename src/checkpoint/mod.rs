//! Checkpoint contract and shared timing state.
//!
//! A checkpoint is one ordered, independently-scored stage of the
//! competition. The sequencer activates checkpoints one at a time and polls
//! the active one each tick; how completion is detected is up to the kind
//! ([`ContainCheckpoint`] listens to an external sensor, a
//! [`NavigationCheckpoint`] polls a host-supplied probe). Every kind embeds
//! a [`CheckpointCore`] carrying the ordinal, scoring weight, and the
//! start/end timestamps that define its score.

pub mod contain;
pub mod nav;

pub use contain::ContainCheckpoint;
pub use nav::{CompletionProbe, NavigationCheckpoint, ProbeRegistry};

use tracing::{debug, info};

use crate::time::{self, SimMicros};

/// Ordinal, weight, and timing window shared by every checkpoint kind.
///
/// Both timestamps start unset. `start` and `finalize` are each applied at
/// most once; the sequencer guarantees the single-call discipline and a
/// second call is ignored with a debug log rather than corrupting the
/// recorded window.
#[derive(Debug, Clone)]
pub struct CheckpointCore {
    ordinal: u8,
    weight: f64,
    start_us: Option<SimMicros>,
    end_us: Option<SimMicros>,
}

impl CheckpointCore {
    pub fn new(ordinal: u8, weight: f64) -> Self {
        Self {
            ordinal,
            weight,
            start_us: None,
            end_us: None,
        }
    }

    /// 1-based position of this checkpoint in the competition.
    pub fn ordinal(&self) -> u8 {
        self.ordinal
    }

    pub fn started(&self) -> bool {
        self.start_us.is_some()
    }

    pub fn finished(&self) -> bool {
        self.end_us.is_some()
    }

    /// Record the activation time. Called once, when this checkpoint becomes
    /// the active one.
    pub fn start(&mut self, now_us: SimMicros) {
        if self.started() {
            debug!(ordinal = self.ordinal, "start ignored: checkpoint already started");
            return;
        }
        self.start_us = Some(now_us);
        info!(
            ordinal = self.ordinal,
            sim_time_s = time::to_seconds(now_us),
            "checkpoint started"
        );
    }

    /// Freeze the score by recording the completion time.
    pub fn finalize(&mut self, now_us: SimMicros) {
        if self.finished() {
            debug!(ordinal = self.ordinal, "finalize ignored: checkpoint already finished");
            return;
        }
        self.end_us = Some(now_us);
    }

    /// Time-weighted score: elapsed active seconds times the weight.
    ///
    /// Zero before the checkpoint starts; accrues against `now_us` while
    /// active; constant once finalized.
    pub fn score(&self, now_us: SimMicros) -> f64 {
        let Some(start) = self.start_us else {
            return 0.0;
        };
        let end = self.end_us.unwrap_or(now_us);
        time::to_seconds(end.saturating_sub(start)) * self.weight
    }
}

/// Contract between the sequencer and one scoring stage.
///
/// The sequencer calls `start` exactly once when the checkpoint becomes
/// active, then `check` every tick until it returns true, then `finalize`
/// exactly once. `score` is safe to call at any time, including before
/// activation and after completion.
pub trait Checkpoint: Send {
    fn core(&self) -> &CheckpointCore;

    fn core_mut(&mut self) -> &mut CheckpointCore;

    /// Poll for completion.
    ///
    /// Called at tick rate while this checkpoint is active. Implementations
    /// may lazily establish transport resources on the first call and must
    /// tear them down once completion is confirmed; after returning true the
    /// sequencer never calls `check` again.
    fn check(&mut self, now_us: SimMicros) -> bool;

    fn ordinal(&self) -> u8 {
        self.core().ordinal()
    }

    fn start(&mut self, now_us: SimMicros) {
        self.core_mut().start(now_us);
    }

    fn finalize(&mut self, now_us: SimMicros) {
        self.core_mut().finalize(now_us);
    }

    fn score(&self, now_us: SimMicros) -> f64 {
        self.core().score(now_us)
    }
}
