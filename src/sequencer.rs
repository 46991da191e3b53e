//! Competition state machine.
//!
//! The sequencer owns the ordered checkpoint list and drives it from the
//! host simulation's per-tick callback: it polls the active checkpoint,
//! finalizes and advances on completion (one step per tick, even if more
//! could complete in the same instant), detects overall completion, and
//! emits throttled score reports. The host's network layer turns the
//! returned [`CompetitionEvent`]s into whatever wire messages it speaks.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::checkpoint::{Checkpoint, ContainCheckpoint, NavigationCheckpoint, ProbeRegistry};
use crate::config::{CheckpointConfig, CompetitionConfig, DEFAULT_SCORE_FREQUENCY};
use crate::error::CompetitionError;
use crate::time::{self, SimMicros};
use crate::transport::Transport;

/// Sequencer state: idle, or running checkpoint `index` (0-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Running { index: usize },
}

/// Response to an accepted start request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartResponse {
    /// Where the agent picks up its guest, from the competition config.
    pub pick_up_location: String,
}

/// Aggregated scores, one entry per configured checkpoint (index =
/// ordinal - 1) plus the total. In-progress checkpoints contribute their
/// running score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    pub checkpoints: Vec<f64>,
    pub total: f64,
}

/// Events produced by one tick of the sequencer.
#[derive(Debug, Clone, PartialEq)]
pub enum CompetitionEvent {
    /// The active checkpoint completed and its score was finalized.
    CheckpointCompleted { ordinal: u8 },
    /// The last checkpoint completed; the sequencer is idle again.
    CompetitionComplete,
    /// A throttled score report is due for publication.
    ScoreReady(ScoreReport),
}

/// Drives checkpoints in order and aggregates their scores.
pub struct CheckpointSequencer {
    checkpoints: Vec<Box<dyn Checkpoint>>,
    state: SequencerState,
    pick_up_location: String,
    score_interval_us: SimMicros,
    last_score_pub_us: SimMicros,
}

impl CheckpointSequencer {
    /// Build a sequencer from its loaded configuration.
    ///
    /// Checkpoint-level defects (missing weight, missing namespace, missing
    /// probe) degrade with a warning; config that leaves no well-defined
    /// starting state (no pick-up location, no checkpoints) fails the load.
    pub fn new(
        config: CompetitionConfig,
        transport: Arc<dyn Transport>,
        mut probes: ProbeRegistry,
    ) -> Result<Self, CompetitionError> {
        let pick_up_location = match config.pick_up_location {
            Some(location) if !location.is_empty() => location,
            _ => {
                error!("missing pick_up_location, competition not initialized");
                return Err(CompetitionError::MissingPickUpLocation);
            }
        };

        if config.checkpoints.is_empty() {
            error!("competition config has no checkpoints");
            return Err(CompetitionError::NoCheckpoints);
        }
        if config.checkpoints.len() > usize::from(u8::MAX) {
            return Err(CompetitionError::TooManyCheckpoints(config.checkpoints.len()));
        }

        let checkpoints = config
            .checkpoints
            .iter()
            .enumerate()
            .map(|(index, definition)| {
                build_checkpoint(index, definition, &transport, &mut probes)
            })
            .collect::<Vec<_>>();

        let sequencer = Self::from_parts(checkpoints, pick_up_location, config.score_frequency);
        info!(
            checkpoints = sequencer.checkpoints.len(),
            score_frequency_hz = time::MICROS_PER_SEC as f64 / sequencer.score_interval_us as f64,
            "competition loaded"
        );
        Ok(sequencer)
    }

    pub(crate) fn from_parts(
        checkpoints: Vec<Box<dyn Checkpoint>>,
        pick_up_location: String,
        score_frequency: f64,
    ) -> Self {
        let frequency = if score_frequency.is_finite() && score_frequency > 0.0 {
            score_frequency
        } else {
            warn!(
                score_frequency,
                "invalid score_frequency; defaulting to {DEFAULT_SCORE_FREQUENCY} Hz"
            );
            DEFAULT_SCORE_FREQUENCY
        };

        Self {
            checkpoints,
            state: SequencerState::Idle,
            pick_up_location,
            score_interval_us: time::interval_from_hz(frequency),
            last_score_pub_us: 0,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SequencerState::Running { .. })
    }

    /// 1-based ordinal of the active checkpoint, 0 when idle. This is the
    /// convention score consumers and logs use.
    pub fn current_ordinal(&self) -> u8 {
        match self.state {
            SequencerState::Idle => 0,
            SequencerState::Running { index } => (index + 1) as u8,
        }
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn pick_up_location(&self) -> &str {
        &self.pick_up_location
    }

    /// Handle a start request from the control layer.
    ///
    /// Rejected without any state change if a competition is already
    /// running.
    pub fn start(&mut self, now_us: SimMicros) -> Result<StartResponse, CompetitionError> {
        if self.is_running() {
            error!("start rejected: competition is already running");
            return Err(CompetitionError::AlreadyRunning);
        }

        self.state = SequencerState::Running { index: 0 };
        self.checkpoints[0].start(now_us);
        info!(
            checkpoints = self.checkpoints.len(),
            sim_time_s = time::to_seconds(now_us),
            "competition started"
        );

        Ok(StartResponse {
            pick_up_location: self.pick_up_location.clone(),
        })
    }

    /// Drive one simulation tick.
    ///
    /// Advances at most one checkpoint, and emits at most one score report
    /// no sooner than the configured interval after the previous one.
    pub fn update(&mut self, now_us: SimMicros) -> Vec<CompetitionEvent> {
        let mut events = Vec::new();

        if let SequencerState::Running { index } = self.state {
            if self.checkpoints[index].check(now_us) {
                self.checkpoints[index].finalize(now_us);
                let ordinal = self.checkpoints[index].ordinal();
                info!(
                    ordinal,
                    sim_time_s = time::to_seconds(now_us),
                    "checkpoint complete"
                );
                events.push(CompetitionEvent::CheckpointCompleted { ordinal });

                let next = index + 1;
                if next >= self.checkpoints.len() {
                    self.state = SequencerState::Idle;
                    info!(sim_time_s = time::to_seconds(now_us), "competition complete");
                    events.push(CompetitionEvent::CompetitionComplete);
                } else {
                    self.state = SequencerState::Running { index: next };
                    self.checkpoints[next].start(now_us);
                }
            }
        }

        if now_us.saturating_sub(self.last_score_pub_us) >= self.score_interval_us {
            events.push(CompetitionEvent::ScoreReady(self.score_report(now_us)));
            self.last_score_pub_us = now_us;
        }

        events
    }

    /// Aggregate every configured checkpoint's score at `now_us`.
    pub fn score_report(&self, now_us: SimMicros) -> ScoreReport {
        let checkpoints: Vec<f64> = self
            .checkpoints
            .iter()
            .map(|checkpoint| checkpoint.score(now_us))
            .collect();
        let total = checkpoints.iter().sum();
        ScoreReport { checkpoints, total }
    }
}

impl fmt::Debug for CheckpointSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckpointSequencer")
            .field("state", &self.state)
            .field("checkpoints", &self.checkpoints.len())
            .field("pick_up_location", &self.pick_up_location)
            .finish()
    }
}

fn build_checkpoint(
    index: usize,
    definition: &CheckpointConfig,
    transport: &Arc<dyn Transport>,
    probes: &mut ProbeRegistry,
) -> Box<dyn Checkpoint> {
    let ordinal = (index + 1) as u8;
    let weight = normalize_weight(ordinal, definition.weight());

    match definition {
        CheckpointConfig::Contain { namespace, .. } => Box::new(ContainCheckpoint::new(
            ordinal,
            weight,
            namespace.clone(),
            Arc::clone(transport),
        )),
        CheckpointConfig::Navigation { goal, .. } => {
            let probe = match goal.as_deref() {
                Some(goal) => probes.take(goal),
                None => {
                    warn!(ordinal, "navigation checkpoint has no goal; it will never complete");
                    None
                }
            };
            Box::new(NavigationCheckpoint::new(ordinal, weight, probe))
        }
    }
}

fn normalize_weight(ordinal: u8, weight: Option<f64>) -> f64 {
    match weight {
        Some(weight) if weight.is_finite() && weight >= 0.0 => weight,
        Some(weight) => {
            warn!(ordinal, weight, "invalid checkpoint weight; defaulting to 0");
            0.0
        }
        None => {
            warn!(ordinal, "missing checkpoint weight; defaulting to 0");
            0.0
        }
    }
}
