//! Polled-completion checkpoints.
//!
//! Navigation-style checkpoints ("drive to the pick-up point") are completed
//! by the host's own stack, not by this crate: the host registers a
//! [`CompletionProbe`] per goal name and the checkpoint polls it each tick.
//! No navigation logic lives here.

use std::collections::HashMap;

use tracing::warn;

use super::{Checkpoint, CheckpointCore};
use crate::error::CompetitionError;
use crate::time::SimMicros;

/// Synchronous completion signal supplied by the host.
pub trait CompletionProbe: Send {
    /// Poll the externally-tracked goal condition. Called at tick rate while
    /// the owning checkpoint is active; expected to stay true once reached.
    fn poll(&mut self, now_us: SimMicros) -> bool;
}

impl<F> CompletionProbe for F
where
    F: FnMut(SimMicros) -> bool + Send,
{
    fn poll(&mut self, now_us: SimMicros) -> bool {
        self(now_us)
    }
}

/// Checkpoint completed by a host-registered polled probe.
pub struct NavigationCheckpoint {
    core: CheckpointCore,
    probe: Option<Box<dyn CompletionProbe>>,
}

impl NavigationCheckpoint {
    /// A checkpoint constructed without a probe is valid but can never
    /// complete; the configuration warning is emitted at build time by the
    /// sequencer, which knows the goal name involved.
    pub fn new(ordinal: u8, weight: f64, probe: Option<Box<dyn CompletionProbe>>) -> Self {
        Self {
            core: CheckpointCore::new(ordinal, weight),
            probe,
        }
    }
}

impl Checkpoint for NavigationCheckpoint {
    fn core(&self) -> &CheckpointCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CheckpointCore {
        &mut self.core
    }

    fn check(&mut self, now_us: SimMicros) -> bool {
        match self.probe.as_mut() {
            Some(probe) => probe.poll(now_us),
            None => false,
        }
    }
}

/// Registry of completion probes, keyed by goal name.
///
/// The host fills this before the sequencer is built; building a
/// navigation checkpoint takes its probe out of the registry.
#[derive(Default)]
pub struct ProbeRegistry {
    probes: HashMap<String, Box<dyn CompletionProbe>>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a probe for `goal`. Returns an error if one is already
    /// registered under that name.
    pub fn register(
        &mut self,
        goal: &str,
        probe: Box<dyn CompletionProbe>,
    ) -> Result<(), CompetitionError> {
        if self.probes.contains_key(goal) {
            return Err(CompetitionError::ProbeAlreadyRegistered(goal.to_string()));
        }
        self.probes.insert(goal.to_string(), probe);
        Ok(())
    }

    /// Remove and return the probe registered for `goal`.
    pub fn take(&mut self, goal: &str) -> Option<Box<dyn CompletionProbe>> {
        let probe = self.probes.remove(goal);
        if probe.is_none() {
            warn!(goal, "no completion probe registered for goal");
        }
        probe
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_drives_completion() {
        let mut checkpoint =
            NavigationCheckpoint::new(1, 1.0, Some(Box::new(|now: SimMicros| now >= 5_000_000)));
        checkpoint.start(0);

        assert!(!checkpoint.check(0));
        assert!(!checkpoint.check(4_999_999));
        assert!(checkpoint.check(5_000_000));
    }

    #[test]
    fn missing_probe_never_completes() {
        let mut checkpoint = NavigationCheckpoint::new(1, 1.0, None);
        checkpoint.start(0);

        assert!(!checkpoint.check(u64::MAX));
    }

    #[test]
    fn registry_register_and_take() {
        let mut registry = ProbeRegistry::new();
        assert!(registry.is_empty());

        registry
            .register("pickup", Box::new(|_: SimMicros| true))
            .unwrap();
        assert_eq!(registry.len(), 1);

        let mut probe = registry.take("pickup").unwrap();
        assert!(probe.poll(0));
        assert!(registry.take("pickup").is_none());
    }

    #[test]
    fn registry_rejects_duplicate_goal() {
        let mut registry = ProbeRegistry::new();
        registry
            .register("pickup", Box::new(|_: SimMicros| false))
            .unwrap();

        let err = registry
            .register("pickup", Box::new(|_: SimMicros| false))
            .unwrap_err();
        assert!(matches!(err, CompetitionError::ProbeAlreadyRegistered(_)));
    }
}
