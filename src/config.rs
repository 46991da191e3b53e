//! Competition configuration surface.
//!
//! These types describe what the host loads at world startup: an ordered
//! list of checkpoint definitions plus a couple of global parameters. They
//! are pure data; normalization and validation (default weights, rejecting
//! configs with no starting state) happen when the sequencer is built.

use serde::Deserialize;

/// Default score report frequency in Hz.
pub const DEFAULT_SCORE_FREQUENCY: f64 = 50.0;

fn default_score_frequency() -> f64 {
    DEFAULT_SCORE_FREQUENCY
}

/// Top-level competition definition.
#[derive(Debug, Clone, Deserialize)]
pub struct CompetitionConfig {
    /// Location handed to the agent in the start response. Required; a
    /// config without it cannot produce a sequencer.
    #[serde(default)]
    pub pick_up_location: Option<String>,

    /// Frequency in Hz at which score reports are emitted.
    #[serde(default = "default_score_frequency")]
    pub score_frequency: f64,

    /// Ordered checkpoint definitions; list position defines the ordinal.
    #[serde(default)]
    pub checkpoints: Vec<CheckpointConfig>,
}

/// One checkpoint definition, tagged by kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckpointConfig {
    /// Completion reported by an external containment sensor reached over
    /// the transport (enable/disable service plus containment feed).
    Contain {
        #[serde(default)]
        weight: Option<f64>,
        /// Transport namespace of the sensor, e.g. `"pickup_zone"` for the
        /// `pickup_zone/enable` service and `pickup_zone/contain` feed.
        #[serde(default)]
        namespace: Option<String>,
    },

    /// Completion reported by a host-registered polled probe, typically the
    /// navigation stack's goal-reached signal.
    Navigation {
        #[serde(default)]
        weight: Option<f64>,
        /// Name under which the host registered the completion probe.
        #[serde(default)]
        goal: Option<String>,
    },
}

impl CheckpointConfig {
    /// Configured weight, if any. Every kind requires one; a missing weight
    /// is degraded to 0.0 with a warning at build time.
    pub fn weight(&self) -> Option<f64> {
        match self {
            Self::Contain { weight, .. } | Self::Navigation { weight, .. } => *weight,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Contain { .. } => "contain",
            Self::Navigation { .. } => "navigation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config: CompetitionConfig = serde_json::from_str(
            r#"{
                "pick_up_location": "front_desk",
                "score_frequency": 10.0,
                "checkpoints": [
                    {"kind": "navigation", "weight": 1.0, "goal": "pickup"},
                    {"kind": "contain", "weight": 2.0, "namespace": "guest_zone"},
                    {"kind": "navigation", "weight": 0.5, "goal": "start"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.pick_up_location.as_deref(), Some("front_desk"));
        assert_eq!(config.score_frequency, 10.0);
        assert_eq!(config.checkpoints.len(), 3);
        assert_eq!(config.checkpoints[0].kind(), "navigation");
        assert_eq!(config.checkpoints[1].kind(), "contain");
        assert_eq!(config.checkpoints[1].weight(), Some(2.0));
    }

    #[test]
    fn score_frequency_defaults_to_50hz() {
        let config: CompetitionConfig =
            serde_json::from_str(r#"{"pick_up_location": "front_desk"}"#).unwrap();
        assert_eq!(config.score_frequency, DEFAULT_SCORE_FREQUENCY);
        assert!(config.checkpoints.is_empty());
    }

    #[test]
    fn missing_optional_checkpoint_fields_parse_as_none() {
        let config: CompetitionConfig = serde_json::from_str(
            r#"{"checkpoints": [{"kind": "contain"}]}"#,
        )
        .unwrap();

        assert!(config.pick_up_location.is_none());
        assert_eq!(config.checkpoints[0].weight(), None);
        match &config.checkpoints[0] {
            CheckpointConfig::Contain { namespace, .. } => assert!(namespace.is_none()),
            other => panic!("expected contain checkpoint, got {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let result: Result<CompetitionConfig, _> =
            serde_json::from_str(r#"{"checkpoints": [{"kind": "teleport"}]}"#);
        assert!(result.is_err());
    }
}
