/// Errors that can occur while loading or driving a competition.
#[derive(Debug, thiserror::Error)]
pub enum CompetitionError {
    #[error("competition config is missing pick_up_location")]
    MissingPickUpLocation,

    #[error("competition config has no checkpoints")]
    NoCheckpoints,

    #[error("competition config has too many checkpoints: {0}")]
    TooManyCheckpoints(usize),

    #[error("competition is already running")]
    AlreadyRunning,

    #[error("completion probe already registered for goal: {0}")]
    ProbeAlreadyRegistered(String),

    #[error("not subscribed to topic: {0}")]
    NotSubscribed(String),
}
