use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigitizerError {
    /// An expected capability is absent. The caller adapts.
    #[error("no supported digitizer elements")]
    NotFound,
    #[error("device error: {0}")]
    Device(String),
    /// The provider went away while the operation was running.
    #[error("provider is no longer attached")]
    NoDevice,
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(String),
    #[error("failed to publish multitouch interface: {0}")]
    Publish(String),
    #[error("{0}")]
    Other(String),
}
