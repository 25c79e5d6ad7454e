use thiserror::Error;

/// The single failure kind for talking to the registration service. The
/// presentation layer only ever learns that a refresh did not land; retrying
/// is an explicit user action, never automatic.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Network failure, connection refusal, or a non-2xx status.
    #[error("registration service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response body decoded but was not the shape the service promises,
    /// e.g. a top-level array where an object is required.
    #[error("registration service returned an unusable payload: {0}")]
    Payload(String),
}
