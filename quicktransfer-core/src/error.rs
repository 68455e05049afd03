use std::time::Duration;
use thiserror::Error;

/// Failure kinds surfaced by the transfer widget.
///
/// `HostQueryFailed` stays inside the monitor; the rest reach the caller,
/// either as a [`crate::outcome::TransferOutcome`] or as a configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("call-control host is not available")]
    HostUnavailable,

    #[error("host query failed: {0}")]
    HostQueryFailed(String),

    #[error("no active call available to transfer")]
    NoActiveInteraction,

    // Keep the host's wording; agents read it.
    #[error("{0}")]
    HostRejected(String),

    #[error("host did not respond within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("invalid button configuration: {0}")]
    ConfigInvalid(String),
}
