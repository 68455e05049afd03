use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::TransferError;
use crate::types::{ButtonToken, Destination};

/// One click on one button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub destination: Destination,
    pub button: ButtonToken,
}

impl TransferRequest {
    pub fn new(destination: Destination, button: ButtonToken) -> Self {
        Self {
            destination,
            button,
        }
    }
}

/// Exactly one of these is produced per accepted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferOutcome {
    Succeeded,
    FailedNoHost,
    FailedNoActiveInteraction,
    FailedHostRejected(String),
    FailedTimeout,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Stable label for logs and history.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::FailedNoHost => "failed_no_host",
            Self::FailedNoActiveInteraction => "failed_no_active_interaction",
            Self::FailedHostRejected(_) => "failed_host_rejected",
            Self::FailedTimeout => "failed_timeout",
        }
    }

    pub fn into_result(self, timeout: Duration) -> Result<(), TransferError> {
        match self {
            Self::Succeeded => Ok(()),
            Self::FailedNoHost => Err(TransferError::HostUnavailable),
            Self::FailedNoActiveInteraction => Err(TransferError::NoActiveInteraction),
            Self::FailedHostRejected(reason) => Err(TransferError::HostRejected(reason)),
            Self::FailedTimeout => Err(TransferError::Timeout(timeout)),
        }
    }

    /// Human-readable status line for the agent.
    pub fn status_message(&self, destination: &Destination, timeout: Duration) -> String {
        match self.clone().into_result(timeout) {
            Ok(()) => format!("Transfer attempted to {destination}"),
            Err(e) => format!("Transfer failed: {e}"),
        }
    }
}
