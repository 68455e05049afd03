use serde::{Deserialize, Serialize};

/// How the monitor learns about the current interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionMode {
    /// Host pushes contact lifecycle events; each event triggers one
    /// selected-contact read.
    EventSubscription,
    /// Poll the selected-contact accessor.
    SelectedContactPoll,
    /// Poll the task collection and scan every entry.
    TaskScanPoll,
    Unavailable,
}

impl DetectionMode {
    pub fn is_polling(self) -> bool {
        matches!(self, Self::SelectedContactPoll | Self::TaskScanPoll)
    }
}

/// Which host transfer call (and payload shape) is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferMode {
    /// `blindTransfer({interactionId, data: {destAgentId, mediaType, destinationType}})`
    AgentContact,
    /// `invoke("TelephonyService:blindTransfer", {address, ...})`
    ServiceInvoke,
    Unavailable,
}

/// Result of probing the host. Replaced wholesale on re-probe.
///
/// Fields are private so an absent host can never carry a usable mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostCapabilities {
    present: bool,
    detection_mode: DetectionMode,
    transfer_mode: TransferMode,
}

impl HostCapabilities {
    pub fn unavailable() -> Self {
        Self {
            present: false,
            detection_mode: DetectionMode::Unavailable,
            transfer_mode: TransferMode::Unavailable,
        }
    }

    pub fn detected(detection_mode: DetectionMode, transfer_mode: TransferMode) -> Self {
        Self {
            present: true,
            detection_mode,
            transfer_mode,
        }
    }

    pub fn present(&self) -> bool {
        self.present
    }

    pub fn detection_mode(&self) -> DetectionMode {
        self.detection_mode
    }

    pub fn transfer_mode(&self) -> TransferMode {
        self.transfer_mode
    }

    pub fn can_transfer(&self) -> bool {
        self.transfer_mode != TransferMode::Unavailable
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::unavailable()
    }
}
