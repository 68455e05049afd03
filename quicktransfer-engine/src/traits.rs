use async_trait::async_trait;
use quicktransfer_core::interaction::TaskRecord;
use quicktransfer_core::types::{DIRECTORY_NUMBER, VOICE_MEDIA_TYPE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Host method name for the invoke-style transfer.
pub const INVOKE_BLIND_TRANSFER: &str = "TelephonyService:blindTransfer";

/// Contact lifecycle signals the host can push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactEvent {
    Updated,
    Started,
    Ended,
}

impl ContactEvent {
    pub const ALL: [ContactEvent; 3] = [Self::Updated, Self::Started, Self::Ended];

    pub fn host_name(self) -> &'static str {
        match self {
            Self::Updated => "eAgentContactUpdated",
            Self::Started => "eAgentContactStarted",
            Self::Ended => "eAgentContactEnded",
        }
    }
}

pub type ContactListener = Arc<dyn Fn(ContactEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

#[async_trait]
pub trait HostInit: Send + Sync {
    async fn init(&self) -> anyhow::Result<()>;

    /// Some hosts finish initializing after `init` resolves.
    fn is_ready(&self) -> bool {
        true
    }
}

pub trait ContactEvents: Send + Sync {
    fn add_event_listener(
        &self,
        event: ContactEvent,
        listener: ContactListener,
    ) -> anyhow::Result<ListenerId>;

    fn remove_event_listener(&self, event: ContactEvent, id: ListenerId);
}

#[async_trait]
pub trait SelectedContactSource: Send + Sync {
    async fn selected_contact(&self) -> anyhow::Result<Option<TaskRecord>>;
}

#[async_trait]
pub trait TaskMapSource: Send + Sync {
    /// `(key, task)` pairs in the host's collection order.
    async fn task_map(&self) -> anyhow::Result<Option<Vec<(String, TaskRecord)>>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlindTransferData {
    pub dest_agent_id: String,
    pub media_type: String,
    pub destination_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlindTransferRequest {
    pub interaction_id: String,
    pub data: BlindTransferData,
}

impl BlindTransferRequest {
    pub fn voice_to_dn(interaction_id: &str, destination: &str) -> Self {
        Self {
            interaction_id: interaction_id.to_string(),
            data: BlindTransferData {
                dest_agent_id: destination.to_string(),
                media_type: VOICE_MEDIA_TYPE.into(),
                destination_type: DIRECTORY_NUMBER.into(),
            },
        }
    }
}

/// Payload of the invoke-style transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeTransferPayload {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<String>,
    pub media_type: String,
    pub destination_type: String,
}

impl InvokeTransferPayload {
    pub fn voice_to_dn(interaction_id: Option<&str>, destination: &str) -> Self {
        Self {
            address: destination.to_string(),
            interaction_id: interaction_id.map(str::to_string),
            media_type: VOICE_MEDIA_TYPE.into(),
            destination_type: DIRECTORY_NUMBER.into(),
        }
    }
}

#[async_trait]
pub trait ContactTransfer: Send + Sync {
    async fn blind_transfer(&self, request: &BlindTransferRequest) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ServiceInvoker: Send + Sync {
    async fn invoke(
        &self,
        method: &str,
        payload: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value>;
}

pub trait HostLogger: Send + Sync {
    fn log(&self, level: log::Level, message: &str);
}

pub trait HostLogging: Send + Sync {
    fn create_logger(&self, name: &str) -> anyhow::Result<Arc<dyn HostLogger>>;
}

/// The capability-bearing host object.
///
/// Every surface is optional: deployments expose different subsets and the
/// probe decides what to use from what is returned here.
pub trait Host: Send + Sync {
    fn init_api(&self) -> Option<&dyn HostInit> {
        None
    }

    fn event_api(&self) -> Option<&dyn ContactEvents> {
        None
    }

    fn selected_contact_api(&self) -> Option<&dyn SelectedContactSource> {
        None
    }

    fn task_map_api(&self) -> Option<&dyn TaskMapSource> {
        None
    }

    fn transfer_api(&self) -> Option<&dyn ContactTransfer> {
        None
    }

    fn invoke_api(&self) -> Option<&dyn ServiceInvoker> {
        None
    }

    fn logging_api(&self) -> Option<&dyn HostLogging> {
        None
    }
}
