use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::InteractionId;

const VOICE_MEDIA: &[&str] = &["telephony", "voice"];
const TERMINAL_STATES: &[&str] = &["ended", "wrapup"];

/// One contact/task as the host reports it.
///
/// Host variants disagree on field names, so every field is optional and
/// classification looks at whichever ones are set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_terminated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl TaskRecord {
    pub fn new(media_type: impl Into<String>) -> Self {
        Self {
            media_type: Some(media_type.into()),
            ..Default::default()
        }
    }

    pub fn with_interaction_id(mut self, id: impl Into<String>) -> Self {
        self.interaction_id = Some(id.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_terminated(mut self, terminated: bool) -> Self {
        self.terminated = Some(terminated);
        self
    }

    /// First media label the host filled in.
    pub fn media_label(&self) -> Option<&str> {
        self.media_type
            .as_deref()
            .or(self.media.as_deref())
            .or(self.media_channel.as_deref())
    }

    pub fn is_voice(&self) -> bool {
        self.media_label()
            .is_some_and(|m| VOICE_MEDIA.iter().any(|v| m.trim().eq_ignore_ascii_case(v)))
    }

    /// No terminal signal at all means the task is still live.
    pub fn is_terminated(&self) -> bool {
        if self.terminated == Some(true) || self.is_terminated == Some(true) {
            return true;
        }
        self.state
            .as_deref()
            .is_some_and(|s| TERMINAL_STATES.iter().any(|t| s.trim().eq_ignore_ascii_case(t)))
    }

    pub fn is_active_voice(&self) -> bool {
        self.is_voice() && !self.is_terminated()
    }

    fn interaction(&self) -> Option<InteractionId> {
        self.interaction_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(InteractionId::new)
    }
}

/// Snapshot of call eligibility. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawInteractionState")]
pub struct InteractionState {
    has_active_voice_interaction: bool,
    interaction_id: Option<InteractionId>,
    as_of: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInteractionState {
    has_active_voice_interaction: bool,
    #[serde(default)]
    interaction_id: Option<InteractionId>,
    as_of: DateTime<Utc>,
}

impl TryFrom<RawInteractionState> for InteractionState {
    type Error = String;

    fn try_from(raw: RawInteractionState) -> Result<Self, Self::Error> {
        match (raw.has_active_voice_interaction, raw.interaction_id) {
            (true, id) => Ok(Self::active(id, raw.as_of)),
            (false, None) => Ok(Self::inactive(raw.as_of)),
            (false, Some(id)) => Err(format!(
                "inactive snapshot cannot carry interaction {}",
                id.as_str()
            )),
        }
    }
}

impl InteractionState {
    pub fn inactive(as_of: DateTime<Utc>) -> Self {
        Self {
            has_active_voice_interaction: false,
            interaction_id: None,
            as_of,
        }
    }

    pub fn active(interaction_id: Option<InteractionId>, as_of: DateTime<Utc>) -> Self {
        Self {
            has_active_voice_interaction: true,
            interaction_id,
            as_of,
        }
    }

    /// The first live voice entry wins; collection order breaks ties.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a TaskRecord>,
        as_of: DateTime<Utc>,
    ) -> Self {
        entries
            .into_iter()
            .find(|t| t.is_active_voice())
            .map(|t| Self::active(t.interaction(), as_of))
            .unwrap_or_else(|| Self::inactive(as_of))
    }

    pub fn has_active_voice_interaction(&self) -> bool {
        self.has_active_voice_interaction
    }

    pub fn interaction_id(&self) -> Option<&InteractionId> {
        self.interaction_id.as_ref()
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    /// Equal apart from the timestamp.
    pub fn same_interaction(&self, other: &Self) -> bool {
        self.has_active_voice_interaction == other.has_active_voice_interaction
            && self.interaction_id == other.interaction_id
    }
}
