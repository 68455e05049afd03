use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransferError;

/// Host-assigned identifier of one interaction. Opaque to us.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionId(pub String);

impl InteractionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identity of one rendered button, used to key the in-flight guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ButtonToken(pub Uuid);

impl ButtonToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ButtonToken {
    fn default() -> Self {
        Self::new()
    }
}

/// A transfer target (usually a directory number). Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Destination(String);

impl Destination {
    pub fn parse(value: impl AsRef<str>) -> Result<Self, TransferError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TransferError::ConfigInvalid(
                "transfer destination is empty".into(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Destination {
    type Error = TransferError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Destination> for String {
    fn from(value: Destination) -> Self {
        value.0
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Media type string the host expects on voice transfers.
pub const VOICE_MEDIA_TYPE: &str = "telephony";

/// Destination kind for directory-number transfers.
pub const DIRECTORY_NUMBER: &str = "DN";
