use serde::{Deserialize, Serialize};

use crate::error::TransferError;
use crate::types::{ButtonToken, Destination};

/// One entry of the externally supplied button list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonConfig {
    pub label: String,
    pub dest: String,
}

impl ButtonConfig {
    pub fn new(label: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            dest: dest.into(),
        }
    }
}

/// A validated button, ready to render and dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferButton {
    pub token: ButtonToken,
    pub label: String,
    pub destination: Destination,
}

/// Parses the raw JSON button list (the `data-buttons` attribute value).
///
/// Blank input means "no buttons". Anything else must be a JSON array of
/// `{label, dest}` objects.
pub fn parse_button_list(raw: &str) -> Result<Vec<ButtonConfig>, TransferError> {
    if raw.trim().is_empty() {
        return Ok(vec![]);
    }

    serde_json::from_str::<Vec<ButtonConfig>>(raw)
        .map_err(|e| TransferError::ConfigInvalid(e.to_string()))
}

/// Validates every entry; a single bad entry rejects the whole list.
pub fn build_buttons(configs: &[ButtonConfig]) -> Result<Vec<TransferButton>, TransferError> {
    configs
        .iter()
        .enumerate()
        .map(|(idx, cfg)| {
            let label = cfg.label.trim();
            if label.is_empty() {
                return Err(TransferError::ConfigInvalid(format!(
                    "button {idx} has no label"
                )));
            }
            let destination = Destination::parse(&cfg.dest).map_err(|_| {
                TransferError::ConfigInvalid(format!("button {idx} ({label}) has no destination"))
            })?;
            Ok(TransferButton {
                token: ButtonToken::new(),
                label: label.to_string(),
                destination,
            })
        })
        .collect()
}
