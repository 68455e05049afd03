use std::path::Path;

use anyhow::Context;
use quicktransfer_core::interaction::TaskRecord;
use serde::{Deserialize, Serialize};

use crate::memory::{HostSurface, InitBehavior, MemoryHost, TransferBehavior};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FixtureTask {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(flatten)]
    pub task: TaskRecord,
}

/// JSON description of a host deployment, used to stand up a `MemoryHost`
/// outside of tests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostFixture {
    pub surface: HostSurface,
    pub init: InitBehavior,
    pub transfer: TransferBehavior,
    pub selected_contact: Option<TaskRecord>,
    pub tasks: Vec<FixtureTask>,
}

impl HostFixture {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("parse host fixture")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read host fixture {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn into_host(self) -> MemoryHost {
        let host = MemoryHost::new(self.surface)
            .with_init(self.init)
            .with_transfer(self.transfer);
        host.set_selected_contact(self.selected_contact);
        host.set_tasks(
            self.tasks
                .into_iter()
                .enumerate()
                .map(|(i, t)| (t.key.unwrap_or_else(|| format!("task-{i}")), t.task))
                .collect(),
        );
        host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quicktransfer_engine::traits::Host;

    #[tokio::test]
    async fn fixture_builds_a_populated_host() {
        let raw = r#"{
            "surface": { "init": true, "task_map": true, "service_invoke": true },
            "transfer": { "kind": "reject", "message": "busy" },
            "tasks": [
                { "key": "a", "mediaType": "telephony", "interactionId": "X1" },
                { "mediaType": "chat", "interactionId": "C1" }
            ]
        }"#;
        let host = HostFixture::from_json(raw).unwrap().into_host();
        assert!(host.init_api().is_some());
        assert!(host.transfer_api().is_none());

        let tasks = host.task_map_api().unwrap().task_map().await.unwrap().unwrap();
        assert_eq!(tasks[0].0, "a");
        assert_eq!(tasks[1].0, "task-1");
        assert_eq!(tasks[0].1.interaction_id.as_deref(), Some("X1"));
    }

    #[test]
    fn empty_fixture_is_a_bare_host() {
        let fixture = HostFixture::from_json("{}").unwrap();
        assert_eq!(fixture.surface, HostSurface::default());
        assert_eq!(fixture.init, InitBehavior::Ready);
        assert!(fixture.tasks.is_empty());
    }

    #[test]
    fn unknown_behavior_is_rejected() {
        let err = HostFixture::from_json(r#"{"transfer": {"kind": "explode"}}"#).unwrap_err();
        assert!(err.to_string().contains("host fixture"));
    }
}
