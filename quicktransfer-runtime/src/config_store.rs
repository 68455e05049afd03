use anyhow::Context;
use std::path::{Path, PathBuf};

use quicktransfer_core::buttons::{ButtonConfig, TransferButton, build_buttons};
use quicktransfer_core::config::{AppConfig, TimingConfig};
use quicktransfer_core::error::TransferError;

use crate::defaults::{default_app_config, default_timings};

/// Config as the widget takes it. A bad button list is carried, not raised,
/// so the widget can start and show it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub buttons: Result<Vec<ButtonConfig>, TransferError>,
    pub timings: TimingConfig,
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<AppConfig> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read config: {}", self.path.display()))?;
        let cfg: AppConfig = serde_json::from_slice(&bytes).context("decode config JSON")?;
        Ok(cfg)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(&self) -> anyhow::Result<AppConfig> {
        if !self.path.exists() {
            log::info!(
                "no config at {}, using defaults",
                self.path.display()
            );
            return Ok(default_app_config());
        }
        self.load()
    }

    /// Decodes each section on its own. Only an unreadable file is an error.
    pub fn load_widget_config(&self) -> anyhow::Result<WidgetConfig> {
        if !self.path.exists() {
            return Ok(WidgetConfig {
                buttons: Ok(vec![]),
                timings: default_timings(),
            });
        }
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read config: {}", self.path.display()))?;

        let doc = match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(doc) if doc.is_object() => doc,
            Ok(_) => return Ok(broken("config must be a JSON object".into())),
            Err(e) => return Ok(broken(format!("config is not valid JSON: {e}"))),
        };

        let buttons = match doc.get("buttons") {
            None | Some(serde_json::Value::Null) => Ok(vec![]),
            Some(raw) => serde_json::from_value::<Vec<ButtonConfig>>(raw.clone())
                .map_err(|e| TransferError::ConfigInvalid(e.to_string())),
        };

        let timings = match doc.get("timings") {
            None => default_timings(),
            Some(raw) => serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
                log::warn!("ignoring malformed timings in {}: {e}", self.path.display());
                default_timings()
            }),
        };

        Ok(WidgetConfig { buttons, timings })
    }

    /// Refuses to write a button list the widget would reject.
    pub fn save(&self, cfg: &AppConfig) -> anyhow::Result<()> {
        build_buttons(&cfg.buttons).context("validate buttons")?;
        let json = serde_json::to_vec_pretty(cfg).context("encode config JSON")?;
        crate::fs::write_atomic(&self.path, &json)
            .with_context(|| format!("save config: {}", self.path.display()))?;
        Ok(())
    }

    pub fn load_buttons(&self) -> anyhow::Result<Vec<TransferButton>> {
        let cfg = self.load_or_default()?;
        Ok(build_buttons(&cfg.buttons)?)
    }
}

fn broken(reason: String) -> WidgetConfig {
    WidgetConfig {
        buttons: Err(TransferError::ConfigInvalid(reason)),
        timings: default_timings(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quicktransfer_core::buttons::ButtonConfig;

    #[test]
    fn round_trips_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::at_path(path);

        let cfg = AppConfig {
            buttons: vec![
                ButtonConfig::new("Billing", "4155551212"),
                ButtonConfig::new("Tier 2", "5000"),
            ],
            timings: TimingConfig {
                poll_interval_ms: 500,
                ..TimingConfig::default()
            },
        };

        store.save(&cfg).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(store.load_buttons().unwrap()[1].label, "Tier 2");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at_path(dir.path().join("absent.json"));
        assert!(store.load().is_err());
        assert_eq!(store.load_or_default().unwrap(), default_app_config());
    }

    #[test]
    fn partial_timings_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"buttons":[{"label":"A","dest":"1"}],"timings":{"transfer_timeout_ms":2500}}"#,
        )
        .unwrap();

        let cfg = ConfigStore::at_path(path).load().unwrap();
        assert_eq!(cfg.timings.transfer_timeout_ms, 2_500);
        assert_eq!(cfg.timings.poll_interval_ms, 2_000);
    }

    #[test]
    fn widget_config_carries_a_bad_button_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"buttons":[{"label":"Billing"}],"timings":{"poll_interval_ms":750}}"#,
        )
        .unwrap();

        let cfg = ConfigStore::at_path(&path).load_widget_config().unwrap();
        assert!(matches!(cfg.buttons, Err(TransferError::ConfigInvalid(ref m)) if m.contains("dest")));
        assert_eq!(cfg.timings.poll_interval_ms, 750);
    }

    #[test]
    fn widget_config_survives_garbage_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let cfg = ConfigStore::at_path(&path).load_widget_config().unwrap();
        assert_eq!(cfg.buttons, Ok(vec![]));

        std::fs::write(&path, "not json").unwrap();
        let cfg = ConfigStore::at_path(&path).load_widget_config().unwrap();
        assert!(matches!(cfg.buttons, Err(TransferError::ConfigInvalid(_))));
        assert_eq!(cfg.timings, TimingConfig::default());

        std::fs::write(&path, r#"{"timings":{"poll_interval_ms":"fast"}}"#).unwrap();
        let cfg = ConfigStore::at_path(&path).load_widget_config().unwrap();
        assert_eq!(cfg.buttons, Ok(vec![]));
        assert_eq!(cfg.timings, TimingConfig::default());
    }

    #[test]
    fn refuses_to_save_blank_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::at_path(&path);
        let cfg = AppConfig {
            buttons: vec![ButtonConfig::new("Billing", "  ")],
            timings: TimingConfig::default(),
        };
        let err = store.save(&cfg).unwrap_err();
        assert!(format!("{err:#}").contains("invalid button configuration"));
        assert!(!path.exists());
    }
}
