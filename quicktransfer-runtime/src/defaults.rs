use quicktransfer_core::config::{AppConfig, TimingConfig};

/// No buttons until someone configures them; the widget says so.
pub fn default_app_config() -> AppConfig {
    AppConfig {
        buttons: vec![],
        timings: default_timings(),
    }
}

pub fn default_timings() -> TimingConfig {
    TimingConfig::default()
}
