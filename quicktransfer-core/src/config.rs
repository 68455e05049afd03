use crate::buttons::ButtonConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub buttons: Vec<ButtonConfig>,
    #[serde(default)]
    pub timings: TimingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub probe_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub transfer_timeout_ms: u64,

    // Consecutive failed host reads before the monitor re-probes.
    pub failure_threshold: u32,

    pub readiness_poll_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 5_000,
            poll_interval_ms: 2_000,
            transfer_timeout_ms: 10_000,
            failure_threshold: 3,
            readiness_poll_ms: 100,
        }
    }
}

impl TimingConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms.max(1))
    }

    // Zero would spin the poll loop.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    // Zero would fail every transfer before the host could answer.
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms.max(1))
    }

    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_ms.max(1))
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold.max(1)
    }
}
