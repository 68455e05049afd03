use std::sync::{Arc, RwLock};

use crate::traits::HostLogger;

pub const LOG_TARGET: &str = "quick_transfers";

/// Logger shared by the probe, monitor and dispatcher.
///
/// Starts out on the `log` facade; once the probe registers a host logger,
/// every clone forwards there instead.
#[derive(Clone, Default)]
pub struct WidgetLogger {
    host: Arc<RwLock<Option<Arc<dyn HostLogger>>>>,
}

impl WidgetLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, logger: Arc<dyn HostLogger>) {
        let mut slot = self.host.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(logger);
    }

    pub fn detach(&self) {
        let mut slot = self.host.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    pub fn is_host_backed(&self) -> bool {
        self.host
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    pub fn log(&self, level: log::Level, message: &str) {
        let host = self
            .host
            .read()
            .ok()
            .and_then(|slot| slot.as_ref().map(Arc::clone));
        match host {
            Some(h) => h.log(level, message),
            None => log::log!(target: LOG_TARGET, level, "{message}"),
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(log::Level::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(log::Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(log::Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(log::Level::Error, message);
    }
}

impl std::fmt::Debug for WidgetLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetLogger")
            .field("host_backed", &self.is_host_backed())
            .finish()
    }
}
