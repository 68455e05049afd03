use std::sync::Arc;

use quicktransfer_core::buttons::{ButtonConfig, TransferButton, build_buttons, parse_button_list};
use quicktransfer_core::capabilities::HostCapabilities;
use quicktransfer_core::config::{AppConfig, TimingConfig};
use quicktransfer_core::error::TransferError;
use quicktransfer_core::interaction::InteractionState;
use quicktransfer_core::outcome::{TransferOutcome, TransferRequest};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

use crate::dispatcher::{DispatchRejected, TransferDispatcher};
use crate::logger::WidgetLogger;
use crate::monitor::{InteractionMonitor, MonitorConfig, SubscriptionToken};
use crate::probe::CapabilityProbe;
use crate::traits::Host;

pub const STATUS_STARTING: &str = "Starting…";
pub const STATUS_HOST_READY: &str = "SDK initialized";
pub const STATUS_HOST_MISSING: &str = "SDK not available in this context";
pub const STATUS_ACTIVE_CALL: &str = "Active call detected";
pub const STATUS_NO_CALL: &str = "No active call";
pub const STATUS_NO_BUTTONS: &str = "No buttons configured";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonView {
    pub label: String,
    pub destination: String,
    pub enabled: bool,
    pub busy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PressError {
    #[error("widget has not been started")]
    NotStarted,
    #[error("no button at index {0}")]
    UnknownButton(usize),
    #[error(transparent)]
    Rejected(#[from] DispatchRejected),
}

struct Running {
    monitor: InteractionMonitor,
    dispatcher: TransferDispatcher,
    subscription: SubscriptionToken,
}

/// Button-panel controller: probe, monitor and dispatcher behind one
/// status line.
pub struct QuickTransferWidget {
    host: Option<Arc<dyn Host>>,
    buttons: Vec<TransferButton>,
    config_error: Option<TransferError>,
    timings: TimingConfig,
    logger: WidgetLogger,
    status: Arc<watch::Sender<String>>,
    running: Option<Running>,
}

impl QuickTransferWidget {
    pub fn new(host: Option<Arc<dyn Host>>, config: &AppConfig) -> Self {
        Self::with_buttons(host, build_buttons(&config.buttons), config.timings.clone())
    }

    /// Builds from the raw `data-buttons` JSON.
    pub fn from_raw_buttons(host: Option<Arc<dyn Host>>, raw: &str, timings: TimingConfig) -> Self {
        Self::from_button_configs(host, parse_button_list(raw), timings)
    }

    /// Builds from an already decoded list; a decode error becomes the
    /// widget's configuration error.
    pub fn from_button_configs(
        host: Option<Arc<dyn Host>>,
        configs: Result<Vec<ButtonConfig>, TransferError>,
        timings: TimingConfig,
    ) -> Self {
        let built = configs.and_then(|configs| build_buttons(&configs));
        Self::with_buttons(host, built, timings)
    }

    fn with_buttons(
        host: Option<Arc<dyn Host>>,
        built: Result<Vec<TransferButton>, TransferError>,
        timings: TimingConfig,
    ) -> Self {
        let logger = WidgetLogger::new();
        let (buttons, config_error) = match built {
            Ok(buttons) => (buttons, None),
            Err(e) => {
                logger.error(&e.to_string());
                (vec![], Some(e))
            }
        };

        let initial = match &config_error {
            Some(TransferError::ConfigInvalid(reason)) => {
                format!("Invalid button configuration: {reason}")
            }
            Some(other) => other.to_string(),
            None if buttons.is_empty() => STATUS_NO_BUTTONS.to_string(),
            None => STATUS_STARTING.to_string(),
        };
        let (status, _) = watch::channel(initial);

        Self {
            host,
            buttons,
            config_error,
            timings,
            logger,
            status: Arc::new(status),
            running: None,
        }
    }

    /// Probes the host and starts monitoring. Calling it again is a no-op.
    pub async fn start(&mut self) -> HostCapabilities {
        if let Some(running) = &self.running {
            return running.monitor.capabilities();
        }

        let probe = Arc::new(
            CapabilityProbe::new(self.host.clone(), self.logger.clone())
                .with_readiness_poll(self.timings.readiness_poll()),
        );
        let caps = probe.probe(self.timings.probe_timeout()).await;
        self.set_status(if caps.present() {
            STATUS_HOST_READY
        } else {
            STATUS_HOST_MISSING
        });

        let monitor = InteractionMonitor::start(probe, caps, MonitorConfig::from(&self.timings));

        // A broken config keeps its message; call state would only hide it.
        let status = self.status.clone();
        let pinned = self.config_error.is_some();
        let subscription = monitor.subscribe(Arc::new(move |state: &InteractionState| {
            if !pinned {
                status.send_replace(snapshot_status(state).to_string());
            }
        }));

        let dispatcher = TransferDispatcher::new(
            self.host.clone(),
            &monitor,
            self.timings.transfer_timeout(),
            self.logger.clone(),
        );

        self.running = Some(Running {
            monitor,
            dispatcher,
            subscription,
        });
        caps
    }

    pub fn buttons(&self) -> Vec<ButtonView> {
        let (can_transfer, active) = self
            .running
            .as_ref()
            .map(|r| {
                (
                    r.monitor.capabilities().can_transfer(),
                    r.monitor.snapshot().has_active_voice_interaction(),
                )
            })
            .unwrap_or((false, false));

        self.buttons
            .iter()
            .map(|b| {
                let busy = self
                    .running
                    .as_ref()
                    .is_some_and(|r| r.dispatcher.is_in_flight(b.token));
                ButtonView {
                    label: b.label.clone(),
                    destination: b.destination.to_string(),
                    enabled: can_transfer && active && !busy,
                    busy,
                }
            })
            .collect()
    }

    pub fn button_index(&self, label: &str) -> Option<usize> {
        self.buttons
            .iter()
            .position(|b| b.label.eq_ignore_ascii_case(label.trim()))
    }

    /// Handles one click. The button stays busy until the host answers or
    /// the transfer times out, whatever the result.
    pub async fn press(&self, index: usize) -> Result<TransferOutcome, PressError> {
        let running = self.running.as_ref().ok_or(PressError::NotStarted)?;
        let button = self
            .buttons
            .get(index)
            .ok_or(PressError::UnknownButton(index))?;

        let guard = running.dispatcher.begin(button.token)?;
        let request = TransferRequest::new(button.destination.clone(), button.token);
        let outcome = running.dispatcher.dispatch_guarded(&guard, &request).await;
        drop(guard);

        self.set_status(&outcome.status_message(&button.destination, running.dispatcher.timeout()));

        // Call state has most likely moved; don't wait for the next tick.
        running.monitor.refresh();
        Ok(outcome)
    }

    pub fn status(&self) -> String {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<String> {
        self.status.subscribe()
    }

    pub fn snapshot(&self) -> Option<InteractionState> {
        self.running.as_ref().map(|r| r.monitor.snapshot())
    }

    pub fn watch_snapshot(&self) -> Option<watch::Receiver<InteractionState>> {
        self.running.as_ref().map(|r| r.monitor.watch_snapshot())
    }

    pub fn capabilities(&self) -> Option<HostCapabilities> {
        self.running.as_ref().map(|r| r.monitor.capabilities())
    }

    pub fn timings(&self) -> &TimingConfig {
        &self.timings
    }

    pub fn config_error(&self) -> Option<&TransferError> {
        self.config_error.as_ref()
    }

    pub fn logger(&self) -> &WidgetLogger {
        &self.logger
    }

    pub fn refresh(&self) {
        if let Some(r) = &self.running {
            r.monitor.refresh();
        }
    }

    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.monitor.unsubscribe(running.subscription);
            running.monitor.shutdown().await;
        }
    }

    fn set_status(&self, message: &str) {
        if self.config_error.is_none() {
            self.status.send_replace(message.to_string());
        }
    }
}

fn snapshot_status(state: &InteractionState) -> &'static str {
    if state.has_active_voice_interaction() {
        STATUS_ACTIVE_CALL
    } else {
        STATUS_NO_CALL
    }
}
