use std::sync::Arc;
use std::time::Duration;

use quicktransfer_core::capabilities::{DetectionMode, HostCapabilities, TransferMode};

use crate::logger::WidgetLogger;
use crate::traits::Host;

const HOST_LOGGER_NAME: &str = "quick-transfers-widget";

/// Resolves which host surfaces are usable.
///
/// The host is injected once; `None` models a deployment where the widget
/// was placed somewhere without call control.
pub struct CapabilityProbe {
    host: Option<Arc<dyn Host>>,
    readiness_poll: Duration,
    logger: WidgetLogger,
}

impl CapabilityProbe {
    pub fn new(host: Option<Arc<dyn Host>>, logger: WidgetLogger) -> Self {
        Self {
            host,
            readiness_poll: Duration::from_millis(100),
            logger,
        }
    }

    pub fn with_readiness_poll(mut self, every: Duration) -> Self {
        self.readiness_poll = every.max(Duration::from_millis(1));
        self
    }

    pub fn host(&self) -> Option<&Arc<dyn Host>> {
        self.host.as_ref()
    }

    pub fn logger(&self) -> &WidgetLogger {
        &self.logger
    }

    /// Never fails: anything that goes wrong reports an absent host.
    pub async fn probe(&self, timeout: Duration) -> HostCapabilities {
        let Some(host) = self.host.as_deref() else {
            self.logger.warn("call-control host not found in this context");
            return HostCapabilities::unavailable();
        };

        match tokio::time::timeout(timeout, self.initialize(host)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.logger.error(&format!("host init failed: {e:#}"));
                return HostCapabilities::unavailable();
            }
            Err(_) => {
                self.logger.warn(&format!(
                    "host not ready after {}ms; treating as unavailable",
                    timeout.as_millis()
                ));
                return HostCapabilities::unavailable();
            }
        }

        self.register_host_logger(host);

        let caps = HostCapabilities::detected(detection_mode(host), transfer_mode(host));
        self.logger.info(&format!(
            "host probed: detection={:?} transfer={:?}",
            caps.detection_mode(),
            caps.transfer_mode()
        ));
        caps
    }

    async fn initialize(&self, host: &dyn Host) -> anyhow::Result<()> {
        // Hosts without an init hook are assumed ready.
        let Some(init) = host.init_api() else {
            return Ok(());
        };

        init.init().await?;
        while !init.is_ready() {
            tokio::time::sleep(self.readiness_poll).await;
        }
        Ok(())
    }

    fn register_host_logger(&self, host: &dyn Host) {
        let Some(logging) = host.logging_api() else {
            return;
        };
        match logging.create_logger(HOST_LOGGER_NAME) {
            Ok(l) => self.logger.attach(l),
            Err(e) => self
                .logger
                .debug(&format!("host logger unavailable, keeping default: {e:#}")),
        }
    }
}

// Event mode reads the selected contact on every event, so it needs both.
fn detection_mode(host: &dyn Host) -> DetectionMode {
    let selected = host.selected_contact_api().is_some();
    if host.event_api().is_some() && selected {
        DetectionMode::EventSubscription
    } else if selected {
        DetectionMode::SelectedContactPoll
    } else if host.task_map_api().is_some() {
        DetectionMode::TaskScanPoll
    } else {
        DetectionMode::Unavailable
    }
}

fn transfer_mode(host: &dyn Host) -> TransferMode {
    if host.transfer_api().is_some() {
        TransferMode::AgentContact
    } else if host.invoke_api().is_some() {
        TransferMode::ServiceInvoke
    } else {
        TransferMode::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeHost, InitBehavior, Surface};
    use std::sync::atomic::Ordering;

    fn probe_for(host: FakeHost) -> (Arc<FakeHost>, CapabilityProbe) {
        let host = Arc::new(host);
        let probe = CapabilityProbe::new(Some(host.clone()), WidgetLogger::new());
        (host, probe)
    }

    #[tokio::test]
    async fn absent_host_is_unavailable() {
        let probe = CapabilityProbe::new(None, WidgetLogger::new());
        assert_eq!(
            probe.probe(Duration::from_secs(5)).await,
            HostCapabilities::unavailable()
        );
    }

    #[tokio::test]
    async fn event_interface_wins_over_polling() {
        let (_, probe) = probe_for(FakeHost::new(Surface {
            events: true,
            selected: true,
            tasks: true,
            invoke: true,
            ..Default::default()
        }));
        let caps = probe.probe(Duration::from_secs(5)).await;
        assert!(caps.present());
        assert_eq!(caps.detection_mode(), DetectionMode::EventSubscription);
        assert_eq!(caps.transfer_mode(), TransferMode::ServiceInvoke);
    }

    #[tokio::test]
    async fn events_without_selected_contact_fall_back_to_task_scan() {
        let (_, probe) = probe_for(FakeHost::new(Surface {
            events: true,
            tasks: true,
            transfer: true,
            invoke: true,
            ..Default::default()
        }));
        let caps = probe.probe(Duration::from_secs(5)).await;
        assert_eq!(caps.detection_mode(), DetectionMode::TaskScanPoll);
        assert_eq!(caps.transfer_mode(), TransferMode::AgentContact);
    }

    #[tokio::test]
    async fn selected_contact_beats_task_scan() {
        let (_, probe) = probe_for(FakeHost::new(Surface {
            selected: true,
            tasks: true,
            ..Default::default()
        }));
        let caps = probe.probe(Duration::from_secs(5)).await;
        assert_eq!(caps.detection_mode(), DetectionMode::SelectedContactPoll);
        assert_eq!(caps.transfer_mode(), TransferMode::Unavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_init_times_out_as_unavailable() {
        let (_, probe) = probe_for(FakeHost::task_scan().with_init(InitBehavior::Hang));
        let started = tokio::time::Instant::now();
        let caps = probe.probe(Duration::from_millis(5_000)).await;
        assert_eq!(caps, HostCapabilities::unavailable());
        assert!(started.elapsed() >= Duration::from_millis(5_000));
    }

    #[tokio::test(start_paused = true)]
    async fn never_ready_host_times_out() {
        let (host, probe) = probe_for(FakeHost::task_scan());
        host.ready.store(false, Ordering::SeqCst);
        let caps = probe.probe(Duration::from_millis(500)).await;
        assert!(!caps.present());
    }

    #[tokio::test(start_paused = true)]
    async fn late_readiness_is_awaited() {
        let (host, probe) = probe_for(FakeHost::task_scan());
        host.ready.store(false, Ordering::SeqCst);

        let flip = host.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            flip.ready.store(true, Ordering::SeqCst);
        });

        let caps = probe.probe(Duration::from_millis(5_000)).await;
        assert_eq!(caps.detection_mode(), DetectionMode::TaskScanPoll);
    }

    #[tokio::test]
    async fn failing_init_is_unavailable() {
        let (_, probe) = probe_for(FakeHost::task_scan().with_init(InitBehavior::Fail));
        assert!(!probe.probe(Duration::from_secs(5)).await.present());
    }

    #[tokio::test]
    async fn registers_host_logger_when_offered() {
        let (host, probe) = probe_for(FakeHost::new(Surface {
            tasks: true,
            logging: true,
            ..Default::default()
        }));
        probe.probe(Duration::from_secs(5)).await;
        assert!(probe.logger().is_host_backed());
        assert!(
            host.logged
                .lock()
                .unwrap()
                .iter()
                .any(|l| l.contains("detection=TaskScanPoll"))
        );
    }
}
