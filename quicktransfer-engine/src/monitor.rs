use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use quicktransfer_core::capabilities::{DetectionMode, HostCapabilities};
use quicktransfer_core::config::TimingConfig;
use quicktransfer_core::error::TransferError;
use quicktransfer_core::interaction::InteractionState;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::logger::WidgetLogger;
use crate::probe::CapabilityProbe;
use crate::traits::{ContactEvent, ContactListener, Host, ListenerId};

pub type SnapshotCallback = Arc<dyn Fn(&InteractionState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    /// Bound on a single host read, and on a re-probe.
    pub query_timeout: Duration,
    pub failure_threshold: u32,
}

impl From<&TimingConfig> for MonitorConfig {
    fn from(t: &TimingConfig) -> Self {
        Self {
            poll_interval: t.poll_interval(),
            query_timeout: t.probe_timeout(),
            failure_threshold: t.failure_threshold(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::from(&TimingConfig::default())
    }
}

struct Shared {
    host: Option<Arc<dyn Host>>,
    state_tx: watch::Sender<InteractionState>,
    caps_tx: watch::Sender<HostCapabilities>,
    subscribers: Mutex<HashMap<u64, SnapshotCallback>>,
    next_token: AtomicU64,
    listeners: Mutex<Vec<(ContactEvent, ListenerId)>>,
    refresh: Notify,
    logger: WidgetLogger,
    // Set by the first completed host read.
    has_read: AtomicBool,
}

impl Shared {
    /// Subscribers hear the first completed read, then only changes.
    fn publish(&self, state: InteractionState) {
        let first = !self.has_read.swap(true, Ordering::SeqCst);
        let previous = self.state_tx.send_replace(state.clone());
        if !first && previous.same_interaction(&state) {
            return;
        }

        // Call out without holding the lock; callbacks may subscribe.
        let callbacks: Vec<SnapshotCallback> = self
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for cb in callbacks {
            cb(&state);
        }
    }

    /// Inactive without a host read behind it. Only tells subscribers if
    /// they had already seen a real read.
    fn clear(&self) {
        let state = InteractionState::inactive(Utc::now());
        if self.has_read.load(Ordering::SeqCst) {
            self.publish(state);
        } else {
            self.state_tx.send_replace(state);
        }
    }

    fn unregister_listeners(&self) {
        let registered: Vec<(ContactEvent, ListenerId)> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        if registered.is_empty() {
            return;
        }
        if let Some(events) = self.host.as_deref().and_then(|h| h.event_api()) {
            for (event, id) in registered {
                events.remove_event_listener(event, id);
            }
        }
    }
}

/// Keeps an [`InteractionState`] current using whichever detection mode the
/// probe picked.
///
/// Owns one background task. Dropping the monitor stops it.
pub struct InteractionMonitor {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl InteractionMonitor {
    /// Must be called from within a tokio runtime.
    pub fn start(
        probe: Arc<CapabilityProbe>,
        capabilities: HostCapabilities,
        config: MonitorConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(InteractionState::inactive(Utc::now()));
        let (caps_tx, _) = watch::channel(capabilities);
        let shared = Arc::new(Shared {
            host: probe.host().cloned(),
            state_tx,
            caps_tx,
            subscribers: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            listeners: Mutex::new(vec![]),
            refresh: Notify::new(),
            logger: probe.logger().clone(),
            has_read: AtomicBool::new(false),
        });
        let cancel = CancellationToken::new();

        let worker = Worker {
            probe,
            shared: shared.clone(),
            config,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run(capabilities));

        Self {
            shared,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn subscribe(&self, callback: SnapshotCallback) -> SubscriptionToken {
        let id = self.shared.next_token.fetch_add(1, Ordering::Relaxed);
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, callback);
        SubscriptionToken(id)
    }

    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&token.0)
            .is_some()
    }

    /// Current snapshot. Re-fetch after any await; it may be stale by then.
    pub fn snapshot(&self) -> InteractionState {
        self.shared.state_tx.borrow().clone()
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<InteractionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn capabilities(&self) -> HostCapabilities {
        *self.shared.caps_tx.borrow()
    }

    pub fn watch_capabilities(&self) -> watch::Receiver<HostCapabilities> {
        self.shared.caps_tx.subscribe()
    }

    /// Asks for an out-of-band read. Coalesces with a pending request and
    /// never overlaps a read already running.
    pub fn refresh(&self) {
        self.shared.refresh.notify_one();
    }

    /// Cancels timers and removes host listeners. A host read already in
    /// flight may finish, but its result is dropped.
    pub fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.shared.unregister_listeners();
        self.shared.logger.debug("interaction monitor stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops and waits for the worker to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let task = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl Drop for InteractionMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

enum Exit {
    Stopped,
    Reprobe,
}

#[derive(Clone, Copy)]
enum Source {
    SelectedContact,
    TaskMap,
}

struct Worker {
    probe: Arc<CapabilityProbe>,
    shared: Arc<Shared>,
    config: MonitorConfig,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self, mut caps: HostCapabilities) {
        loop {
            let host = self.shared.host.clone();
            let exit = match (caps.detection_mode(), host) {
                (DetectionMode::EventSubscription, Some(host)) => self.run_events(&host).await,
                (DetectionMode::SelectedContactPoll, Some(host)) => {
                    self.run_polling(&host, Source::SelectedContact).await
                }
                (DetectionMode::TaskScanPoll, Some(host)) => {
                    self.run_polling(&host, Source::TaskMap).await
                }
                _ => {
                    self.shared.clear();
                    self.cancel.cancelled().await;
                    Exit::Stopped
                }
            };

            self.shared.unregister_listeners();
            match exit {
                Exit::Stopped => break,
                Exit::Reprobe => {
                    self.shared
                        .logger
                        .warn("repeated host read failures; re-probing host");
                    let reprobed = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => None,
                        c = self.probe.probe(self.config.query_timeout) => Some(c),
                    };
                    let Some(next) = reprobed else { break };
                    caps = next;
                    self.shared.caps_tx.send_replace(caps);
                }
            }
        }
    }

    async fn run_polling(&self, host: &Arc<dyn Host>, source: Source) -> Exit {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0u32;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Exit::Stopped,
                _ = ticker.tick() => {}
                _ = self.shared.refresh.notified() => {}
            }

            if self.read_once(host.as_ref(), source, &mut failures).await {
                return Exit::Reprobe;
            }
        }
    }

    async fn run_events(&self, host: &Arc<dyn Host>) -> Exit {
        let Some(events) = host.event_api() else {
            return Exit::Reprobe;
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<ContactEvent>();
        for event in ContactEvent::ALL {
            let tx = tx.clone();
            let listener: ContactListener = Arc::new(move |ev| {
                let _ = tx.send(ev);
            });
            match events.add_event_listener(event, listener) {
                Ok(id) => self
                    .shared
                    .listeners
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push((event, id)),
                Err(e) => {
                    self.shared.logger.warn(&format!(
                        "failed to register {}: {e:#}",
                        event.host_name()
                    ));
                    return Exit::Reprobe;
                }
            }
        }
        drop(tx);

        // stop() may have raced the registration above.
        if self.cancel.is_cancelled() {
            return Exit::Stopped;
        }

        let mut failures = 0u32;
        loop {
            if self
                .read_once(host.as_ref(), Source::SelectedContact, &mut failures)
                .await
            {
                return Exit::Reprobe;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Exit::Stopped,
                ev = rx.recv() => match ev {
                    Some(ev) => self.shared.logger.debug(&format!("host event {}", ev.host_name())),
                    None => return Exit::Reprobe,
                },
                _ = self.shared.refresh.notified() => {}
            }
        }
    }

    /// Returns `true` once failures reach the re-probe threshold.
    async fn read_once(&self, host: &dyn Host, source: Source, failures: &mut u32) -> bool {
        let result = match tokio::time::timeout(self.config.query_timeout, read(host, source)).await
        {
            Ok(r) => r,
            Err(_) => Err(TransferError::HostQueryFailed(format!(
                "no answer within {}ms",
                self.config.query_timeout.as_millis()
            ))),
        };

        if self.cancel.is_cancelled() {
            return false;
        }

        match result {
            Ok(state) => {
                *failures = 0;
                self.shared.publish(state);
                false
            }
            Err(e) => {
                // Keep the last snapshot; one bad read should not flip buttons.
                *failures += 1;
                self.shared.logger.warn(&format!(
                    "{e} ({}/{})",
                    failures, self.config.failure_threshold
                ));
                *failures >= self.config.failure_threshold
            }
        }
    }
}

async fn read(host: &dyn Host, source: Source) -> Result<InteractionState, TransferError> {
    let failed = |e: anyhow::Error| TransferError::HostQueryFailed(format!("{e:#}"));
    match source {
        Source::SelectedContact => {
            let api = host.selected_contact_api().ok_or_else(|| {
                TransferError::HostQueryFailed("selected contact accessor disappeared".into())
            })?;
            let contact = api.selected_contact().await.map_err(failed)?;
            Ok(InteractionState::from_entries(contact.iter(), Utc::now()))
        }
        Source::TaskMap => {
            let api = host.task_map_api().ok_or_else(|| {
                TransferError::HostQueryFailed("task map accessor disappeared".into())
            })?;
            let tasks = api.task_map().await.map_err(failed)?.unwrap_or_default();
            Ok(InteractionState::from_entries(
                tasks.iter().map(|(_, t)| t),
                Utc::now(),
            ))
        }
    }
}
