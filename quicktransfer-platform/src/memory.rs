use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quicktransfer_core::interaction::TaskRecord;
use quicktransfer_engine::traits::{
    BlindTransferRequest, ContactEvent, ContactEvents, ContactListener, ContactTransfer, Host,
    HostInit, HostLogger, HostLogging, ListenerId, SelectedContactSource, ServiceInvoker,
    TaskMapSource,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Which host surfaces a deployment exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSurface {
    pub init: bool,
    pub events: bool,
    pub selected_contact: bool,
    pub task_map: bool,
    pub agent_contact_transfer: bool,
    pub service_invoke: bool,
    pub logging: bool,
}

impl HostSurface {
    /// Event-driven desktop with `blindTransfer` on the contact API.
    pub fn event_desktop() -> Self {
        Self {
            init: true,
            events: true,
            selected_contact: true,
            task_map: true,
            agent_contact_transfer: true,
            service_invoke: false,
            logging: true,
        }
    }

    /// Older desktop: task map only, contact-API transfer.
    pub fn task_scan_desktop() -> Self {
        Self {
            init: true,
            task_map: true,
            agent_contact_transfer: true,
            ..Default::default()
        }
    }

    /// Shell that only offers the generic invoke bridge.
    pub fn invoke_shell() -> Self {
        Self {
            selected_contact: true,
            service_invoke: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitBehavior {
    #[default]
    Ready,
    Fail {
        message: String,
    },
    Hang,
    /// `init` resolves at once but readiness lags by `ms`.
    ReadyAfter {
        ms: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferBehavior {
    #[default]
    Accept,
    Reject {
        message: String,
    },
    Hang,
    Delay {
        ms: u64,
    },
}

/// One transfer call as the host received it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferCall {
    pub method: String,
    pub payload: serde_json::Value,
}

struct MemoryHostLogger {
    name: String,
    lines: Arc<Mutex<Vec<String>>>,
}

impl HostLogger for MemoryHostLogger {
    fn log(&self, level: log::Level, message: &str) {
        log::log!(target: "host", level, "[{}] {message}", self.name);
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("{level} [{}] {message}", self.name));
    }
}

/// In-process call-control host.
///
/// Exposes whichever surfaces `HostSurface` enables, keeps contacts and
/// tasks in memory, and records every transfer call it receives.
pub struct MemoryHost {
    surface: HostSurface,
    init: InitBehavior,
    ready_at: Mutex<Option<Instant>>,
    selected: Mutex<Option<TaskRecord>>,
    tasks: Mutex<Vec<(String, TaskRecord)>>,
    listeners: Mutex<Vec<(ListenerId, ContactEvent, ContactListener)>>,
    next_listener: AtomicU64,
    transfer: Mutex<TransferBehavior>,
    calls: Mutex<Vec<TransferCall>>,
    failing_reads: AtomicU32,
    reads: AtomicU64,
    log_lines: Arc<Mutex<Vec<String>>>,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryHost {
    pub fn new(surface: HostSurface) -> Self {
        Self {
            surface,
            init: InitBehavior::Ready,
            ready_at: Mutex::new(None),
            selected: Mutex::new(None),
            tasks: Mutex::new(vec![]),
            listeners: Mutex::new(vec![]),
            next_listener: AtomicU64::new(1),
            transfer: Mutex::new(TransferBehavior::Accept),
            calls: Mutex::new(vec![]),
            failing_reads: AtomicU32::new(0),
            reads: AtomicU64::new(0),
            log_lines: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn with_init(mut self, init: InitBehavior) -> Self {
        self.init = init;
        self
    }

    pub fn with_transfer(self, behavior: TransferBehavior) -> Self {
        self.set_transfer_behavior(behavior);
        self
    }

    pub fn surface(&self) -> HostSurface {
        self.surface
    }

    pub fn set_transfer_behavior(&self, behavior: TransferBehavior) {
        *lock(&self.transfer) = behavior;
    }

    pub fn set_selected_contact(&self, contact: Option<TaskRecord>) {
        *lock(&self.selected) = contact;
    }

    pub fn set_tasks(&self, tasks: Vec<(String, TaskRecord)>) {
        *lock(&self.tasks) = tasks;
    }

    /// Replaces the task under `key`, or appends it.
    pub fn upsert_task(&self, key: impl Into<String>, task: TaskRecord) {
        let key = key.into();
        let mut tasks = lock(&self.tasks);
        match tasks.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = task,
            None => tasks.push((key, task)),
        }
    }

    /// Simulates an inbound call being answered.
    pub fn start_call(&self, interaction_id: &str) {
        let task = TaskRecord::new("telephony")
            .with_interaction_id(interaction_id)
            .with_state("connected");
        self.upsert_task(interaction_id, task.clone());
        self.set_selected_contact(Some(task));
        self.emit(ContactEvent::Started);
    }

    /// Moves the call to wrap-up, which no longer counts as transferable.
    pub fn wrap_up_call(&self, interaction_id: &str) {
        let task = TaskRecord::new("telephony")
            .with_interaction_id(interaction_id)
            .with_state("wrapup");
        self.upsert_task(interaction_id, task.clone());
        self.set_selected_contact(Some(task));
        self.emit(ContactEvent::Ended);
    }

    pub fn emit(&self, event: ContactEvent) {
        let listeners: Vec<ContactListener> = lock(&self.listeners)
            .iter()
            .filter(|(_, e, _)| *e == event)
            .map(|(_, _, l)| l.clone())
            .collect();
        for l in listeners {
            l(event);
        }
    }

    pub fn fail_next_reads(&self, n: u32) {
        self.failing_reads.store(n, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    pub fn transfer_calls(&self) -> Vec<TransferCall> {
        lock(&self.calls).clone()
    }

    pub fn log_lines(&self) -> Vec<String> {
        lock(&self.log_lines).clone()
    }

    fn record_read(&self) -> anyhow::Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            anyhow::bail!("desktop store not reachable");
        }
        Ok(())
    }

    async fn answer_transfer(&self, method: &str, payload: serde_json::Value) -> anyhow::Result<()> {
        lock(&self.calls).push(TransferCall {
            method: method.to_string(),
            payload,
        });
        let behavior = lock(&self.transfer).clone();
        match behavior {
            TransferBehavior::Accept => Ok(()),
            TransferBehavior::Reject { message } => Err(anyhow::anyhow!(message)),
            TransferBehavior::Hang => std::future::pending().await,
            TransferBehavior::Delay { ms } => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl HostInit for MemoryHost {
    async fn init(&self) -> anyhow::Result<()> {
        match &self.init {
            InitBehavior::Ready => Ok(()),
            InitBehavior::Fail { message } => Err(anyhow::anyhow!(message.clone())),
            InitBehavior::Hang => std::future::pending().await,
            InitBehavior::ReadyAfter { ms } => {
                *lock(&self.ready_at) = Some(Instant::now() + Duration::from_millis(*ms));
                Ok(())
            }
        }
    }

    fn is_ready(&self) -> bool {
        lock(&self.ready_at).is_none_or(|at| Instant::now() >= at)
    }
}

impl ContactEvents for MemoryHost {
    fn add_event_listener(
        &self,
        event: ContactEvent,
        listener: ContactListener,
    ) -> anyhow::Result<ListenerId> {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        lock(&self.listeners).push((id, event, listener));
        Ok(id)
    }

    fn remove_event_listener(&self, event: ContactEvent, id: ListenerId) {
        lock(&self.listeners).retain(|(i, e, _)| !(*i == id && *e == event));
    }
}

#[async_trait]
impl SelectedContactSource for MemoryHost {
    async fn selected_contact(&self) -> anyhow::Result<Option<TaskRecord>> {
        self.record_read()?;
        Ok(lock(&self.selected).clone())
    }
}

#[async_trait]
impl TaskMapSource for MemoryHost {
    async fn task_map(&self) -> anyhow::Result<Option<Vec<(String, TaskRecord)>>> {
        self.record_read()?;
        Ok(Some(lock(&self.tasks).clone()))
    }
}

#[async_trait]
impl ContactTransfer for MemoryHost {
    async fn blind_transfer(&self, request: &BlindTransferRequest) -> anyhow::Result<()> {
        self.answer_transfer("blindTransfer", serde_json::to_value(request)?)
            .await
    }
}

#[async_trait]
impl ServiceInvoker for MemoryHost {
    async fn invoke(
        &self,
        method: &str,
        payload: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        self.answer_transfer(method, payload).await?;
        Ok(serde_json::Value::Null)
    }
}

impl HostLogging for MemoryHost {
    fn create_logger(&self, name: &str) -> anyhow::Result<Arc<dyn HostLogger>> {
        Ok(Arc::new(MemoryHostLogger {
            name: name.to_string(),
            lines: self.log_lines.clone(),
        }))
    }
}

impl Host for MemoryHost {
    fn init_api(&self) -> Option<&dyn HostInit> {
        self.surface.init.then_some(self as &dyn HostInit)
    }

    fn event_api(&self) -> Option<&dyn ContactEvents> {
        self.surface.events.then_some(self as &dyn ContactEvents)
    }

    fn selected_contact_api(&self) -> Option<&dyn SelectedContactSource> {
        self.surface
            .selected_contact
            .then_some(self as &dyn SelectedContactSource)
    }

    fn task_map_api(&self) -> Option<&dyn TaskMapSource> {
        self.surface.task_map.then_some(self as &dyn TaskMapSource)
    }

    fn transfer_api(&self) -> Option<&dyn ContactTransfer> {
        self.surface
            .agent_contact_transfer
            .then_some(self as &dyn ContactTransfer)
    }

    fn invoke_api(&self) -> Option<&dyn ServiceInvoker> {
        self.surface
            .service_invoke
            .then_some(self as &dyn ServiceInvoker)
    }

    fn logging_api(&self) -> Option<&dyn HostLogging> {
        self.surface.logging.then_some(self as &dyn HostLogging)
    }
}
