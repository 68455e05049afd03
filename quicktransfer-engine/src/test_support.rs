use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use quicktransfer_core::interaction::TaskRecord;
use tokio::sync::Notify;

use crate::traits::{
    BlindTransferRequest, ContactEvent, ContactEvents, ContactListener, ContactTransfer, Host,
    HostInit, HostLogger, HostLogging, ListenerId, SelectedContactSource, ServiceInvoker,
    TaskMapSource,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Surface {
    pub init: bool,
    pub events: bool,
    pub selected: bool,
    pub tasks: bool,
    pub transfer: bool,
    pub invoke: bool,
    pub logging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitBehavior {
    Ok,
    Fail,
    Hang,
}

#[derive(Clone)]
pub enum TransferBehavior {
    Accept,
    Reject(String),
    RejectWithContext(String),
    Hang,
    WaitFor(Arc<Notify>),
}

pub struct FakeHost {
    pub surface: Surface,
    pub init_behavior: InitBehavior,
    pub ready: AtomicBool,
    pub selected: Mutex<Option<TaskRecord>>,
    pub tasks: Mutex<Vec<(String, TaskRecord)>>,
    pub fail_reads: AtomicU32,
    pub reads: AtomicU32,
    pub listeners: Mutex<HashMap<u64, (ContactEvent, ContactListener)>>,
    next_listener: AtomicU64,
    pub transfer_behavior: Mutex<TransferBehavior>,
    pub transfers: Mutex<Vec<serde_json::Value>>,
    pub read_gate: Mutex<Option<Arc<Notify>>>,
    pub logged: Arc<Mutex<Vec<String>>>,
}

impl FakeHost {
    pub fn new(surface: Surface) -> Self {
        Self {
            surface,
            init_behavior: InitBehavior::Ok,
            ready: AtomicBool::new(true),
            selected: Mutex::new(None),
            tasks: Mutex::new(vec![]),
            fail_reads: AtomicU32::new(0),
            reads: AtomicU32::new(0),
            listeners: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
            transfer_behavior: Mutex::new(TransferBehavior::Accept),
            transfers: Mutex::new(vec![]),
            read_gate: Mutex::new(None),
            logged: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn task_scan() -> Self {
        Self::new(Surface {
            init: true,
            tasks: true,
            transfer: true,
            ..Default::default()
        })
    }

    pub fn with_init(mut self, behavior: InitBehavior) -> Self {
        self.init_behavior = behavior;
        self
    }

    pub fn set_tasks(&self, tasks: Vec<TaskRecord>) {
        *self.tasks.lock().unwrap() = tasks
            .into_iter()
            .enumerate()
            .map(|(i, t)| (format!("task-{i}"), t))
            .collect();
    }

    pub fn set_selected(&self, contact: Option<TaskRecord>) {
        *self.selected.lock().unwrap() = contact;
    }

    pub fn set_transfer(&self, behavior: TransferBehavior) {
        *self.transfer_behavior.lock().unwrap() = behavior;
    }

    pub fn fail_next_reads(&self, n: u32) {
        self.fail_reads.store(n, Ordering::SeqCst);
    }

    /// Holds every read until the gate is notified.
    pub fn gate_reads(&self, gate: Option<Arc<Notify>>) {
        *self.read_gate.lock().unwrap() = gate;
    }

    pub fn read_count(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.lock().unwrap().len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn emit(&self, event: ContactEvent) {
        let listeners: Vec<ContactListener> = self
            .listeners
            .lock()
            .unwrap()
            .values()
            .filter(|(e, _)| *e == event)
            .map(|(_, l)| l.clone())
            .collect();
        for l in listeners {
            l(event);
        }
    }

    async fn wait_read_gate(&self) {
        let gate = self.read_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn read(&self) -> anyhow::Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let pending = self.fail_reads.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_reads.store(pending - 1, Ordering::SeqCst);
            anyhow::bail!("host read failed");
        }
        Ok(())
    }

    async fn run_transfer(&self, payload: serde_json::Value) -> anyhow::Result<()> {
        self.transfers.lock().unwrap().push(payload);
        let behavior = self.transfer_behavior.lock().unwrap().clone();
        match behavior {
            TransferBehavior::Accept => Ok(()),
            TransferBehavior::Reject(msg) => Err(anyhow::anyhow!(msg)),
            TransferBehavior::RejectWithContext(msg) => {
                Err(anyhow::anyhow!(msg).context("desktop transfer call failed"))
            }
            TransferBehavior::Hang => std::future::pending().await,
            TransferBehavior::WaitFor(gate) => {
                gate.notified().await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl HostInit for FakeHost {
    async fn init(&self) -> anyhow::Result<()> {
        match self.init_behavior {
            InitBehavior::Ok => Ok(()),
            InitBehavior::Fail => anyhow::bail!("init exploded"),
            InitBehavior::Hang => std::future::pending().await,
        }
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

impl ContactEvents for FakeHost {
    fn add_event_listener(
        &self,
        event: ContactEvent,
        listener: ContactListener,
    ) -> anyhow::Result<ListenerId> {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().insert(id, (event, listener));
        Ok(ListenerId(id))
    }

    fn remove_event_listener(&self, _event: ContactEvent, id: ListenerId) {
        self.listeners.lock().unwrap().remove(&id.0);
    }
}

#[async_trait]
impl SelectedContactSource for FakeHost {
    async fn selected_contact(&self) -> anyhow::Result<Option<TaskRecord>> {
        self.wait_read_gate().await;
        self.read()?;
        Ok(self.selected.lock().unwrap().clone())
    }
}

#[async_trait]
impl TaskMapSource for FakeHost {
    async fn task_map(&self) -> anyhow::Result<Option<Vec<(String, TaskRecord)>>> {
        self.wait_read_gate().await;
        self.read()?;
        Ok(Some(self.tasks.lock().unwrap().clone()))
    }
}

#[async_trait]
impl ContactTransfer for FakeHost {
    async fn blind_transfer(&self, request: &BlindTransferRequest) -> anyhow::Result<()> {
        self.run_transfer(serde_json::to_value(request)?).await
    }
}

#[async_trait]
impl ServiceInvoker for FakeHost {
    async fn invoke(
        &self,
        method: &str,
        payload: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        self.run_transfer(serde_json::json!({"method": method, "payload": payload}))
            .await?;
        Ok(serde_json::Value::Null)
    }
}

struct FakeLogger(Arc<Mutex<Vec<String>>>);

impl HostLogger for FakeLogger {
    fn log(&self, level: log::Level, message: &str) {
        self.0.lock().unwrap().push(format!("{level}: {message}"));
    }
}

impl HostLogging for FakeHost {
    fn create_logger(&self, _name: &str) -> anyhow::Result<Arc<dyn HostLogger>> {
        Ok(Arc::new(FakeLogger(self.logged.clone())))
    }
}

impl Host for FakeHost {
    fn init_api(&self) -> Option<&dyn HostInit> {
        self.surface.init.then_some(self as &dyn HostInit)
    }

    fn event_api(&self) -> Option<&dyn ContactEvents> {
        self.surface.events.then_some(self as &dyn ContactEvents)
    }

    fn selected_contact_api(&self) -> Option<&dyn SelectedContactSource> {
        self.surface.selected.then_some(self as &dyn SelectedContactSource)
    }

    fn task_map_api(&self) -> Option<&dyn TaskMapSource> {
        self.surface.tasks.then_some(self as &dyn TaskMapSource)
    }

    fn transfer_api(&self) -> Option<&dyn ContactTransfer> {
        self.surface.transfer.then_some(self as &dyn ContactTransfer)
    }

    fn invoke_api(&self) -> Option<&dyn ServiceInvoker> {
        self.surface.invoke.then_some(self as &dyn ServiceInvoker)
    }

    fn logging_api(&self) -> Option<&dyn HostLogging> {
        self.surface.logging.then_some(self as &dyn HostLogging)
    }
}
