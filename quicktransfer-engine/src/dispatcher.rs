use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use quicktransfer_core::capabilities::{HostCapabilities, TransferMode};
use quicktransfer_core::interaction::InteractionState;
use quicktransfer_core::outcome::{TransferOutcome, TransferRequest};
use quicktransfer_core::types::ButtonToken;
use thiserror::Error;
use tokio::sync::watch;

use crate::logger::WidgetLogger;
use crate::monitor::InteractionMonitor;
use crate::traits::{BlindTransferRequest, Host, INVOKE_BLIND_TRANSFER, InvokeTransferPayload};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchRejected {
    #[error("a transfer for this button is already in progress")]
    InFlight,
}

type InFlightSet = Arc<Mutex<HashSet<ButtonToken>>>;

/// Marks one button busy until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    set: InFlightSet,
    token: ButtonToken,
}

impl InFlightGuard {
    pub fn token(&self) -> ButtonToken {
        self.token
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.token);
    }
}

enum HostCall {
    Missing,
    NoInteraction,
    Rejected(anyhow::Error),
}

/// Executes blind transfers, at most one in flight per button.
pub struct TransferDispatcher {
    host: Option<Arc<dyn Host>>,
    capabilities: watch::Receiver<HostCapabilities>,
    snapshot: watch::Receiver<InteractionState>,
    in_flight: InFlightSet,
    timeout: Duration,
    logger: WidgetLogger,
}

impl TransferDispatcher {
    pub fn new(
        host: Option<Arc<dyn Host>>,
        monitor: &InteractionMonitor,
        timeout: Duration,
        logger: WidgetLogger,
    ) -> Self {
        Self::from_parts(
            host,
            monitor.watch_capabilities(),
            monitor.watch_snapshot(),
            timeout,
            logger,
        )
    }

    pub fn from_parts(
        host: Option<Arc<dyn Host>>,
        capabilities: watch::Receiver<HostCapabilities>,
        snapshot: watch::Receiver<InteractionState>,
        timeout: Duration,
        logger: WidgetLogger,
    ) -> Self {
        Self {
            host,
            capabilities,
            snapshot,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            timeout,
            logger,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Claims the button. Fails synchronously if it is already busy.
    pub fn begin(&self, token: ButtonToken) -> Result<InFlightGuard, DispatchRejected> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(token) {
            return Err(DispatchRejected::InFlight);
        }
        Ok(InFlightGuard {
            set: self.in_flight.clone(),
            token,
        })
    }

    pub fn is_in_flight(&self, token: ButtonToken) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&token)
    }

    /// Claims the button for the duration of the call, then runs it.
    pub async fn dispatch(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferOutcome, DispatchRejected> {
        let _guard = self.begin(request.button)?;
        Ok(self.execute(request).await)
    }

    /// Runs a transfer for a caller that already holds the button's guard.
    pub async fn dispatch_guarded(
        &self,
        guard: &InFlightGuard,
        request: &TransferRequest,
    ) -> TransferOutcome {
        debug_assert_eq!(guard.token(), request.button);
        self.execute(request).await
    }

    async fn execute(&self, request: &TransferRequest) -> TransferOutcome {
        let mode = self.capabilities.borrow().transfer_mode();
        let host = match (mode, self.host.as_deref()) {
            (TransferMode::Unavailable, _) | (_, None) => {
                self.logger
                    .warn("transfer requested but the host has no transfer method");
                return TransferOutcome::FailedNoHost;
            }
            (_, Some(host)) => host,
        };

        // Take a copy; the snapshot may be replaced while we await the host.
        let state = self.snapshot.borrow().clone();
        if !state.has_active_voice_interaction() {
            self.logger.warn("transfer requested with no active voice interaction");
            return TransferOutcome::FailedNoActiveInteraction;
        }
        let interaction_id = state.interaction_id().map(|id| id.as_str().to_string());

        let destination = request.destination.as_str();
        self.logger
            .info(&format!("attempting blind transfer to {destination}"));

        let call = call_host(host, mode, interaction_id.as_deref(), destination);
        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Err(_) => TransferOutcome::FailedTimeout,
            Ok(Ok(())) => TransferOutcome::Succeeded,
            Ok(Err(HostCall::Missing)) => TransferOutcome::FailedNoHost,
            Ok(Err(HostCall::NoInteraction)) => TransferOutcome::FailedNoActiveInteraction,
            Ok(Err(HostCall::Rejected(e))) => {
                // Hosts may wrap their reason in context; the reason is the root.
                TransferOutcome::FailedHostRejected(e.root_cause().to_string())
            }
        };

        match &outcome {
            TransferOutcome::Succeeded => self
                .logger
                .info(&format!("blind transfer triggered to {destination}")),
            other => self.logger.error(&format!(
                "blind transfer to {destination} failed: {}",
                other.label()
            )),
        }
        outcome
    }
}

async fn call_host(
    host: &dyn Host,
    mode: TransferMode,
    interaction_id: Option<&str>,
    destination: &str,
) -> Result<(), HostCall> {
    match mode {
        TransferMode::AgentContact => {
            let api = host.transfer_api().ok_or(HostCall::Missing)?;
            let id = interaction_id.ok_or(HostCall::NoInteraction)?;
            let req = BlindTransferRequest::voice_to_dn(id, destination);
            api.blind_transfer(&req).await.map_err(HostCall::Rejected)
        }
        TransferMode::ServiceInvoke => {
            let api = host.invoke_api().ok_or(HostCall::Missing)?;
            let payload = serde_json::to_value(InvokeTransferPayload::voice_to_dn(
                interaction_id,
                destination,
            ))
            .map_err(|e| HostCall::Rejected(e.into()))?;
            api.invoke(INVOKE_BLIND_TRANSFER, payload)
                .await
                .map(|_| ())
                .map_err(HostCall::Rejected)
        }
        TransferMode::Unavailable => Err(HostCall::Missing),
    }
}
