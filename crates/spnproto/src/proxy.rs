//! RemoteProxy - typed remote calls into a worker realm.
//!
//! Wraps a [`MessageEndpoint`] once; every call gets a fresh correlation id
//! and the reply must echo it. After [`RemoteProxy::release`] the proxy is
//! inert: calls fail fast instead of reaching a realm that may be gone.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    methods, CallOutcome, InitializePayload, MessageEndpoint, MessagePort, RemoteCall,
    SetPlayStatePayload, Transfer,
};

/// Errors from a remote call.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("proxy has been released")]
    Released,

    #[error("realm endpoint disconnected")]
    Disconnected,

    #[error("failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("reply id {got} does not match call id {expected}")]
    Correlation { expected: u64, got: u64 },

    #[error("payload references port {index} but only {available} were transferred")]
    DanglingPortRef { index: usize, available: usize },

    #[error("remote {method} failed: {message}")]
    Remote { method: String, message: String },
}

/// Typed proxy over a realm's message endpoint.
pub struct RemoteProxy {
    id: Uuid,
    endpoint: Arc<dyn MessageEndpoint>,
    next_call: AtomicU64,
    released: AtomicBool,
}

impl std::fmt::Debug for RemoteProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteProxy")
            .field("id", &self.id)
            .field("released", &self.is_released())
            .finish()
    }
}

impl RemoteProxy {
    /// Wrap an endpoint. Callers keep at most one live proxy per realm.
    pub fn wrap(endpoint: Arc<dyn MessageEndpoint>) -> Self {
        let id = Uuid::new_v4();
        debug!(%id, "wrapping realm endpoint");
        Self {
            id,
            endpoint,
            next_call: AtomicU64::new(0),
            released: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Dispose the proxy. Idempotent.
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            debug!(id = %self.id, "proxy released");
        }
    }

    /// Invoke `method` with `payload`, moving `transfer` to the realm.
    pub async fn call<P: Serialize>(
        &self,
        method: &str,
        payload: &P,
        transfer: Vec<MessagePort>,
    ) -> Result<Value, ProxyError> {
        if self.is_released() {
            return Err(ProxyError::Released);
        }

        let payload = serde_json::to_value(payload).map_err(ProxyError::Encode)?;
        let id = self.next_call.fetch_add(1, Ordering::Relaxed);
        let call = RemoteCall {
            id,
            method: method.to_string(),
            payload,
        };

        debug!(id, method, transfer = transfer.len(), "remote call");
        let reply = self.endpoint.post(call, transfer).await?;

        if reply.id != id {
            warn!(expected = id, got = reply.id, method, "uncorrelated reply");
            return Err(ProxyError::Correlation {
                expected: id,
                got: reply.id,
            });
        }

        match reply.outcome {
            CallOutcome::Ok { value } => Ok(value),
            CallOutcome::Error { message } => Err(ProxyError::Remote {
                method: method.to_string(),
                message,
            }),
        }
    }

    /// Remote `initialize`, handing the channel set to the realm.
    pub async fn initialize(
        &self,
        transfer: Transfer<InitializePayload>,
    ) -> Result<Value, ProxyError> {
        let (payload, ports) = transfer.into_parts();
        if let Some(dangling) = payload
            .port_refs()
            .into_iter()
            .find(|r| r.transfer >= ports.len())
        {
            return Err(ProxyError::DanglingPortRef {
                index: dangling.transfer,
                available: ports.len(),
            });
        }
        self.call(methods::INITIALIZE, &payload, ports).await
    }

    /// Remote `setPlayState`.
    pub async fn set_play_state(&self, payload: SetPlayStatePayload) -> Result<Value, ProxyError> {
        self.call(methods::SET_PLAY_STATE, &payload, Vec::new()).await
    }
}
