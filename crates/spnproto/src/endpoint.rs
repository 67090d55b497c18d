//! Message endpoints - the native channel a realm exposes.
//!
//! [`MessageEndpoint`] is the sending seam the proxy wraps. The in-process
//! implementation pairs a [`ChannelEndpoint`] with an [`EndpointListener`];
//! realm implementations drain the listener and answer each
//! [`IncomingCall`] through its one-shot responder.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::{MessagePort, PortRef, ProxyError, RemoteCall, RemoteReply};

/// Native message channel into a realm.
#[async_trait]
pub trait MessageEndpoint: Send + Sync {
    /// Post a call, moving `transfer` to the receiving side, and wait for
    /// the reply.
    async fn post(
        &self,
        call: RemoteCall,
        transfer: Vec<MessagePort>,
    ) -> Result<RemoteReply, ProxyError>;
}

/// A call as seen by the receiving realm.
#[derive(Debug)]
pub struct IncomingCall {
    call: RemoteCall,
    ports: Vec<Option<MessagePort>>,
    reply: oneshot::Sender<RemoteReply>,
}

impl IncomingCall {
    pub fn id(&self) -> u64 {
        self.call.id
    }

    pub fn method(&self) -> &str {
        &self.call.method
    }

    pub fn raw_payload(&self) -> &Value {
        &self.call.payload
    }

    /// Decode the payload into a concrete type.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, ProxyError> {
        serde_json::from_value(self.call.payload.clone()).map_err(ProxyError::Decode)
    }

    /// Number of ports moved with this call.
    pub fn transfer_len(&self) -> usize {
        self.ports.len()
    }

    /// Take ownership of a transferred port. Each port can be taken once.
    pub fn take_port(&mut self, port: PortRef) -> Option<MessagePort> {
        self.ports.get_mut(port.transfer).and_then(Option::take)
    }

    /// Answer the call successfully.
    pub fn respond(self, value: Value) {
        let id = self.call.id;
        if self.reply.send(RemoteReply::ok(id, value)).is_err() {
            debug!(id, "caller went away before reply");
        }
    }

    /// Answer the call with an error.
    pub fn reject(self, message: impl Into<String>) {
        let id = self.call.id;
        if self.reply.send(RemoteReply::error(id, message)).is_err() {
            debug!(id, "caller went away before rejection");
        }
    }
}

/// Sending half of an in-process realm channel.
#[derive(Debug, Clone)]
pub struct ChannelEndpoint {
    tx: mpsc::UnboundedSender<IncomingCall>,
}

/// Receiving half of an in-process realm channel.
#[derive(Debug)]
pub struct EndpointListener {
    rx: mpsc::UnboundedReceiver<IncomingCall>,
}

/// Create a connected endpoint/listener pair.
pub fn channel_endpoint() -> (ChannelEndpoint, EndpointListener) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelEndpoint { tx }, EndpointListener { rx })
}

impl ChannelEndpoint {
    /// True once the listener has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl MessageEndpoint for ChannelEndpoint {
    async fn post(
        &self,
        call: RemoteCall,
        transfer: Vec<MessagePort>,
    ) -> Result<RemoteReply, ProxyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let method = call.method.clone();
        let incoming = IncomingCall {
            call,
            ports: transfer.into_iter().map(Some).collect(),
            reply: reply_tx,
        };

        if self.tx.send(incoming).is_err() {
            warn!(%method, "realm endpoint is closed");
            return Err(ProxyError::Disconnected);
        }

        reply_rx.await.map_err(|_| {
            warn!(%method, "realm dropped call without replying");
            ProxyError::Disconnected
        })
    }
}

impl EndpointListener {
    /// Next incoming call, or `None` when every endpoint is gone.
    pub async fn next(&mut self) -> Option<IncomingCall> {
        self.rx.recv().await
    }
}
