//! Linear message ports.
//!
//! A [`MessagePort`] is one end of a bidirectional channel. It is not
//! `Clone`: whoever holds the value is the only party that can talk on it,
//! and moving it into a [`crate::Transfer`] hands that right to the realm.

use bytes::Bytes;
use tokio::sync::mpsc;
use uuid::Uuid;

/// The other end of a port has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("message port is closed")]
pub struct PortClosed;

/// One end of a [`MessageChannel`].
#[derive(Debug)]
pub struct MessagePort {
    id: Uuid,
    tx: mpsc::UnboundedSender<Bytes>,
    rx: mpsc::UnboundedReceiver<Bytes>,
}

impl MessagePort {
    /// Channel-unique id, shared by both ends of the pair.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Post a message to the other end.
    pub fn post(&self, data: impl Into<Bytes>) -> Result<(), PortClosed> {
        self.tx.send(data.into()).map_err(|_| PortClosed)
    }

    /// Wait for the next message. `None` once the other end is gone.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Take a queued message without waiting.
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Factory for entangled port pairs.
pub struct MessageChannel;

impl MessageChannel {
    /// Create two ports wired to each other.
    pub fn pair() -> (MessagePort, MessagePort) {
        let id = Uuid::new_v4();
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            MessagePort { id, tx: a_tx, rx: a_rx },
            MessagePort { id, tx: b_tx, rx: b_rx },
        )
    }
}

/// The port bundle handed over by whoever set up the worker IPC.
///
/// Each slot is optional because the bundle is assembled elsewhere; the
/// controller refuses to send a partial set.
#[derive(Debug, Default)]
pub struct IpcMessagePorts {
    /// Control/message channel to the worker.
    pub worker_message_port: Option<MessagePort>,
    /// Live audio input frames.
    pub audio_input_port: Option<MessagePort>,
    /// Frame requests from the audio callback.
    pub frame_request_port: Option<MessagePort>,
}

impl IpcMessagePorts {
    pub fn new(
        worker_message_port: MessagePort,
        audio_input_port: MessagePort,
        frame_request_port: MessagePort,
    ) -> Self {
        Self {
            worker_message_port: Some(worker_message_port),
            audio_input_port: Some(audio_input_port),
            frame_request_port: Some(frame_request_port),
        }
    }

    /// Names of the slots that are empty.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.worker_message_port.is_none() {
            missing.push("messagePort");
        }
        if self.audio_input_port.is_none() {
            missing.push("audioInputPort");
        }
        if self.frame_request_port.is_none() {
            missing.push("requestPort");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}
