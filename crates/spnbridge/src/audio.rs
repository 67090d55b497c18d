//! Platform audio seam.
//!
//! The bridge never builds audio objects itself. It asks an
//! [`AudioContextFactory`] for contexts and talks to them through these
//! traits, so the same controller drives a browser host, a native
//! backend, or the loopback simulation.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AudioError;

/// Lifecycle of an audio context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
    Closed,
}

/// A captured media stream (microphone), opaque to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    pub id: Uuid,
    pub label: String,
}

impl MediaStream {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
        }
    }
}

/// A node in an audio graph.
pub trait AudioNode: Send + Sync {
    fn id(&self) -> Uuid;

    /// Route this node's output into `destination`.
    fn connect(&self, destination: &dyn AudioNode);

    /// Drop every outgoing connection.
    fn disconnect(&self);
}

/// An audio context owning a graph and a clock.
#[async_trait]
pub trait AudioContext: Send + Sync {
    fn id(&self) -> Uuid;

    fn state(&self) -> ContextState;

    /// Native rate the context actually runs at.
    fn sample_rate(&self) -> u32;

    async fn close(&self) -> Result<(), AudioError>;

    /// Wrap a media stream in a source node owned by this context.
    fn create_media_stream_source(&self, stream: MediaStream) -> Arc<dyn AudioNode>;
}

/// Builds audio contexts at a requested rate.
pub trait AudioContextFactory: Send + Sync {
    fn create(&self, sample_rate: u32) -> Arc<dyn AudioContext>;
}
