//! Simulated audio objects for the loopback host.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashSet;
use uuid::Uuid;

use crate::audio::{AudioContext, AudioContextFactory, AudioNode, ContextState, MediaStream};
use crate::error::AudioError;

/// An audio node that records where it is connected.
#[derive(Debug)]
pub struct LoopbackNode {
    id: Uuid,
    label: String,
    connections: DashSet<Uuid>,
    disconnects: AtomicUsize,
}

impl LoopbackNode {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            connections: DashSet::new(),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn connections(&self) -> Vec<Uuid> {
        self.connections.iter().map(|id| *id).collect()
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::Relaxed)
    }
}

impl AudioNode for LoopbackNode {
    fn id(&self) -> Uuid {
        self.id
    }

    fn connect(&self, destination: &dyn AudioNode) {
        self.connections.insert(destination.id());
    }

    fn disconnect(&self) {
        self.connections.clear();
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }
}

const RUNNING: u8 = 0;
const SUSPENDED: u8 = 1;
const CLOSED: u8 = 2;

/// An audio context with a settable state and an optional failing close.
#[derive(Debug)]
pub struct LoopbackContext {
    id: Uuid,
    sample_rate: u32,
    state: AtomicU8,
    fail_close: bool,
    close_calls: AtomicUsize,
    sources: Mutex<Vec<Arc<LoopbackNode>>>,
}

impl LoopbackContext {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            sample_rate,
            state: AtomicU8::new(RUNNING),
            fail_close: false,
            close_calls: AtomicUsize::new(0),
            sources: Mutex::new(Vec::new()),
        }
    }

    /// A context whose `close()` always errors.
    pub fn failing_close(sample_rate: u32) -> Self {
        Self {
            fail_close: true,
            ..Self::new(sample_rate)
        }
    }

    pub fn set_state(&self, state: ContextState) {
        let raw = match state {
            ContextState::Running => RUNNING,
            ContextState::Suspended => SUSPENDED,
            ContextState::Closed => CLOSED,
        };
        self.state.store(raw, Ordering::Release);
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::Relaxed)
    }

    /// Source nodes created from media streams, oldest first.
    pub fn sources(&self) -> Vec<Arc<LoopbackNode>> {
        self.sources
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl AudioContext for LoopbackContext {
    fn id(&self) -> Uuid {
        self.id
    }

    fn state(&self) -> ContextState {
        match self.state.load(Ordering::Acquire) {
            RUNNING => ContextState::Running,
            SUSPENDED => ContextState::Suspended,
            _ => ContextState::Closed,
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn close(&self) -> Result<(), AudioError> {
        self.close_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_close {
            return Err(AudioError("close rejected by loopback context".to_string()));
        }
        self.set_state(ContextState::Closed);
        Ok(())
    }

    fn create_media_stream_source(&self, stream: MediaStream) -> Arc<dyn AudioNode> {
        let node = Arc::new(LoopbackNode::new(format!("source:{}", stream.label)));
        self.sources
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::clone(&node));
        node
    }
}

/// Factory that remembers every context it built.
#[derive(Debug, Default)]
pub struct LoopbackContextFactory {
    created: Mutex<Vec<Arc<LoopbackContext>>>,
}

impl LoopbackContextFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<Arc<LoopbackContext>> {
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl AudioContextFactory for LoopbackContextFactory {
    fn create(&self, sample_rate: u32) -> Arc<dyn AudioContext> {
        let ctx = Arc::new(LoopbackContext::new(sample_rate));
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::clone(&ctx));
        ctx
    }
}
