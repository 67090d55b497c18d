//! LoopbackHost - an in-process document host.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use spnproto::{channel_endpoint, ChannelEndpoint};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::HostError;
use crate::globals::{GlobalScope, Side};
use crate::host::{FrameSpec, Host, MountId, MountedFrame, RealmWindow};
use crate::loopback::worker::{LoopbackWorker, WorkerJournal};

/// How mounted frames behave while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadBehavior {
    /// Load cleanly.
    #[default]
    Normal,
    /// Report a load error but still expose a window.
    ErrorButUsable,
    /// Report a load error and never expose a window.
    NoWindow,
}

struct LoopbackFrame {
    spec: FrameSpec,
    endpoint: Option<ChannelEndpoint>,
    worker: Option<JoinHandle<()>>,
}

/// A [`Host`] whose frames run a [`LoopbackWorker`] on the tokio runtime.
pub struct LoopbackHost {
    document: bool,
    load: LoadBehavior,
    node_side: Side,
    frames: DashMap<MountId, LoopbackFrame>,
    mounts: AtomicUsize,
    journal: Arc<WorkerJournal>,
}

impl Default for LoopbackHost {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackHost {
    pub fn new() -> Self {
        Self {
            document: true,
            load: LoadBehavior::Normal,
            node_side: Side::Realm,
            frames: DashMap::new(),
            mounts: AtomicUsize::new(0),
            journal: Arc::new(WorkerJournal::default()),
        }
    }

    /// A host with no document; every mount is refused.
    pub fn headless() -> Self {
        Self {
            document: false,
            ..Self::new()
        }
    }

    pub fn with_load_behavior(mut self, load: LoadBehavior) -> Self {
        self.load = load;
        self
    }

    /// Where workers bind the session node.
    pub fn with_node_side(mut self, side: Side) -> Self {
        self.node_side = side;
        self
    }

    pub fn journal(&self) -> &Arc<WorkerJournal> {
        &self.journal
    }

    /// Frames mounted over the host's lifetime.
    pub fn mount_count(&self) -> usize {
        self.mounts.load(Ordering::Relaxed)
    }

    /// Frames currently attached.
    pub fn live_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_spec(&self, id: MountId) -> Option<FrameSpec> {
        self.frames.get(&id).map(|f| f.spec.clone())
    }
}

#[async_trait]
impl Host for LoopbackHost {
    fn is_document_capable(&self) -> bool {
        self.document
    }

    async fn mount(
        &self,
        spec: FrameSpec,
        scope: Arc<GlobalScope>,
    ) -> Result<MountedFrame, HostError> {
        if !self.document {
            return Err(HostError::NoDocument);
        }

        let id = MountId::new();
        let (loaded_tx, loaded) = oneshot::channel();

        let (endpoint, worker) = if self.load == LoadBehavior::NoWindow {
            (None, None)
        } else {
            let (endpoint, listener) = channel_endpoint();
            let worker = LoopbackWorker::new(
                listener,
                scope,
                Arc::clone(&self.journal),
                self.node_side,
            );
            (Some(endpoint), Some(tokio::spawn(worker.run())))
        };

        self.frames.insert(
            id,
            LoopbackFrame {
                spec,
                endpoint,
                worker,
            },
        );
        self.mounts.fetch_add(1, Ordering::Relaxed);
        debug!(mount = %id, "loopback frame mounted");

        let outcome = match self.load {
            LoadBehavior::Normal => Ok(()),
            LoadBehavior::ErrorButUsable | LoadBehavior::NoWindow => {
                Err("simulated frame load error".to_string())
            }
        };
        let _ = loaded_tx.send(outcome);

        Ok(MountedFrame { id, loaded })
    }

    fn content_window(&self, id: MountId) -> Option<RealmWindow> {
        let frame = self.frames.get(&id)?;
        let endpoint = frame.endpoint.clone()?;
        Some(RealmWindow {
            mount: id,
            endpoint: Arc::new(endpoint),
        })
    }

    fn unmount(&self, id: MountId) {
        if let Some((_, frame)) = self.frames.remove(&id) {
            if let Some(worker) = frame.worker {
                worker.abort();
            }
            debug!(mount = %id, "loopback frame removed");
        }
    }
}
