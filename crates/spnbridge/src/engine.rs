//! External engine contract.
//!
//! Two separate concerns live here:
//! - [`PublicEvents`]: fire-and-forget notifications the bridge emits
//! - [`ReleaseSignals`]: one-shot waits for the engine to finish reacting
//!   to a lifecycle step
//!
//! [`EngineHandle`] bundles whatever the engine provides; every part is
//! optional and the controller skips what is missing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::audio::AudioNode;

/// Notifications emitted by the session controller.
///
/// Default methods do nothing so listeners implement only what they need.
pub trait PublicEvents: Send + Sync {
    fn performance_started(&self) {}

    fn performance_paused(&self) {}

    fn performance_resumed(&self) {}

    /// The realm created (or failed to expose) the session's audio node.
    fn audio_node_created(&self, _node: Option<Arc<dyn AudioNode>>) {}
}

/// Waits on the engine's lifecycle acknowledgements.
#[async_trait]
pub trait ReleaseSignals: Send + Sync {
    async fn start_released(&self);

    async fn pause_released(&self);

    async fn resume_released(&self);
}

/// Receives raw MIDI input bytes.
pub trait MidiInputHandler: Send + Sync {
    fn handle_midi_input(&self, message: &[u8]);
}

/// Everything the external engine exposes to the bridge.
#[derive(Clone, Default)]
pub struct EngineHandle {
    pub releases: Option<Arc<dyn ReleaseSignals>>,
    pub events: Option<Arc<dyn PublicEvents>>,
    pub midi: Option<Arc<dyn MidiInputHandler>>,
}

impl EngineHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_releases(mut self, releases: Arc<dyn ReleaseSignals>) -> Self {
        self.releases = Some(releases);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn PublicEvents>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_midi(mut self, midi: Arc<dyn MidiInputHandler>) -> Self {
        self.midi = Some(midi);
        self
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("releases", &self.releases.is_some())
            .field("events", &self.events.is_some())
            .field("midi", &self.midi.is_some())
            .finish()
    }
}

/// [`ReleaseSignals`] backed by [`Notify`].
///
/// A release that happens before anyone waits is remembered, so the
/// engine may acknowledge early.
#[derive(Debug, Default)]
pub struct ReleaseLatch {
    start: Notify,
    pause: Notify,
    resume: Notify,
}

impl ReleaseLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release_start(&self) {
        self.start.notify_one();
    }

    pub fn release_pause(&self) {
        self.pause.notify_one();
    }

    pub fn release_resume(&self) {
        self.resume.notify_one();
    }

    /// Release all three, for engines that acknowledge immediately.
    pub fn release_all(&self) {
        self.release_start();
        self.release_pause();
        self.release_resume();
    }
}

#[async_trait]
impl ReleaseSignals for ReleaseLatch {
    async fn start_released(&self) {
        self.start.notified().await;
    }

    async fn pause_released(&self) {
        self.pause.notified().await;
    }

    async fn resume_released(&self) {
        self.resume.notified().await;
    }
}
