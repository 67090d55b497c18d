//! Host seam - the document-capable environment a realm is mounted into.

use std::sync::Arc;

use async_trait::async_trait;
use spnconf::RealmConfig;
use spnproto::MessageEndpoint;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::HostError;
use crate::globals::GlobalScope;

/// Identity of a mounted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountId(pub Uuid);

impl MountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything needed to mount a realm: its document, sandbox and style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSpec {
    pub html: String,
    pub sandbox: Vec<String>,
    pub style: String,
}

impl FrameSpec {
    /// Synthesize the minimal hosting document around the worker bootstrap.
    pub fn hosting(bootstrap_url: &str, config: &RealmConfig) -> Self {
        let html = [
            "<!doctype html>".to_string(),
            "<html lang=\"en\">".to_string(),
            "<head>".to_string(),
            "<meta charset=\"UTF-8\">".to_string(),
            "</head>".to_string(),
            "<body>".to_string(),
            format!(
                "<script type=\"text/javascript\" src=\"{}\"></script>",
                bootstrap_url
            ),
            "</body>".to_string(),
        ]
        .join("\n");

        Self {
            html,
            sandbox: config.sandbox.clone(),
            style: config.frame_style.clone(),
        }
    }

    pub fn from_config(config: &RealmConfig) -> Self {
        Self::hosting(&config.bootstrap_url, config)
    }
}

/// Outcome of a frame load, delivered once.
pub type LoadResult = Result<(), String>;

/// A frame the host has attached, still loading.
#[derive(Debug)]
pub struct MountedFrame {
    pub id: MountId,
    pub loaded: oneshot::Receiver<LoadResult>,
}

/// A loaded realm, as the controller sees it.
#[derive(Clone)]
pub struct RealmWindow {
    pub mount: MountId,
    pub endpoint: Arc<dyn MessageEndpoint>,
}

impl std::fmt::Debug for RealmWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealmWindow")
            .field("mount", &self.mount)
            .finish_non_exhaustive()
    }
}

/// A document/window-capable runtime that can host realms.
#[async_trait]
pub trait Host: Send + Sync {
    /// Whether a document exists to mount frames into.
    fn is_document_capable(&self) -> bool;

    /// Attach a frame. The realm can reach `scope` from inside.
    async fn mount(
        &self,
        spec: FrameSpec,
        scope: Arc<GlobalScope>,
    ) -> Result<MountedFrame, HostError>;

    /// The loaded frame's window, if it has one.
    fn content_window(&self, id: MountId) -> Option<RealmWindow>;

    /// Detach a frame. Unknown ids are ignored.
    fn unmount(&self, id: MountId);
}
