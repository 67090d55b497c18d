//! Realm loading and the shared realm context.
//!
//! At most one realm and one proxy exist per [`RealmContext`]. Every
//! session controller built on the same context shares them; the realm is
//! created lazily by the first `initialize` and only recreated after an
//! explicit [`RealmContext::teardown`].

use std::sync::Arc;

use spnconf::RealmConfig;
use spnproto::{ContextUid, RemoteProxy};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::BridgeError;
use crate::globals::{GlobalScope, Side};
use crate::host::{FrameSpec, Host, MountId, RealmWindow};

/// Mounts realms into a host and waits for them to load.
pub struct RealmLoader {
    host: Arc<dyn Host>,
    spec: FrameSpec,
}

impl RealmLoader {
    pub fn new(host: Arc<dyn Host>, config: &RealmConfig) -> Self {
        Self {
            host,
            spec: FrameSpec::from_config(config),
        }
    }

    /// Mount a fresh realm and resolve once it reports loaded.
    ///
    /// A load error is logged and otherwise ignored; what decides success
    /// is whether the frame exposes a window afterwards.
    pub async fn load(&self, scope: Arc<GlobalScope>) -> Result<RealmWindow, BridgeError> {
        if !self.host.is_document_capable() {
            return Err(BridgeError::Environment);
        }

        let frame = self.host.mount(self.spec.clone(), scope).await?;
        debug!(mount = %frame.id, "realm frame attached, waiting for load");

        match frame.loaded.await {
            Ok(Ok(())) => debug!(mount = %frame.id, "realm frame loaded"),
            Ok(Err(e)) => error!(mount = %frame.id, "realm frame failed to load: {}", e),
            Err(_) => warn!(mount = %frame.id, "realm frame dropped its load signal"),
        }

        match self.host.content_window(frame.id) {
            Some(window) => Ok(window),
            None => {
                self.host.unmount(frame.id);
                Err(BridgeError::RealmLoad(format!(
                    "frame {} has no content window",
                    frame.id
                )))
            }
        }
    }

    pub fn release(&self, mount: MountId) {
        self.host.unmount(mount);
    }
}

#[derive(Default)]
struct SharedRealm {
    window: Option<RealmWindow>,
    proxy: Option<Arc<RemoteProxy>>,
    next_uid: u64,
}

/// Owner of the realm, its proxy, and the session id counter.
pub struct RealmContext {
    loader: RealmLoader,
    scope: Arc<GlobalScope>,
    shared: Mutex<SharedRealm>,
}

impl RealmContext {
    pub fn new(host: Arc<dyn Host>, config: &RealmConfig) -> Self {
        Self {
            loader: RealmLoader::new(host, config),
            scope: Arc::new(GlobalScope::new()),
            shared: Mutex::new(SharedRealm::default()),
        }
    }

    pub fn loader(&self) -> &RealmLoader {
        &self.loader
    }

    /// Global bindings shared with the realm.
    pub fn scope(&self) -> &Arc<GlobalScope> {
        &self.scope
    }

    /// The live realm, loading one if none exists.
    pub async fn ensure_realm(&self) -> Result<RealmWindow, BridgeError> {
        let mut shared = self.shared.lock().await;
        if let Some(window) = &shared.window {
            return Ok(window.clone());
        }

        let window = self.loader.load(Arc::clone(&self.scope)).await?;
        info!(mount = %window.mount, "realm ready");
        shared.window = Some(window.clone());
        Ok(window)
    }

    pub async fn window(&self) -> Option<RealmWindow> {
        self.shared.lock().await.window.clone()
    }

    pub async fn is_live(&self) -> bool {
        self.shared.lock().await.window.is_some()
    }

    /// The proxy for `window`, wrapping its endpoint on first use.
    pub async fn ensure_proxy(&self, window: &RealmWindow) -> Arc<RemoteProxy> {
        let mut shared = self.shared.lock().await;
        if let Some(proxy) = &shared.proxy {
            return Arc::clone(proxy);
        }
        let proxy = Arc::new(RemoteProxy::wrap(Arc::clone(&window.endpoint)));
        shared.proxy = Some(Arc::clone(&proxy));
        proxy
    }

    pub async fn proxy(&self) -> Option<Arc<RemoteProxy>> {
        self.shared.lock().await.proxy.clone()
    }

    /// Issue the next session id. Strictly increasing until teardown.
    pub async fn next_context_uid(&self) -> ContextUid {
        let mut shared = self.shared.lock().await;
        let uid = ContextUid::from_counter(shared.next_uid);
        shared.next_uid += 1;
        uid
    }

    /// How many ids have been issued since the last teardown.
    pub async fn issued_uids(&self) -> u64 {
        self.shared.lock().await.next_uid
    }

    /// Release the proxy, remove the mount, and reset the counter.
    ///
    /// Safe to repeat; returns whether anything was torn down.
    pub async fn teardown(&self) -> bool {
        let mut shared = self.shared.lock().await;
        let mut acted = false;

        if let Some(proxy) = shared.proxy.take() {
            proxy.release();
            acted = true;
        }
        if let Some(window) = shared.window.take() {
            self.loader.release(window.mount);
            self.scope.clear(Side::Realm);
            info!(mount = %window.mount, "realm torn down");
            acted = true;
        }
        if shared.next_uid != 0 {
            shared.next_uid = 0;
            acted = true;
        }

        acted
    }
}
