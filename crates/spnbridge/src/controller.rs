//! Session Controller - owns one audio session and its play-state machine.
//!
//! ```text
//! Uninitialized ──initialize──▶ Initializing ──ack──▶ Ready
//!       ▲                            │                  │
//!       │                         failure        play-state changes
//!       │                            ▼                  ▼
//!       └──────terminate──── Uninitialized     Started / Paused / Ended
//! ```
//!
//! The controller shares its realm, proxy and id counter with every other
//! controller built on the same [`RealmContext`]. Only one session is
//! expected to be active per realm at a time.

use std::sync::Arc;

use serde::Serialize;
use spnconf::SessionDefaults;
use spnproto::{ContextUid, IpcMessagePorts, PlayState, SetPlayStatePayload};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audio::{AudioContext, AudioContextFactory, AudioNode, ContextState};
use crate::capabilities::{MicrophoneAdapter, MidiAdapter, MidiRequest, NoMicrophone, NoMidi};
use crate::engine::{EngineHandle, PublicEvents};
use crate::error::BridgeError;
use crate::globals::Side;
use crate::ports::{ChannelSet, InitializeShape};
use crate::realm::RealmContext;

/// Audio shape and capability requests for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub sample_rate: u32,
    pub inputs_count: u32,
    pub outputs_count: u32,
    pub auto_connect: bool,
    pub request_input: bool,
    pub request_midi: bool,
}

impl From<&SessionDefaults> for SessionOptions {
    fn from(defaults: &SessionDefaults) -> Self {
        Self {
            sample_rate: defaults.sample_rate,
            inputs_count: defaults.inputs_count,
            outputs_count: defaults.outputs_count,
            auto_connect: defaults.auto_connect,
            request_input: defaults.request_input,
            request_midi: defaults.request_midi,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&SessionDefaults::default())
    }
}

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Uninitialized,
    Initializing,
    Ready,
    Started,
    Paused,
    Ended,
}

/// Point-in-time view of a controller, for logs and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Option<ContextUid>,
    pub phase: Phase,
    pub play_state: Option<PlayState>,
    pub sample_rate: u32,
    pub context_id: Option<Uuid>,
    pub context_supplied: bool,
    pub live_input: bool,
}

/// Drives one session against a shared realm.
pub struct SessionController {
    realm: Arc<RealmContext>,
    factory: Arc<dyn AudioContextFactory>,
    options: SessionOptions,
    engine: EngineHandle,
    events: Option<Arc<dyn PublicEvents>>,
    microphone: Arc<dyn MicrophoneAdapter>,
    midi: Arc<dyn MidiAdapter>,
    ipc_ports: Option<IpcMessagePorts>,
    audio_context: Option<Arc<dyn AudioContext>>,
    context_supplied: bool,
    live_input: Option<Arc<dyn AudioNode>>,
    uid: Option<ContextUid>,
    play_state: Option<PlayState>,
    phase: Phase,
}

impl SessionController {
    pub fn new(
        realm: Arc<RealmContext>,
        factory: Arc<dyn AudioContextFactory>,
        options: SessionOptions,
    ) -> Self {
        Self {
            realm,
            factory,
            options,
            engine: EngineHandle::default(),
            events: None,
            microphone: Arc::new(NoMicrophone),
            midi: Arc::new(NoMidi),
            ipc_ports: None,
            audio_context: None,
            context_supplied: false,
            live_input: None,
            uid: None,
            play_state: None,
            phase: Phase::Uninitialized,
        }
    }

    /// Use a caller-owned audio context instead of creating one.
    pub fn with_audio_context(mut self, context: Arc<dyn AudioContext>) -> Self {
        self.audio_context = Some(context);
        self.context_supplied = true;
        self
    }

    pub fn with_engine(mut self, engine: EngineHandle) -> Self {
        self.engine = engine;
        self
    }

    /// Listener for controller notifications. Falls back to the engine's.
    pub fn with_public_events(mut self, events: Arc<dyn PublicEvents>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_microphone(mut self, microphone: Arc<dyn MicrophoneAdapter>) -> Self {
        self.microphone = microphone;
        self
    }

    pub fn with_midi(mut self, midi: Arc<dyn MidiAdapter>) -> Self {
        self.midi = midi;
        self
    }

    pub fn with_ipc_ports(mut self, ports: IpcMessagePorts) -> Self {
        self.ipc_ports = Some(ports);
        self
    }

    /// Hand over a fresh bundle. Each `initialize` consumes one.
    pub fn set_ipc_ports(&mut self, ports: IpcMessagePorts) {
        self.ipc_ports = Some(ports);
    }

    pub fn realm(&self) -> &Arc<RealmContext> {
        &self.realm
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn session_id(&self) -> Option<&ContextUid> {
        self.uid.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn play_state(&self) -> Option<PlayState> {
        self.play_state
    }

    pub fn audio_context(&self) -> Option<&Arc<dyn AudioContext>> {
        self.audio_context.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.uid.clone(),
            phase: self.phase,
            play_state: self.play_state,
            sample_rate: self.options.sample_rate,
            context_id: self.audio_context.as_ref().map(|c| c.id()),
            context_supplied: self.context_supplied,
            live_input: self.live_input.is_some(),
        }
    }

    fn events(&self) -> Option<Arc<dyn PublicEvents>> {
        self.events.clone().or_else(|| self.engine.events.clone())
    }

    /// Bring the session up, logging any failure.
    ///
    /// A failed initialize leaves the controller `Uninitialized`; call
    /// [`terminate_instance`](Self::terminate_instance) before retrying to
    /// drop whatever was set up.
    pub async fn initialize(&mut self) {
        if let Err(e) = self.try_initialize().await {
            error!("session initialize failed: {}", e);
        }
    }

    /// Bring the session up, returning the failure instead of logging it.
    pub async fn try_initialize(&mut self) -> Result<(), BridgeError> {
        self.phase = Phase::Initializing;
        match self.run_initialize().await {
            Ok(()) => {
                self.phase = Phase::Ready;
                Ok(())
            }
            Err(e) => {
                self.phase = Phase::Uninitialized;
                Err(e)
            }
        }
    }

    async fn run_initialize(&mut self) -> Result<(), BridgeError> {
        let window = self.realm.ensure_realm().await?;
        let proxy = self.realm.ensure_proxy(&window).await;

        let missing = match &self.ipc_ports {
            Some(ports) => ports.missing(),
            None => IpcMessagePorts::default().missing(),
        };
        if !missing.is_empty() {
            return Err(BridgeError::MissingChannel(missing));
        }

        if let Some(previous) = self.uid.take() {
            debug!(session = %previous, "releasing bindings of the previous session");
            self.release_bindings(&previous);
        }
        if let Some(input) = self.live_input.take() {
            input.disconnect();
        }

        let uid = self.realm.next_context_uid().await;
        self.uid = Some(uid.clone());

        let context = self.resolve_context();
        let scope = Arc::clone(self.realm.scope());
        scope.bind_context(&uid, Arc::clone(&context));

        let live_input = if self.options.request_input {
            match self.microphone.request_stream().await {
                Some(stream) => {
                    debug!(session = %uid, stream = %stream.label, "live input acquired");
                    Some(context.create_media_stream_source(stream))
                }
                None => {
                    info!(session = %uid, "no live input stream; continuing without input");
                    None
                }
            }
        } else {
            None
        };

        let channels = ChannelSet::from_bundle(self.ipc_ports.take().unwrap_or_default())?;
        let transfer = channels.into_transfer(InitializeShape {
            session_id: uid.clone(),
            inputs_count: self.options.inputs_count,
            outputs_count: self.options.outputs_count,
            sample_rate: self.options.sample_rate,
            audio_context_is_provided: self.context_supplied,
            auto_connect: self.options.auto_connect,
            initial_play_state: self.play_state,
        });

        debug!(session = %uid, "initializing realm session");
        proxy.initialize(transfer).await?;
        debug!(session = %uid, "realm session initialized");

        let node = scope.lookup_node(&uid);
        match (&node, &live_input) {
            (Some(node), Some(input)) => input.connect(node.as_ref()),
            (None, _) => warn!(session = %uid, "realm did not expose an audio node"),
            _ => {}
        }
        self.live_input = live_input;

        if let Some(events) = self.events() {
            events.audio_node_created(node);
        }

        if self.options.request_midi {
            self.register_midi();
        }

        info!(session = %uid, sample_rate = self.options.sample_rate, "session ready");
        Ok(())
    }

    /// The context this session will run on, replacing an unusable one.
    fn resolve_context(&mut self) -> Arc<dyn AudioContext> {
        let rate = self.options.sample_rate;
        let problem = match &self.audio_context {
            None => "context is absent".to_string(),
            Some(ctx) if ctx.state() == ContextState::Closed => "context is closed".to_string(),
            Some(ctx) if ctx.sample_rate() != rate => format!(
                "context runs at {} Hz but the session needs {} Hz",
                ctx.sample_rate(),
                rate
            ),
            Some(ctx) => return Arc::clone(ctx),
        };

        if self.context_supplied {
            let e = BridgeError::ContextState(problem);
            error!("supplied {}; creating a replacement", e);
        } else if self.audio_context.is_some() {
            debug!("replacing audio context: {}", problem);
        }

        let context = self.factory.create(rate);
        self.audio_context = Some(Arc::clone(&context));
        context
    }

    /// Drop every global binding made for `uid`, disconnecting its nodes.
    fn release_bindings(&self, uid: &ContextUid) -> bool {
        let scope = self.realm.scope();
        let mut released = scope.release_parent_node(uid);
        if let Some(binding) = scope.remove(Side::Realm, &uid.node_key()) {
            if let Some(node) = binding.as_node() {
                node.disconnect();
            }
            released = true;
        }
        released |= scope.remove(Side::Parent, &uid.parent_key()).is_some();
        released |= scope.remove(Side::Realm, uid.as_str()).is_some();
        released
    }

    fn register_midi(&self) {
        let Some(handler) = self.engine.midi.clone() else {
            debug!("MIDI requested but the engine has no MIDI handler");
            return;
        };
        let request = MidiRequest {
            on_midi_message: Arc::new(move |message: &[u8]| handler.handle_midi_input(message)),
        };
        match self.midi.request_midi(request) {
            Ok(()) => info!("MIDI input registered"),
            Err(e) => warn!("MIDI input not registered: {}", e),
        }
    }

    /// React to an engine-driven play-state change and mirror it to the realm.
    ///
    /// A change to the current state does nothing at all.
    pub async fn on_play_state_change(&mut self, new_state: PlayState) {
        if self.play_state == Some(new_state) {
            debug!(state = %new_state, "play state unchanged");
            return;
        }
        debug!(state = %new_state, "play state change");

        match new_state {
            PlayState::PerformanceStarted => {
                self.play_state = Some(new_state);
                if let Err(e) = self.try_initialize().await {
                    error!("session initialize failed: {}", e);
                    return;
                }
                if let Some(releases) = self.engine.releases.clone() {
                    releases.start_released().await;
                }
                if let Some(events) = self.events() {
                    events.performance_started();
                }
            }
            PlayState::PerformanceEnded => {
                if let Some(uid) = &self.uid {
                    self.realm.scope().release_parent_node(uid);
                }
            }
            PlayState::PerformancePaused => {
                if let Some(releases) = self.engine.releases.clone() {
                    if let Some(events) = self.events() {
                        events.performance_paused();
                    }
                    releases.pause_released().await;
                }
            }
            PlayState::PerformanceResumed => {
                if let Some(releases) = self.engine.releases.clone() {
                    if let Some(events) = self.events() {
                        events.performance_resumed();
                    }
                    releases.resume_released().await;
                }
            }
            PlayState::RenderStarted | PlayState::RenderEnded => {}
        }

        self.play_state = Some(new_state);
        if self.uid.is_some() {
            self.phase = match new_state {
                PlayState::PerformanceStarted | PlayState::PerformanceResumed => Phase::Started,
                PlayState::PerformancePaused => Phase::Paused,
                PlayState::PerformanceEnded | PlayState::RenderEnded => Phase::Ended,
                PlayState::RenderStarted => self.phase,
            };
        }

        self.forward_play_state(new_state).await;
    }

    async fn forward_play_state(&self, new_state: PlayState) {
        if !new_state.forwards_to_realm() {
            return;
        }
        let Some(proxy) = self.realm.proxy().await else {
            return;
        };
        let Some(session_id) = self.uid.clone() else {
            debug!(state = %new_state, "no session yet; play state stays local");
            return;
        };

        let payload = SetPlayStatePayload {
            session_id,
            new_state,
        };
        if let Err(e) = proxy.set_play_state(payload).await {
            warn!(state = %new_state, "failed to mirror play state: {}", e);
        }
    }

    /// Tear the session and the shared realm down.
    ///
    /// Every step checks before acting, so repeated calls are harmless.
    /// Returns whether anything was torn down.
    pub async fn terminate_instance(&mut self) -> bool {
        let mut acted = false;

        if let Some(uid) = self.uid.take() {
            acted |= self.release_bindings(&uid);
        }

        if let Some(input) = self.live_input.take() {
            input.disconnect();
            acted = true;
        }

        if let Some(context) = self.audio_context.take() {
            if context.state() != ContextState::Closed {
                if let Err(e) = context.close().await {
                    let e = BridgeError::from(e);
                    warn!("ignoring close failure: {}", e);
                }
            }
            acted = true;
        }

        acted |= self.realm.teardown().await;

        self.play_state = None;
        self.phase = Phase::Uninitialized;
        if acted {
            info!("session terminated");
        } else {
            debug!("terminate: nothing to release");
        }
        acted
    }
}
