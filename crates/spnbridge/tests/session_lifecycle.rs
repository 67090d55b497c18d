//! Session lifecycle against the loopback host: cold start, reuse,
//! teardown, and the ways initialization can fail.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use spnbridge::loopback::{LoadBehavior, LoopbackContext, LoopbackContextFactory, LoopbackHost};
use spnbridge::{
    callback_microphone, AudioContext, AudioNode, BridgeError, CapabilityError, ContextState,
    EngineHandle, MediaStream, MicrophoneCallback, MidiAdapter, MidiCallback, MidiInputHandler,
    MidiRequest, Phase, PublicEvents, RealmContext, SessionController, SessionOptions, Side,
};
use spnconf::RealmConfig;
use spnproto::{ContextUid, IpcMessagePorts, MessageChannel};
use uuid::Uuid;

#[derive(Default)]
struct RecordingEvents {
    nodes: Mutex<Vec<Option<Uuid>>>,
}

impl RecordingEvents {
    fn nodes(&self) -> Vec<Option<Uuid>> {
        self.nodes.lock().unwrap().clone()
    }
}

impl PublicEvents for RecordingEvents {
    fn audio_node_created(&self, node: Option<Arc<dyn AudioNode>>) {
        self.nodes.lock().unwrap().push(node.map(|n| n.id()));
    }
}

struct Rig {
    host: Arc<LoopbackHost>,
    realm: Arc<RealmContext>,
    factory: Arc<LoopbackContextFactory>,
    events: Arc<RecordingEvents>,
}

impl Rig {
    fn new(host: LoopbackHost) -> Self {
        let host = Arc::new(host);
        let realm = Arc::new(RealmContext::new(host.clone(), &RealmConfig::default()));
        Self {
            host,
            realm,
            factory: Arc::new(LoopbackContextFactory::new()),
            events: Arc::new(RecordingEvents::default()),
        }
    }

    fn controller(&self, options: SessionOptions) -> SessionController {
        SessionController::new(self.realm.clone(), self.factory.clone(), options)
            .with_public_events(self.events.clone())
            .with_ipc_ports(ports())
    }
}

fn ports() -> IpcMessagePorts {
    IpcMessagePorts::new(
        MessageChannel::pair().0,
        MessageChannel::pair().0,
        MessageChannel::pair().0,
    )
}

#[tokio::test]
async fn cold_start_mounts_once_and_sends_one_initialize() {
    let rig = Rig::new(LoopbackHost::new());
    let mut ctl = rig.controller(SessionOptions::default());

    ctl.try_initialize().await.unwrap();

    assert_eq!(rig.host.mount_count(), 1);
    let calls = rig.host.journal().initialize_calls();
    assert_eq!(calls.len(), 1);
    let payload = &calls[0];
    assert_eq!(payload.session_id.as_str(), "audioWorklet0");
    assert_eq!(payload.hardware_buffer_size, 32768);
    assert_eq!(payload.software_buffer_size, 2048);
    assert_eq!(payload.sample_rate, 44100);
    assert_eq!(payload.inputs_count, 2);
    assert_eq!(payload.outputs_count, 2);
    assert!(payload.auto_connect);
    assert!(!payload.audio_context_is_provided);
    assert_eq!(payload.initial_play_state, None);

    assert_eq!(rig.host.journal().held_port_count(), 3);

    let nodes = rig.events.nodes();
    assert_eq!(nodes.len(), 1);
    assert!(nodes[0].is_some());
    assert_eq!(ctl.phase(), Phase::Ready);
}

#[tokio::test]
async fn second_initialize_reuses_realm_and_proxy() {
    let rig = Rig::new(LoopbackHost::new());
    let mut ctl = rig.controller(SessionOptions::default());

    ctl.try_initialize().await.unwrap();
    let first_proxy = rig.realm.proxy().await.unwrap();
    let first_uid = ctl.session_id().cloned().unwrap();

    ctl.set_ipc_ports(ports());
    ctl.try_initialize().await.unwrap();
    let second_proxy = rig.realm.proxy().await.unwrap();
    let second_uid = ctl.session_id().cloned().unwrap();

    assert_eq!(rig.host.mount_count(), 1);
    assert!(Arc::ptr_eq(&first_proxy, &second_proxy));
    assert!(second_uid.counter() > first_uid.counter());
    assert_eq!(second_uid.as_str(), "audioWorklet1");
}

#[tokio::test]
async fn session_ids_strictly_increase_across_controllers() {
    let rig = Rig::new(LoopbackHost::new());
    let mut seen = Vec::new();

    for _ in 0..4 {
        let mut ctl = rig.controller(SessionOptions::default());
        ctl.try_initialize().await.unwrap();
        seen.push(ctl.session_id().and_then(ContextUid::counter).unwrap());
    }

    assert_eq!(seen, vec![0, 1, 2, 3]);
    assert_eq!(rig.realm.issued_uids().await, 4);
}

#[tokio::test]
async fn terminate_resets_everything_and_allows_a_cold_restart() {
    let rig = Rig::new(LoopbackHost::new());
    let mut ctl = rig.controller(SessionOptions::default());
    ctl.try_initialize().await.unwrap();

    assert!(ctl.terminate_instance().await);

    assert!(!rig.realm.is_live().await);
    assert!(rig.realm.proxy().await.is_none());
    assert_eq!(rig.realm.issued_uids().await, 0);
    assert_eq!(rig.host.live_frames(), 0);
    assert!(rig.realm.scope().is_empty());
    assert_eq!(rig.factory.created()[0].state(), ContextState::Closed);
    assert_eq!(ctl.phase(), Phase::Uninitialized);
    assert_eq!(ctl.session_id(), None);

    ctl.set_ipc_ports(ports());
    ctl.try_initialize().await.unwrap();
    assert_eq!(ctl.session_id().unwrap().as_str(), "audioWorklet0");
    assert_eq!(rig.host.mount_count(), 2);
    assert_eq!(rig.factory.created_count(), 2);
}

#[tokio::test]
async fn reinitialize_releases_the_previous_session_bindings() {
    let rig = Rig::new(LoopbackHost::new().with_node_side(Side::Parent));
    let mut ctl = rig.controller(SessionOptions::default());
    ctl.try_initialize().await.unwrap();
    let first = ctl.session_id().cloned().unwrap();

    ctl.set_ipc_ports(ports());
    ctl.try_initialize().await.unwrap();

    let scope = rig.realm.scope();
    assert!(!scope.contains(Side::Realm, first.as_str()));
    assert!(!scope.contains(Side::Parent, &first.parent_key()));
    assert!(!scope.contains(Side::Parent, &first.parent_node_key()));
    assert_eq!(scope.len(Side::Parent), 2);

    assert!(ctl.terminate_instance().await);
    assert!(scope.is_empty());
}

#[tokio::test]
async fn terminate_twice_is_harmless() {
    let rig = Rig::new(LoopbackHost::new());
    let mut ctl = rig.controller(SessionOptions::default());
    ctl.try_initialize().await.unwrap();

    assert!(ctl.terminate_instance().await);
    assert!(!ctl.terminate_instance().await);
    assert_eq!(rig.factory.created()[0].close_calls(), 1);
}

#[tokio::test]
async fn close_failure_does_not_stop_teardown() {
    let rig = Rig::new(LoopbackHost::new());
    let supplied = Arc::new(LoopbackContext::failing_close(44100));
    let mut ctl = rig
        .controller(SessionOptions::default())
        .with_audio_context(supplied.clone());
    ctl.try_initialize().await.unwrap();

    assert!(ctl.terminate_instance().await);
    assert_eq!(supplied.close_calls(), 1);
    assert!(!rig.realm.is_live().await);
}

#[tokio::test]
async fn mismatched_supplied_context_is_replaced() {
    let rig = Rig::new(LoopbackHost::new());
    let supplied = Arc::new(LoopbackContext::new(48000));
    let mut ctl = rig
        .controller(SessionOptions::default())
        .with_audio_context(supplied.clone());

    ctl.try_initialize().await.unwrap();

    assert_eq!(rig.factory.created_count(), 1);
    let replacement = rig.factory.created()[0].clone();
    assert_eq!(replacement.sample_rate(), 44100);

    let uid = ctl.session_id().unwrap();
    let bound = rig.realm.scope().context(uid).unwrap();
    assert_eq!(bound.id(), replacement.id());
    assert_ne!(bound.id(), supplied.id());

    let payload = &rig.host.journal().initialize_calls()[0];
    assert!(payload.audio_context_is_provided);
    assert_eq!(payload.sample_rate, 44100);
}

#[tokio::test]
async fn matching_supplied_context_is_used_as_is() {
    let rig = Rig::new(LoopbackHost::new());
    let supplied = Arc::new(LoopbackContext::new(44100));
    let mut ctl = rig
        .controller(SessionOptions::default())
        .with_audio_context(supplied.clone());

    ctl.try_initialize().await.unwrap();

    assert_eq!(rig.factory.created_count(), 0);
    assert_eq!(ctl.snapshot().context_id, Some(supplied.id()));
}

#[tokio::test]
async fn missing_channel_fails_before_anything_is_sent() {
    let rig = Rig::new(LoopbackHost::new());
    let (worker_message, _) = MessageChannel::pair();
    let partial = IpcMessagePorts {
        worker_message_port: Some(worker_message),
        ..Default::default()
    };
    let mut ctl = rig
        .controller(SessionOptions::default())
        .with_ipc_ports(partial);

    match ctl.try_initialize().await {
        Err(BridgeError::MissingChannel(missing)) => {
            assert_eq!(missing, vec!["audioInputPort", "requestPort"]);
        }
        other => panic!("expected MissingChannel, got {:?}", other),
    }

    assert!(rig.host.journal().initialize_calls().is_empty());
    assert_eq!(rig.realm.issued_uids().await, 0);
    assert_eq!(ctl.phase(), Phase::Uninitialized);
}

#[tokio::test]
async fn ports_are_consumed_by_initialize() {
    let rig = Rig::new(LoopbackHost::new());
    let mut ctl = rig.controller(SessionOptions::default());
    ctl.try_initialize().await.unwrap();

    let err = ctl.try_initialize().await.unwrap_err();
    assert!(matches!(err, BridgeError::MissingChannel(ref m) if m.len() == 3));
}

#[tokio::test]
async fn headless_host_is_an_environment_error() {
    let rig = Rig::new(LoopbackHost::headless());
    let mut ctl = rig.controller(SessionOptions::default());

    let err = ctl.try_initialize().await.unwrap_err();
    assert!(matches!(err, BridgeError::Environment));
    assert_eq!(rig.host.mount_count(), 0);
    assert_eq!(ctl.phase(), Phase::Uninitialized);
}

#[tokio::test]
async fn frame_without_window_aborts_initialize() {
    let rig = Rig::new(LoopbackHost::new().with_load_behavior(LoadBehavior::NoWindow));
    let mut ctl = rig.controller(SessionOptions::default());

    ctl.initialize().await;

    assert_eq!(ctl.phase(), Phase::Uninitialized);
    assert_eq!(rig.host.mount_count(), 1);
    assert_eq!(rig.host.live_frames(), 0);
    assert!(!rig.realm.is_live().await);
    assert!(rig.realm.proxy().await.is_none());
    assert!(rig.events.nodes().is_empty());
}

#[tokio::test]
async fn load_error_with_a_window_still_initializes() {
    let rig = Rig::new(LoopbackHost::new().with_load_behavior(LoadBehavior::ErrorButUsable));
    let mut ctl = rig.controller(SessionOptions::default());

    ctl.try_initialize().await.unwrap();
    assert_eq!(rig.host.journal().initialize_calls().len(), 1);
}

#[tokio::test]
async fn node_bound_on_parent_side_is_found() {
    let rig = Rig::new(LoopbackHost::new().with_node_side(Side::Parent));
    let mut ctl = rig.controller(SessionOptions::default());

    ctl.try_initialize().await.unwrap();

    let uid = ctl.session_id().unwrap();
    assert!(rig.realm.scope().contains(Side::Parent, &uid.parent_node_key()));
    assert!(rig.events.nodes()[0].is_some());
}

#[tokio::test]
async fn live_input_is_connected_to_the_worker_node() {
    let rig = Rig::new(LoopbackHost::new());
    let options = SessionOptions {
        request_input: true,
        ..SessionOptions::default()
    };
    let mic = callback_microphone(|cb: MicrophoneCallback| {
        cb.resolve(Some(MediaStream::new("built-in")));
    });
    let mut ctl = rig.controller(options).with_microphone(Arc::new(mic));

    ctl.try_initialize().await.unwrap();

    let node_id = rig.events.nodes()[0].unwrap();
    let sources = rig.factory.created()[0].sources();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].connections(), vec![node_id]);
    assert!(ctl.snapshot().live_input);
}

#[tokio::test]
async fn denied_microphone_continues_without_input() {
    let rig = Rig::new(LoopbackHost::new());
    let options = SessionOptions {
        request_input: true,
        ..SessionOptions::default()
    };
    let mic = callback_microphone(|cb: MicrophoneCallback| cb.resolve(None));
    let mut ctl = rig.controller(options).with_microphone(Arc::new(mic));

    ctl.try_initialize().await.unwrap();

    assert!(rig.factory.created()[0].sources().is_empty());
    assert!(!ctl.snapshot().live_input);
    assert_eq!(rig.host.journal().initialize_calls().len(), 1);
}

#[derive(Default)]
struct CapturedMidi {
    callbacks: Mutex<Vec<MidiCallback>>,
}

impl MidiAdapter for CapturedMidi {
    fn request_midi(&self, request: MidiRequest) -> Result<(), CapabilityError> {
        self.callbacks.lock().unwrap().push(request.on_midi_message);
        Ok(())
    }
}

#[derive(Default)]
struct MidiSink {
    messages: Mutex<Vec<Vec<u8>>>,
}

impl MidiInputHandler for MidiSink {
    fn handle_midi_input(&self, message: &[u8]) {
        self.messages.lock().unwrap().push(message.to_vec());
    }
}

#[tokio::test]
async fn midi_is_routed_to_the_engine_handler() {
    let rig = Rig::new(LoopbackHost::new());
    let midi = Arc::new(CapturedMidi::default());
    let sink = Arc::new(MidiSink::default());
    let options = SessionOptions {
        request_midi: true,
        ..SessionOptions::default()
    };
    let mut ctl = rig
        .controller(options)
        .with_engine(EngineHandle::new().with_midi(sink.clone()))
        .with_midi(midi.clone());

    ctl.try_initialize().await.unwrap();

    let callbacks = midi.callbacks.lock().unwrap().clone();
    assert_eq!(callbacks.len(), 1);
    (callbacks[0])(&[0x90, 60, 100]);
    assert_eq!(*sink.messages.lock().unwrap(), vec![vec![0x90, 60, 100]]);
}

#[tokio::test]
async fn midi_without_engine_handler_is_not_requested() {
    let rig = Rig::new(LoopbackHost::new());
    let midi = Arc::new(CapturedMidi::default());
    let options = SessionOptions {
        request_midi: true,
        ..SessionOptions::default()
    };
    let mut ctl = rig.controller(options).with_midi(midi.clone());

    ctl.try_initialize().await.unwrap();
    assert!(midi.callbacks.lock().unwrap().is_empty());
}
