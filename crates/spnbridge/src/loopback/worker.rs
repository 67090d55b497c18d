//! LoopbackWorker - an in-process stand-in for the worker bootstrap.
//!
//! Serves `initialize` and `setPlayState` like the real worker would from
//! the controller's point of view: it takes ownership of the transferred
//! ports, creates an audio node for the session and binds it where the
//! controller will look for it.

use std::sync::{Arc, Mutex};

use serde_json::json;
use spnproto::{
    methods, EndpointListener, IncomingCall, InitializePayload, MessagePort, SetPlayStatePayload,
};
use tracing::{debug, info, warn};

use crate::globals::{Binding, GlobalScope, Side};
use crate::loopback::audio::LoopbackNode;

/// A call the worker received, decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Initialize(InitializePayload),
    SetPlayState(SetPlayStatePayload),
    Unknown(String),
}

/// Everything the loopback workers have seen, shared across mounts.
#[derive(Debug, Default)]
pub struct WorkerJournal {
    calls: Mutex<Vec<RecordedCall>>,
    held_ports: Mutex<Vec<MessagePort>>,
}

impl WorkerJournal {
    fn record(&self, call: RecordedCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    fn hold(&self, ports: impl IntoIterator<Item = MessagePort>) {
        self.held_ports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(ports);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn initialize_calls(&self) -> Vec<InitializePayload> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::Initialize(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn set_play_state_calls(&self) -> Vec<SetPlayStatePayload> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::SetPlayState(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Ports the workers have taken ownership of.
    pub fn held_port_count(&self) -> usize {
        self.held_ports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

/// Serves one realm's endpoint until every sender is gone.
pub struct LoopbackWorker {
    listener: EndpointListener,
    scope: Arc<GlobalScope>,
    journal: Arc<WorkerJournal>,
    node_side: Side,
}

impl LoopbackWorker {
    pub fn new(
        listener: EndpointListener,
        scope: Arc<GlobalScope>,
        journal: Arc<WorkerJournal>,
        node_side: Side,
    ) -> Self {
        Self {
            listener,
            scope,
            journal,
            node_side,
        }
    }

    pub async fn run(mut self) {
        debug!("loopback worker started");
        while let Some(call) = self.listener.next().await {
            let method = call.method().to_string();
            match method.as_str() {
                methods::INITIALIZE => self.handle_initialize(call),
                methods::SET_PLAY_STATE => self.handle_set_play_state(call),
                other => {
                    warn!("loopback worker got unknown method {}", other);
                    self.journal.record(RecordedCall::Unknown(other.to_string()));
                    let message = format!("unknown method {}", other);
                    call.reject(message);
                }
            }
        }
        debug!("loopback worker stopped");
    }

    fn handle_initialize(&self, mut call: IncomingCall) {
        let payload: InitializePayload = match call.payload() {
            Ok(p) => p,
            Err(e) => {
                call.reject(e.to_string());
                return;
            }
        };
        self.journal.record(RecordedCall::Initialize(payload.clone()));

        let ports: Vec<MessagePort> = payload
            .port_refs()
            .into_iter()
            .filter_map(|r| call.take_port(r))
            .collect();
        if ports.len() != 3 {
            call.reject(format!("expected 3 transferred ports, got {}", ports.len()));
            return;
        }
        self.journal.hold(ports);

        let uid = &payload.session_id;
        if self.scope.context(uid).is_none() {
            call.reject(format!("no audio context bound for {}", uid));
            return;
        }

        let node = Arc::new(LoopbackNode::new(format!("spn:{}", uid)));
        let key = match self.node_side {
            Side::Realm => uid.node_key(),
            Side::Parent => uid.parent_node_key(),
        };
        self.scope.bind(self.node_side, key, Binding::Node(node));
        info!(
            session = %uid,
            sample_rate = payload.sample_rate,
            outputs = payload.outputs_count,
            "loopback worker initialized session"
        );

        call.respond(json!({ "sessionId": uid }));
    }

    fn handle_set_play_state(&self, call: IncomingCall) {
        match call.payload::<SetPlayStatePayload>() {
            Ok(payload) => {
                debug!(session = %payload.session_id, state = %payload.new_state, "play state");
                self.journal.record(RecordedCall::SetPlayState(payload));
                call.respond(serde_json::Value::Null);
            }
            Err(e) => call.reject(e.to_string()),
        }
    }
}
