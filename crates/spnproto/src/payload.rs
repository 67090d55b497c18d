//! Remote call payloads.

use serde::{Deserialize, Serialize};

use crate::{ContextUid, MessagePort, PlayState};

/// Position of a port in the transfer list travelling with a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub transfer: usize,
}

/// A payload together with the ports moved alongside it.
///
/// Constructing one takes ownership of the ports; they are handed to the
/// endpoint when the call is posted and never come back.
#[derive(Debug)]
pub struct Transfer<T> {
    pub value: T,
    pub ports: Vec<MessagePort>,
}

impl<T> Transfer<T> {
    pub fn new(value: T, ports: Vec<MessagePort>) -> Self {
        Self { value, ports }
    }

    pub fn into_parts(self) -> (T, Vec<MessagePort>) {
        (self.value, self.ports)
    }
}

/// Configuration sent with the remote `initialize` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePayload {
    pub session_id: ContextUid,
    pub hardware_buffer_size: u32,
    pub software_buffer_size: u32,
    pub inputs_count: u32,
    pub outputs_count: u32,
    pub sample_rate: u32,
    pub audio_input_port: PortRef,
    pub message_port: PortRef,
    pub request_port: PortRef,
    pub audio_context_is_provided: bool,
    pub auto_connect: bool,
    pub initial_play_state: Option<PlayState>,
}

impl InitializePayload {
    /// Every port reference in the payload, in field order.
    pub fn port_refs(&self) -> [PortRef; 3] {
        [self.audio_input_port, self.message_port, self.request_port]
    }
}

/// Payload of the remote `setPlayState` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPlayStatePayload {
    pub session_id: ContextUid,
    pub new_state: PlayState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn initialize_payload_wire_shape() {
        let payload = InitializePayload {
            session_id: ContextUid::from_counter(0),
            hardware_buffer_size: crate::HARDWARE_BUFFER_SIZE,
            software_buffer_size: crate::SOFTWARE_BUFFER_SIZE,
            inputs_count: 2,
            outputs_count: 2,
            sample_rate: 44100,
            audio_input_port: PortRef { transfer: 0 },
            message_port: PortRef { transfer: 1 },
            request_port: PortRef { transfer: 2 },
            audio_context_is_provided: false,
            auto_connect: true,
            initial_play_state: None,
        };

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "sessionId": "audioWorklet0",
                "hardwareBufferSize": 32768,
                "softwareBufferSize": 2048,
                "inputsCount": 2,
                "outputsCount": 2,
                "sampleRate": 44100,
                "audioInputPort": {"transfer": 0},
                "messagePort": {"transfer": 1},
                "requestPort": {"transfer": 2},
                "audioContextIsProvided": false,
                "autoConnect": true,
                "initialPlayState": null,
            })
        );
    }

    #[test]
    fn set_play_state_wire_shape() {
        let payload = SetPlayStatePayload {
            session_id: ContextUid::from_counter(4),
            new_state: PlayState::PerformancePaused,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"sessionId": "audioWorklet4", "newState": "realtimePerformancePaused"})
        );
    }
}
