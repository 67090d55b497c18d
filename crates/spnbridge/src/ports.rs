//! Port Registry - packaging the channel bundle for transfer.

use spnproto::{
    ContextUid, InitializePayload, IpcMessagePorts, MessagePort, PlayState, PortRef, Transfer,
    HARDWARE_BUFFER_SIZE, SOFTWARE_BUFFER_SIZE,
};

use crate::error::BridgeError;

/// A complete set of the three channels a session hands to its realm.
///
/// Consumed by [`ChannelSet::into_transfer`]; nothing keeps a reference
/// to the ports once the transfer is built.
#[derive(Debug)]
pub struct ChannelSet {
    message: MessagePort,
    audio_input: MessagePort,
    frame_request: MessagePort,
}

/// Session configuration that goes into `initialize` alongside the ports.
#[derive(Debug, Clone, PartialEq)]
pub struct InitializeShape {
    pub session_id: ContextUid,
    pub inputs_count: u32,
    pub outputs_count: u32,
    pub sample_rate: u32,
    pub audio_context_is_provided: bool,
    pub auto_connect: bool,
    pub initial_play_state: Option<PlayState>,
}

impl ChannelSet {
    /// Take a bundle, refusing partial ones.
    pub fn from_bundle(bundle: IpcMessagePorts) -> Result<Self, BridgeError> {
        let missing = bundle.missing();
        match bundle {
            IpcMessagePorts {
                worker_message_port: Some(message),
                audio_input_port: Some(audio_input),
                frame_request_port: Some(frame_request),
            } => Ok(Self {
                message,
                audio_input,
                frame_request,
            }),
            _ => Err(BridgeError::MissingChannel(missing)),
        }
    }

    /// Build the `initialize` transfer, moving all three ports into it.
    pub fn into_transfer(self, shape: InitializeShape) -> Transfer<InitializePayload> {
        let payload = InitializePayload {
            session_id: shape.session_id,
            hardware_buffer_size: HARDWARE_BUFFER_SIZE,
            software_buffer_size: SOFTWARE_BUFFER_SIZE,
            inputs_count: shape.inputs_count,
            outputs_count: shape.outputs_count,
            sample_rate: shape.sample_rate,
            audio_input_port: PortRef { transfer: 0 },
            message_port: PortRef { transfer: 1 },
            request_port: PortRef { transfer: 2 },
            audio_context_is_provided: shape.audio_context_is_provided,
            auto_connect: shape.auto_connect,
            initial_play_state: shape.initial_play_state,
        };
        Transfer::new(
            payload,
            vec![self.audio_input, self.message, self.frame_request],
        )
    }
}
