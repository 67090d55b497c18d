//! Channel bundles for driving a session without a real IPC setup.

use spnproto::{IpcMessagePorts, MessageChannel, MessagePort};

/// The controller-side bundle plus the main-side peer of each port.
///
/// The peers come back in bundle order (message, audio input, frame
/// request) and must outlive the session, or the realm's ports go dead.
pub fn port_bundle() -> (IpcMessagePorts, Vec<MessagePort>) {
    let (worker_message, main_message) = MessageChannel::pair();
    let (audio_input, main_input) = MessageChannel::pair();
    let (frame_request, main_request) = MessageChannel::pair();
    (
        IpcMessagePorts::new(worker_message, audio_input, frame_request),
        vec![main_message, main_input, main_request],
    )
}
