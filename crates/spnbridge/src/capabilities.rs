//! Capability adapters - microphone and MIDI acquisition.
//!
//! Both adapters resolve exactly once per request. For the microphone this
//! is enforced by [`MicrophoneCallback`], which is consumed on use; a
//! callback that is dropped unused resolves as "no stream" instead of
//! leaving initialization waiting forever.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::audio::MediaStream;
use crate::error::CapabilityError;

/// Acquires a live input stream.
#[async_trait]
pub trait MicrophoneAdapter: Send + Sync {
    /// `None` is an explicit "no stream" outcome (denied, no device).
    async fn request_stream(&self) -> Option<MediaStream>;
}

/// Callback for incoming MIDI bytes.
pub type MidiCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// A MIDI acquisition request.
#[derive(Clone)]
pub struct MidiRequest {
    pub on_midi_message: MidiCallback,
}

/// Connects MIDI inputs to a callback.
pub trait MidiAdapter: Send + Sync {
    fn request_midi(&self, request: MidiRequest) -> Result<(), CapabilityError>;
}

/// Adapter for hosts without a microphone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMicrophone;

#[async_trait]
impl MicrophoneAdapter for NoMicrophone {
    async fn request_stream(&self) -> Option<MediaStream> {
        None
    }
}

/// Adapter for hosts without MIDI.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMidi;

impl MidiAdapter for NoMidi {
    fn request_midi(&self, _request: MidiRequest) -> Result<(), CapabilityError> {
        Err(CapabilityError::MidiUnavailable(
            "no MIDI adapter configured".to_string(),
        ))
    }
}

/// One-shot completion handle given to callback-style acquirers.
#[derive(Debug)]
pub struct MicrophoneCallback {
    tx: oneshot::Sender<Option<MediaStream>>,
}

impl MicrophoneCallback {
    pub fn resolve(self, stream: Option<MediaStream>) {
        if self.tx.send(stream).is_err() {
            debug!("microphone request abandoned before resolution");
        }
    }
}

/// Bridges an acquirer of the form `fn(callback)` onto [`MicrophoneAdapter`].
pub struct CallbackMicrophone<F> {
    acquire: F,
}

/// Build a [`MicrophoneAdapter`] from a callback-style acquirer.
pub fn callback_microphone<F>(acquire: F) -> CallbackMicrophone<F>
where
    F: Fn(MicrophoneCallback) + Send + Sync,
{
    CallbackMicrophone { acquire }
}

#[async_trait]
impl<F> MicrophoneAdapter for CallbackMicrophone<F>
where
    F: Fn(MicrophoneCallback) + Send + Sync,
{
    async fn request_stream(&self) -> Option<MediaStream> {
        let (tx, rx) = oneshot::channel();
        (self.acquire)(MicrophoneCallback { tx });
        match rx.await {
            Ok(stream) => stream,
            Err(_) => {
                warn!("microphone acquirer dropped its callback; continuing without input");
                None
            }
        }
    }
}

#[cfg(feature = "midi")]
pub use midir_adapter::MidirAdapter;

#[cfg(feature = "midi")]
mod midir_adapter {
    use std::sync::Mutex;

    use midir::{MidiInput, MidiInputConnection};
    use tracing::{info, warn};

    use super::{MidiAdapter, MidiRequest};
    use crate::error::CapabilityError;

    /// Connects every available MIDI input port through midir.
    ///
    /// Connections stay open until the adapter is dropped.
    pub struct MidirAdapter {
        client_name: String,
        connections: Mutex<Vec<MidiInputConnection<()>>>,
    }

    impl MidirAdapter {
        pub fn new(client_name: impl Into<String>) -> Self {
            Self {
                client_name: client_name.into(),
                connections: Mutex::new(Vec::new()),
            }
        }

        pub fn connection_count(&self) -> usize {
            self.connections.lock().map(|c| c.len()).unwrap_or(0)
        }
    }

    impl MidiAdapter for MidirAdapter {
        fn request_midi(&self, request: MidiRequest) -> Result<(), CapabilityError> {
            let scan = MidiInput::new(&self.client_name)
                .map_err(|e| CapabilityError::MidiUnavailable(e.to_string()))?;
            let port_count = scan.ports().len();
            if port_count == 0 {
                return Err(CapabilityError::MidiUnavailable(
                    "no MIDI input ports".to_string(),
                ));
            }

            let mut opened = Vec::new();
            for index in 0..port_count {
                // Each connect() consumes its MidiInput, so open one per port
                let midi_in = MidiInput::new(&self.client_name)
                    .map_err(|e| CapabilityError::MidiUnavailable(e.to_string()))?;
                let ports = midi_in.ports();
                let Some(port) = ports.get(index) else {
                    continue;
                };
                let name = midi_in
                    .port_name(port)
                    .unwrap_or_else(|_| format!("port {}", index));

                let callback = request.on_midi_message.clone();
                match midi_in.connect(
                    port,
                    "spnbridge-input",
                    move |_timestamp_us, data, _| callback(data),
                    (),
                ) {
                    Ok(connection) => {
                        info!("Opened MIDI input: {}", name);
                        opened.push(connection);
                    }
                    Err(e) => warn!("Failed to open MIDI input {}: {}", name, e),
                }
            }

            if opened.is_empty() {
                return Err(CapabilityError::MidiConnect(
                    "no MIDI input could be opened".to_string(),
                ));
            }

            self.connections
                .lock()
                .map_err(|_| CapabilityError::MidiConnect("connection table poisoned".into()))?
                .extend(opened);
            Ok(())
        }
    }
}
