//! spnbridge - Session bridge into a sandboxed audio worker realm
//!
//! The controlling side of an audio session whose processing runs inside a
//! separately loaded realm:
//!
//! - **Realm** ([`realm`], [`host`]): mounts the hosting frame into a
//!   document-capable [`Host`] and keeps at most one realm and proxy alive
//! - **Ports** ([`ports`]): packages the three linear channels into the
//!   `initialize` transfer
//! - **Controller** ([`controller`]): session ids, audio context resolution,
//!   and the play-state machine mirrored into the realm
//! - **Capabilities** ([`capabilities`]): microphone and MIDI acquisition
//! - **Loopback** ([`loopback`]): an in-process host and worker for the CLI
//!   and tests
//!
//! Bindings the realm needs (the audio context, the worker's node) live in a
//! [`GlobalScope`] with a realm side and a parent side, since hosts differ in
//! which side the realm resolves globals from.

pub mod audio;
pub mod capabilities;
pub mod controller;
pub mod engine;
pub mod error;
pub mod globals;
pub mod host;
pub mod loopback;
pub mod ports;
pub mod realm;

pub use audio::{AudioContext, AudioContextFactory, AudioNode, ContextState, MediaStream};
pub use capabilities::{
    callback_microphone, MicrophoneAdapter, MicrophoneCallback, MidiAdapter, MidiCallback,
    MidiRequest, NoMicrophone, NoMidi,
};
#[cfg(feature = "midi")]
pub use capabilities::MidirAdapter;
pub use controller::{Phase, SessionController, SessionOptions, SessionSnapshot};
pub use engine::{EngineHandle, MidiInputHandler, PublicEvents, ReleaseLatch, ReleaseSignals};
pub use error::{AudioError, BridgeError, CapabilityError, HostError};
pub use globals::{Binding, GlobalScope, Side};
pub use host::{FrameSpec, Host, MountId, MountedFrame, RealmWindow};
pub use ports::{ChannelSet, InitializeShape};
pub use realm::{RealmContext, RealmLoader};
