//! spnproto - Protocol types for the spn audio bridge
//!
//! This crate defines everything that crosses the boundary between the
//! controlling side and the isolated worker realm:
//!
//! - [`PlayState`]: lifecycle states mirrored into the realm
//! - [`ContextUid`]: the per-session identifier and the global keys derived from it
//! - [`MessagePort`]: a linear channel endpoint that can be owned by exactly
//!   one side at a time and is moved, never copied, across the boundary
//! - [`InitializePayload`] / [`SetPlayStatePayload`]: the two remote calls
//! - [`RemoteProxy`]: typed request/response proxy over a [`MessageEndpoint`]
//! - [`EndpointListener`]: the serving half, used by realm implementations
//!
//! ## Transfers
//!
//! Ports never appear inside a serialized payload. A payload field that
//! names a port holds a [`PortRef`], an index into the transfer list that
//! travels next to the payload. Building a [`Transfer`] consumes the ports,
//! so the sender cannot touch them once the call is posted.

pub mod context;
pub mod endpoint;
pub mod envelope;
pub mod payload;
pub mod play_state;
pub mod port;
pub mod proxy;

pub use context::ContextUid;
pub use endpoint::{
    channel_endpoint, ChannelEndpoint, EndpointListener, IncomingCall, MessageEndpoint,
};
pub use envelope::{CallOutcome, RemoteCall, RemoteReply};
pub use payload::{InitializePayload, PortRef, SetPlayStatePayload, Transfer};
pub use play_state::{ParsePlayStateError, PlayState};
pub use port::{IpcMessagePorts, MessageChannel, MessagePort, PortClosed};
pub use proxy::{ProxyError, RemoteProxy};

/// Ring size the worker allocates for hardware-side buffering.
pub const HARDWARE_BUFFER_SIZE: u32 = 32768;

/// Block size the worker renders per callback.
pub const SOFTWARE_BUFFER_SIZE: u32 = 2048;

/// Remote method names understood by the worker realm.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const SET_PLAY_STATE: &str = "setPlayState";
}
