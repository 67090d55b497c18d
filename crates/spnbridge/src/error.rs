//! Error taxonomy for the bridge.
//!
//! None of these reach the caller of `SessionController::initialize`; they
//! are logged there. `try_initialize` hands them to Rust callers that want
//! to branch on the failure.

use spnproto::ProxyError;
use thiserror::Error;

/// Failures while bringing a session up or tearing it down.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The host cannot mount a document, so no realm can exist.
    #[error("cannot run outside a document-capable host")]
    Environment,

    /// The realm never became available.
    #[error("realm failed to load: {0}")]
    RealmLoad(String),

    /// The channel bundle is incomplete; nothing was sent.
    #[error("channel bundle is missing: {}", .0.join(", "))]
    MissingChannel(Vec<&'static str>),

    /// A supplied audio context could not be used as-is.
    #[error("audio context unusable: {0}")]
    ContextState(String),

    /// Closing an audio context failed.
    #[error("failed to close audio context: {0}")]
    Close(#[from] AudioError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Host-side mounting failures.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("host has no document to mount into")]
    NoDocument,

    #[error("failed to mount frame: {0}")]
    MountFailed(String),
}

/// Errors raised by platform audio objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AudioError(pub String);

/// Errors from capability adapters.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("MIDI unavailable: {0}")]
    MidiUnavailable(String),

    #[error("MIDI connection failed: {0}")]
    MidiConnect(String),
}
