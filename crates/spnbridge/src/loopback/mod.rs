//! In-process host, worker and audio objects.
//!
//! Used by the `spnbridge` binary and the test suite to drive the full
//! session lifecycle without a browser.

mod audio;
mod host;
mod ports;
mod worker;

pub use audio::{LoopbackContext, LoopbackContextFactory, LoopbackNode};
pub use host::{LoadBehavior, LoopbackHost};
pub use ports::port_bundle;
pub use worker::{LoopbackWorker, RecordedCall, WorkerJournal};
