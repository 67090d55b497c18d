//! Session defaults - the audio shape a freshly initialized session asks for.

use serde::{Deserialize, Serialize};

/// Audio shape and capability requests for new sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionDefaults {
    /// Sample rate the audio context must run at.
    /// Default: 44100
    #[serde(default = "SessionDefaults::default_sample_rate")]
    pub sample_rate: u32,

    /// Input channel count handed to the worker.
    /// Default: 2
    #[serde(default = "SessionDefaults::default_channels")]
    pub inputs_count: u32,

    /// Output channel count handed to the worker.
    /// Default: 2
    #[serde(default = "SessionDefaults::default_channels")]
    pub outputs_count: u32,

    /// Whether the worker connects its node to the context destination.
    /// Default: true
    #[serde(default = "SessionDefaults::default_auto_connect")]
    pub auto_connect: bool,

    /// Acquire a microphone stream during initialization.
    #[serde(default)]
    pub request_input: bool,

    /// Register a MIDI input listener after initialization.
    #[serde(default)]
    pub request_midi: bool,
}

impl SessionDefaults {
    fn default_sample_rate() -> u32 {
        44100
    }

    fn default_channels() -> u32 {
        2
    }

    fn default_auto_connect() -> bool {
        true
    }
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            sample_rate: Self::default_sample_rate(),
            inputs_count: Self::default_channels(),
            outputs_count: Self::default_channels(),
            auto_connect: Self::default_auto_connect(),
            request_input: false,
            request_midi: false,
        }
    }
}
