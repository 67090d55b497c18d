//! Realm hosting and telemetry configuration.

use serde::{Deserialize, Serialize};

/// How the isolated worker realm is hosted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealmConfig {
    /// Reference to the pre-built worker bootstrap script, embedded as the
    /// `src` of the hosting document's only script tag.
    /// Default: spn-worker.js
    #[serde(default = "RealmConfig::default_bootstrap_url")]
    pub bootstrap_url: String,

    /// Sandbox flags applied to the hosting frame.
    /// Default: ["allow-scripts", "allow-same-origin"]
    #[serde(default = "RealmConfig::default_sandbox")]
    pub sandbox: Vec<String>,

    /// Inline style keeping the frame out of view.
    #[serde(default = "RealmConfig::default_frame_style")]
    pub frame_style: String,
}

impl RealmConfig {
    fn default_bootstrap_url() -> String {
        "spn-worker.js".to_string()
    }

    fn default_sandbox() -> Vec<String> {
        vec!["allow-scripts".to_string(), "allow-same-origin".to_string()]
    }

    fn default_frame_style() -> String {
        "position:absolute;left:0;top:-999px;width:1px;height:1px;".to_string()
    }
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self {
            bootstrap_url: Self::default_bootstrap_url(),
            sandbox: Self::default_sandbox(),
            frame_style: Self::default_frame_style(),
        }
    }
}

/// Telemetry and observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryConfig {
    /// Log filter (trace, debug, info, warn, error, or an env-filter directive).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
