//! Minimal configuration loading for the spn audio bridge.
//!
//! Configuration is split into three sections:
//!
//! - **Session** (`SessionDefaults`): the audio shape a new session asks
//!   for - sample rate, channel counts, which capabilities to request.
//! - **Realm** (`RealmConfig`): how the isolated worker realm is hosted -
//!   the bootstrap script reference, sandbox flags, frame style.
//! - **Telemetry** (`TelemetryConfig`): log filtering.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/spnbridge/config.toml` (system)
//! 2. `~/.config/spnbridge/config.toml` (user)
//! 3. `./spnbridge.toml` (local override, or the path given on the CLI)
//! 4. Environment variables (`SPNBRIDGE_*`)
//!
//! # Example Config
//!
//! ```toml
//! [session]
//! sample_rate = 48000
//! inputs_count = 2
//! outputs_count = 2
//! auto_connect = true
//! request_input = false
//! request_midi = true
//!
//! [realm]
//! bootstrap_url = "blob:spn-worker.js"
//! sandbox = ["allow-scripts", "allow-same-origin"]
//!
//! [telemetry]
//! log_level = "debug"
//! ```

pub mod infra;
pub mod loader;
pub mod session;

pub use infra::{RealmConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use session::SessionDefaults;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BridgeConfig {
    #[serde(default)]
    pub session: SessionDefaults,

    #[serde(default)]
    pub realm: RealmConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl BridgeConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with an explicit file taking the place of
    /// `./spnbridge.toml`. System and user configs still load first.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = BridgeConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let file_config = loader::load_from_file(&path)?;
            config = loader::merge_configs(config, file_config);
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);
        config.validate()?;

        Ok((config, sources))
    }

    /// Reject values no audio context can be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be non-zero".into()));
        }
        if self.session.outputs_count == 0 {
            return Err(ConfigError::Invalid(
                "outputs_count must be at least 1".into(),
            ));
        }
        if self.realm.bootstrap_url.trim().is_empty() {
            return Err(ConfigError::Invalid("bootstrap_url is empty".into()));
        }
        Ok(())
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# spnbridge configuration\n\n");

        output.push_str("[session]\n");
        output.push_str(&format!("sample_rate = {}\n", self.session.sample_rate));
        output.push_str(&format!("inputs_count = {}\n", self.session.inputs_count));
        output.push_str(&format!("outputs_count = {}\n", self.session.outputs_count));
        output.push_str(&format!("auto_connect = {}\n", self.session.auto_connect));
        output.push_str(&format!("request_input = {}\n", self.session.request_input));
        output.push_str(&format!("request_midi = {}\n", self.session.request_midi));

        output.push_str("\n[realm]\n");
        output.push_str(&format!(
            "bootstrap_url = {}\n",
            quoted(&self.realm.bootstrap_url)
        ));
        output.push_str("sandbox = [");
        let flags: Vec<String> = self
            .realm
            .sandbox
            .iter()
            .map(|f| quoted(f))
            .collect();
        output.push_str(&flags.join(", "));
        output.push_str("]\n");
        output.push_str(&format!("frame_style = {}\n", quoted(&self.realm.frame_style)));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = {}\n",
            quoted(&self.telemetry.log_level)
        ));

        output
    }
}

/// A TOML string literal, escaped.
fn quoted(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}
