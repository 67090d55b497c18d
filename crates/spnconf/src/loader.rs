//! Config file discovery, loading, and environment variable overlay.

use crate::{BridgeConfig, ConfigError, RealmConfig, SessionDefaults, TelemetryConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/spnbridge/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("spnbridge/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("spnbridge.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

fn parse_toml(contents: &str, path: &Path) -> Result<BridgeConfig, ConfigError> {
    toml::from_str(contents).map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Pick `overlay` when it differs from the compiled default, else keep `base`.
fn pick<T: PartialEq>(base: T, overlay: T, default: T) -> T {
    if overlay != default {
        overlay
    } else {
        base
    }
}

/// Merge two configs, with `overlay` taking precedence field by field.
///
/// A field the overlay file left at its default does not clobber a value
/// set by an earlier file.
pub fn merge_configs(base: BridgeConfig, overlay: BridgeConfig) -> BridgeConfig {
    let session_default = SessionDefaults::default();
    let realm_default = RealmConfig::default();
    let telemetry_default = TelemetryConfig::default();

    BridgeConfig {
        session: SessionDefaults {
            sample_rate: pick(
                base.session.sample_rate,
                overlay.session.sample_rate,
                session_default.sample_rate,
            ),
            inputs_count: pick(
                base.session.inputs_count,
                overlay.session.inputs_count,
                session_default.inputs_count,
            ),
            outputs_count: pick(
                base.session.outputs_count,
                overlay.session.outputs_count,
                session_default.outputs_count,
            ),
            auto_connect: pick(
                base.session.auto_connect,
                overlay.session.auto_connect,
                session_default.auto_connect,
            ),
            request_input: pick(
                base.session.request_input,
                overlay.session.request_input,
                session_default.request_input,
            ),
            request_midi: pick(
                base.session.request_midi,
                overlay.session.request_midi,
                session_default.request_midi,
            ),
        },
        realm: RealmConfig {
            bootstrap_url: pick(
                base.realm.bootstrap_url,
                overlay.realm.bootstrap_url,
                realm_default.bootstrap_url,
            ),
            sandbox: pick(base.realm.sandbox, overlay.realm.sandbox, realm_default.sandbox),
            frame_style: pick(
                base.realm.frame_style,
                overlay.realm.frame_style,
                realm_default.frame_style,
            ),
        },
        telemetry: TelemetryConfig {
            log_level: pick(
                base.telemetry.log_level,
                overlay.telemetry.log_level,
                telemetry_default.log_level,
            ),
        },
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut BridgeConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Same as [`apply_env_overrides`] with an injectable lookup, so tests
/// don't have to mutate the process environment.
pub fn apply_overrides_from<F>(config: &mut BridgeConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("SPNBRIDGE_SAMPLE_RATE") {
        if let Ok(rate) = v.parse() {
            config.session.sample_rate = rate;
            sources.env_overrides.push("SPNBRIDGE_SAMPLE_RATE".to_string());
        }
    }
    if let Some(v) = lookup("SPNBRIDGE_INPUTS") {
        if let Ok(count) = v.parse() {
            config.session.inputs_count = count;
            sources.env_overrides.push("SPNBRIDGE_INPUTS".to_string());
        }
    }
    if let Some(v) = lookup("SPNBRIDGE_OUTPUTS") {
        if let Ok(count) = v.parse() {
            config.session.outputs_count = count;
            sources.env_overrides.push("SPNBRIDGE_OUTPUTS".to_string());
        }
    }
    if let Some(v) = lookup("SPNBRIDGE_AUTO_CONNECT").as_deref().and_then(parse_bool) {
        config.session.auto_connect = v;
        sources.env_overrides.push("SPNBRIDGE_AUTO_CONNECT".to_string());
    }
    if let Some(v) = lookup("SPNBRIDGE_REQUEST_INPUT").as_deref().and_then(parse_bool) {
        config.session.request_input = v;
        sources.env_overrides.push("SPNBRIDGE_REQUEST_INPUT".to_string());
    }
    if let Some(v) = lookup("SPNBRIDGE_REQUEST_MIDI").as_deref().and_then(parse_bool) {
        config.session.request_midi = v;
        sources.env_overrides.push("SPNBRIDGE_REQUEST_MIDI".to_string());
    }

    if let Some(v) = lookup("SPNBRIDGE_BOOTSTRAP_URL") {
        config.realm.bootstrap_url = v;
        sources.env_overrides.push("SPNBRIDGE_BOOTSTRAP_URL".to_string());
    }

    if let Some(v) = lookup("SPNBRIDGE_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("SPNBRIDGE_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
[session]
sample_rate = 48000
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.session.sample_rate, 48000);
        // Other values should be defaults
        assert_eq!(config.session.inputs_count, 2);
        assert_eq!(config.realm.bootstrap_url, "spn-worker.js");
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[session]
sample_rate = 96000
inputs_count = 1
outputs_count = 6
auto_connect = false
request_input = true
request_midi = true

[realm]
bootstrap_url = "blob:worker"
sandbox = ["allow-scripts"]

[telemetry]
log_level = "debug"
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();

        assert_eq!(config.session.sample_rate, 96000);
        assert_eq!(config.session.inputs_count, 1);
        assert_eq!(config.session.outputs_count, 6);
        assert!(!config.session.auto_connect);
        assert!(config.session.request_input);
        assert!(config.session.request_midi);
        assert_eq!(config.realm.bootstrap_url, "blob:worker");
        assert_eq!(config.realm.sandbox, vec!["allow-scripts".to_string()]);
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = parse_toml("[session\n", Path::new("broken.toml")).unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, PathBuf::from("broken.toml")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_merge_keeps_earlier_non_default() {
        let mut base = BridgeConfig::default();
        base.session.sample_rate = 48000;
        let mut overlay = BridgeConfig::default();
        overlay.telemetry.log_level = "trace".to_string();

        let merged = merge_configs(base, overlay);
        assert_eq!(merged.session.sample_rate, 48000);
        assert_eq!(merged.telemetry.log_level, "trace");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SPNBRIDGE_SAMPLE_RATE", "22050"),
            ("SPNBRIDGE_REQUEST_MIDI", "yes"),
            ("SPNBRIDGE_OUTPUTS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = BridgeConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_from(&mut config, &mut sources, |k| {
            vars.get(k).map(|v| v.to_string())
        });

        assert_eq!(config.session.sample_rate, 22050);
        assert!(config.session.request_midi);
        assert_eq!(config.session.outputs_count, 2);
        assert_eq!(
            sources.env_overrides,
            vec!["SPNBRIDGE_SAMPLE_RATE", "SPNBRIDGE_REQUEST_MIDI"]
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\noutputs_count = 4").unwrap();

        let config = load_from_file(file.path()).unwrap();
        assert_eq!(config.session.outputs_count, 4);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load_from_file(Path::new("/nonexistent/spnbridge.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
