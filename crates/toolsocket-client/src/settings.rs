//! Client settings with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`ClientSettings::default()`]
//! 2. **Settings file** — JSON, deep-merged over defaults
//! 3. **Environment variables** — `TOOLSOCKET_*` overrides (highest)
//!
//! The expected-message list is the configuration value that drives the
//! registry audit; deployments describe the server message set here
//! instead of generating per-deployment client variants.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::registry::MessageTypeDescriptor;

/// Errors that can occur when loading or parsing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Configuration for one client session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Pre-built endpoint locator to dial.
    pub endpoint: String,
    /// Message types the server is expected to send; drives the
    /// registry audit.
    pub expected_messages: Vec<MessageTypeDescriptor>,
    /// Depth of the outbound frame queue.
    pub send_queue_depth: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8080/socket".to_owned(),
            expected_messages: Vec::new(),
            send_queue_depth: 64,
        }
    }
}

/// Load settings from a JSON file with env var overrides.
///
/// If the file does not exist, returns defaults (plus env overrides).
/// If the file contains invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<ClientSettings> {
    let defaults = serde_json::to_value(ClientSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: ClientSettings = serde_json::from_value(merged)?;
    apply_env_overrides_from(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
#[must_use]
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides from the given lookup.
///
/// Strict parsing: integers must be valid and in range; invalid values
/// are silently ignored (falling back to file/default).
fn apply_env_overrides_from(
    settings: &mut ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("TOOLSOCKET_ENDPOINT") {
        if !v.is_empty() {
            settings.endpoint = v;
        }
    }
    if let Some(v) = lookup("TOOLSOCKET_SEND_QUEUE_DEPTH") {
        if let Ok(depth) = v.parse::<usize>() {
            if (1..=65_536).contains(&depth) {
                settings.send_queue_depth = depth;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write as _;

    #[test]
    fn defaults_are_sensible() {
        let settings = ClientSettings::default();
        assert_eq!(settings.endpoint, "ws://127.0.0.1:8080/socket");
        assert!(settings.expected_messages.is_empty());
        assert_eq!(settings.send_queue_depth, 64);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, ClientSettings::default());
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            "{{\"endpoint\": \"wss://tools.example/socket\", \
               \"expectedMessages\": [{{\"typeName\": \"ResourceChanged\"}}]}}"
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.endpoint, "wss://tools.example/socket");
        assert_eq!(
            settings.expected_messages,
            vec![MessageTypeDescriptor::named("ResourceChanged")]
        );
        // Unmentioned keys keep their defaults.
        assert_eq!(settings.send_queue_depth, 64);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_matches!(load_settings_from_path(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn env_overrides_take_priority() {
        let mut settings = ClientSettings::default();
        apply_env_overrides_from(&mut settings, |name| match name {
            "TOOLSOCKET_ENDPOINT" => Some("ws://override.example/ws".to_owned()),
            "TOOLSOCKET_SEND_QUEUE_DEPTH" => Some("128".to_owned()),
            _ => None,
        });
        assert_eq!(settings.endpoint, "ws://override.example/ws");
        assert_eq!(settings.send_queue_depth, 128);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = ClientSettings::default();
        apply_env_overrides_from(&mut settings, |name| match name {
            "TOOLSOCKET_ENDPOINT" => Some(String::new()),
            "TOOLSOCKET_SEND_QUEUE_DEPTH" => Some("zero".to_owned()),
            _ => None,
        });
        assert_eq!(settings, ClientSettings::default());
    }

    #[test]
    fn out_of_range_queue_depth_is_ignored() {
        let mut settings = ClientSettings::default();
        apply_env_overrides_from(&mut settings, |name| {
            (name == "TOOLSOCKET_SEND_QUEUE_DEPTH").then(|| "0".to_owned())
        });
        assert_eq!(settings.send_queue_depth, 64);
    }

    #[test]
    fn deep_merge_nested_objects() {
        let target = serde_json::json!({"a": {"x": 1, "y": 2}, "b": [1, 2]});
        let source = serde_json::json!({"a": {"y": 3}, "b": [9], "c": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged, serde_json::json!({"a": {"x": 1, "y": 3}, "b": [9]}));
    }
}
