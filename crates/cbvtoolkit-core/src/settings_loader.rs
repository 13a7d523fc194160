//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `CBV_DEBUG` | `debug` |
//! | `CBV_LOG_LEVEL` | `log_level` |
//! | `CBV_BIND_ADDRESS` | `bind_address` |
//! | `CBV_MAX_BODY_SIZE` | `max_body_size` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use cbvtoolkit_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/settings.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::ToolkitError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Keys absent from the TOML keep their default values, including keys of
/// nested tables.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, ToolkitError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| ToolkitError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    let overrides = serde_json::to_value(toml_value).map_err(|e| {
        ToolkitError::ConfigurationError(format!("Failed to convert TOML: {e}"))
    })?;
    let defaults = serde_json::to_value(Settings::default()).map_err(|e| {
        ToolkitError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    serde_json::from_value(merge_json(defaults, overrides)).map_err(|e| {
        ToolkitError::ConfigurationError(format!("Failed to deserialize settings from TOML: {e}"))
    })
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, ToolkitError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        ToolkitError::ConfigurationError(format!(
            "Failed to read TOML file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, ToolkitError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `CBV_*` environment variable overrides to a settings struct.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides_from(settings, |key| std::env::var(key).ok());
}

fn apply_overrides_from(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("CBV_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Some(val) = lookup("CBV_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("CBV_BIND_ADDRESS") {
        settings.bind_address = val;
    }

    if let Some(val) = lookup("CBV_MAX_BODY_SIZE") {
        match val.trim().parse() {
            Ok(size) => settings.max_body_size = size,
            Err(_) => tracing::warn!(value = %val, "ignoring invalid CBV_MAX_BODY_SIZE"),
        }
    }
}

/// Recursively merges `overrides` into `base`. Objects merge key by key;
/// any other value in `overrides` replaces the base value.
fn merge_json(base: serde_json::Value, overrides: serde_json::Value) -> serde_json::Value {
    match (base, overrides) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, value) in override_map {
                let merged = match base_map.remove(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => value,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, overrides) => overrides,
    }
}
