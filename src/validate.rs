//! Tool/preset existence checks.
use crate::config::ConfigStore;
use crate::error::KitError;

/// True iff `tool` has a config and one of its presets is named exactly `preset`.
///
/// A missing or unreadable tool config is a validation failure, never an
/// error. The config is re-read on every call.
pub fn validate_command(store: &ConfigStore, tool: &str, preset: &str) -> bool {
    if tool.trim().is_empty() || preset.trim().is_empty() {
        return false;
    }
    match store.load_tool(tool) {
        Ok(config) => config.preset(preset).is_some(),
        Err(KitError::ConfigFileNotFound { .. }) => false,
        Err(err) => {
            tracing::debug!(tool, error = %err, "tool config unusable during validation");
            false
        }
    }
}
