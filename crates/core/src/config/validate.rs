use std::collections::HashSet;

use super::{
    types::{AuthMethod, Config},
    ConfigError,
};

/// Largest UTC offset in use anywhere (UTC+14:00), in minutes.
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde)
/// - API key auth has at least one key
/// - Server port is not 0
/// - Branch UTC offset is a real-world offset
/// - At least one counter, with unique ids
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.auth.method == AuthMethod::ApiKey && config.auth.api_keys.is_empty() {
        return Err(ConfigError::ValidationError(
            "auth.api_keys must not be empty when auth.method = \"api_key\"".to_string(),
        ));
    }

    if config.auth.api_keys.iter().any(|entry| entry.key.is_empty()) {
        return Err(ConfigError::ValidationError(
            "auth.api_keys entries must have a non-empty key".to_string(),
        ));
    }

    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.branch.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return Err(ConfigError::ValidationError(format!(
            "branch.utc_offset_minutes must be within ±{}",
            MAX_UTC_OFFSET_MINUTES
        )));
    }

    if config.counters.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one counter must be configured".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for counter in &config.counters {
        if !seen.insert(counter.id) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate counter id: {}",
                counter.id
            )));
        }
    }

    Ok(())
}
