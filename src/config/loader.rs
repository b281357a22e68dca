//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;
use uuid::Uuid;

use crate::config::schema::{ClientSettings, ServiceConfig};
use crate::config::validation::{
    validate_config, validate_request, validate_retry_options, ValidationError,
};

/// Placeholder in the settings document replaced by each request's correlation id.
pub const ID_TOKEN: &str = "{{ id }}";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate service configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ServiceConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Read the raw client settings document.
///
/// The text is kept unparsed so [`render_settings`] can substitute the
/// correlation token once per logical request.
pub fn read_settings(path: &Path) -> Result<String, ConfigError> {
    Ok(fs::read_to_string(path)?)
}

/// Substitute `correlation_id` for every [`ID_TOKEN`] in `raw`, then parse and
/// validate the result.
pub fn render_settings(raw: &str, correlation_id: &Uuid) -> Result<ClientSettings, ConfigError> {
    let rendered = raw.replace(ID_TOKEN, &correlation_id.to_string());
    let settings: ClientSettings = serde_json::from_str(&rendered)?;

    let mut errors = Vec::new();
    if let Err(e) = validate_retry_options(&settings.retry) {
        errors.extend(e);
    }
    if let Err(e) = validate_request(&settings.request) {
        errors.extend(e);
    }
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors));
    }

    Ok(settings)
}
