//! Configuration validation
//!
//! This module provides validation logic to ensure configuration values are
//! within the sets the session layer understands and within valid ranges.

use crate::{ConfigError, ConfigResult, ImageClassConfig};

const BACKENDS: &[&str] = &["webnn", "polyfill"];
const DEVICE_TYPES: &[&str] = &["cpu", "gpu", "npu"];
const DATA_TYPES: &[&str] = &["float32", "float16"];
const LAYOUTS: &[&str] = &["nchw", "nhwc"];
const POWER_PREFERENCES: &[&str] = &["default", "high-performance", "low-power"];
const MODELS: &[&str] = &[
    "mobilenet",
    "squeezenet",
    "resnet50",
    "resnet50v1",
    "efficientnet",
];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    UnknownChoice {
        field: String,
        value: String,
        allowed: &'static [&'static str],
    },
    MissingRequired {
        field: String,
    },
    InvalidValue {
        field: String,
        reason: String,
    },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownChoice {
                field,
                value,
                allowed,
            } => {
                write!(
                    f,
                    "{} = '{}' is not one of: {}",
                    field,
                    value,
                    allowed.join(", ")
                )
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Known backend / device / precision / layout / model identifiers
/// - Positive run counts, thread counts and intervals
/// - Required fields
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation found
pub fn validate_config(config: &ImageClassConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_choices(config, &mut errors);
    validate_required_fields(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn check_choice(
    field: &str,
    value: &str,
    allowed: &'static [&'static str],
    errors: &mut Vec<ConfigValidationError>,
) {
    if !allowed.contains(&value) {
        errors.push(ConfigValidationError::UnknownChoice {
            field: field.to_string(),
            value: value.to_string(),
            allowed,
        });
    }
}

/// Validate string-typed enumerations against the supported identifiers
fn validate_choices(config: &ImageClassConfig, errors: &mut Vec<ConfigValidationError>) {
    check_choice("runtime.backend", &config.runtime.backend, BACKENDS, errors);
    check_choice(
        "runtime.device_type",
        &config.runtime.device_type,
        DEVICE_TYPES,
        errors,
    );
    if let Some(preference) = &config.runtime.power_preference {
        check_choice(
            "runtime.power_preference",
            preference,
            POWER_PREFERENCES,
            errors,
        );
    }
    check_choice("model.data_type", &config.model.data_type, DATA_TYPES, errors);
    if let Some(layout) = &config.model.layout {
        check_choice("model.layout", layout, LAYOUTS, errors);
    }
    if let Some(name) = &config.model.name {
        check_choice("model.name", name, MODELS, errors);
    }
}

fn validate_required_fields(config: &ImageClassConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.labels.dir.as_os_str().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "labels.dir".to_string(),
        });
    }

    if config.logging.level.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "logging.level".to_string(),
        });
    }
}

fn validate_value_ranges(config: &ImageClassConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.benchmark.num_runs == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "benchmark.num_runs".to_string(),
            reason: "must be a positive integer".to_string(),
        });
    }

    if config.runtime.num_threads == Some(0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "runtime.num_threads".to_string(),
            reason: "must be a positive integer".to_string(),
        });
    }

    if config.render.tick_interval_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "render.tick_interval_ms".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    if config.render.stop_timeout_ms == Some(0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "render.stop_timeout_ms".to_string(),
            reason: "must be positive when set".to_string(),
        });
    }
}
