// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `imageclass_configuration.toml`. Values stay string-typed here; the
//! session crate parses them into its enums.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageClassConfig {
    pub runtime: RuntimeConfig,
    pub model: ModelConfig,
    pub benchmark: BenchmarkConfig,
    pub labels: LabelsConfig,
    pub render: RenderConfig,
    pub logging: LoggingConfig,
}

/// Execution backend and context options handed to the inference runtime
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// "webnn" or "polyfill"
    pub backend: String,
    /// "cpu", "gpu" or "npu"
    pub device_type: String,
    /// "default", "high-performance" or "low-power"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_preference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_threads: Option<u32>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backend: "polyfill".to_string(),
            device_type: "cpu".to_string(),
            power_preference: None,
            num_threads: None,
        }
    }
}

/// Initial model selection
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model id ("mobilenet", "squeezenet", ...). `None` waits for a selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// "float32" or "float16"
    pub data_type: String,
    /// "nchw" or "nhwc". `None` picks the device default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: None,
            data_type: "float32".to_string(),
            layout: None,
        }
    }
}

/// Latency measurement settings for image mode
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Timed compute runs after the warm-up. Median is reported when > 1.
    pub num_runs: u32,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self { num_runs: 1 }
    }
}

/// Label file resolution
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LabelsConfig {
    /// Directory that model label URLs are resolved against
    pub dir: PathBuf,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./"),
        }
    }
}

/// Continuous (camera) mode render loop
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Delay between ticks when a frame was not ready or after a compute
    pub tick_interval_ms: u64,
    /// Upper bound for waiting on an in-flight compute when stopping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_timeout_ms: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            stop_timeout_ms: Some(10_000),
        }
    }
}

/// Logging setup consumed by `imageclass-observability`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_logging: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_dir: None,
        }
    }
}
