// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, ImageClassConfig, CONFIG_FILE_NAME};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Find the configuration file
///
/// Search order:
/// 1. `IMAGECLASS_CONFIG_PATH` environment variable
/// 2. Current working directory: `./imageclass_configuration.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("IMAGECLASS_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by IMAGECLASS_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Configuration file '{}' not found in any of these locations:\n{}\n\nSet IMAGECLASS_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML.
/// Validation is a separate step, see [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<ImageClassConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: ImageClassConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Load configuration, falling back to built-in defaults when no file exists
///
/// An explicitly given `config_path` must exist. Overrides are applied to the
/// defaults exactly as they would be to a loaded file.
pub fn load_config_or_default(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<ImageClassConfig> {
    match load_config(config_path, cli_args) {
        Err(ConfigError::FileNotFound(_)) if config_path.is_none() => {
            let mut config = ImageClassConfig::default();
            apply_environment_overrides(&mut config);
            if let Some(cli) = cli_args {
                apply_cli_overrides(&mut config, cli);
            }
            Ok(config)
        }
        other => other,
    }
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `IMAGECLASS_BACKEND` -> `runtime.backend`
/// - `IMAGECLASS_DEVICE_TYPE` -> `runtime.device_type`
/// - `IMAGECLASS_POWER_PREFERENCE` -> `runtime.power_preference`
/// - `IMAGECLASS_NUM_THREADS` -> `runtime.num_threads`
/// - `IMAGECLASS_MODEL` -> `model.name`
/// - `IMAGECLASS_DATA_TYPE` -> `model.data_type`
/// - `IMAGECLASS_NUM_RUNS` -> `benchmark.num_runs`
/// - `IMAGECLASS_LABELS_DIR` -> `labels.dir`
/// - `IMAGECLASS_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut ImageClassConfig) {
    // Runtime settings
    if let Ok(value) = env::var("IMAGECLASS_BACKEND") {
        config.runtime.backend = value;
    }
    if let Ok(value) = env::var("IMAGECLASS_DEVICE_TYPE") {
        config.runtime.device_type = value;
    }
    if let Ok(value) = env::var("IMAGECLASS_POWER_PREFERENCE") {
        config.runtime.power_preference = Some(value);
    }
    if let Ok(value) = env::var("IMAGECLASS_NUM_THREADS") {
        if let Ok(threads) = value.parse::<u32>() {
            config.runtime.num_threads = Some(threads);
        }
    }

    // Model settings
    if let Ok(value) = env::var("IMAGECLASS_MODEL") {
        config.model.name = Some(value);
    }
    if let Ok(value) = env::var("IMAGECLASS_DATA_TYPE") {
        config.model.data_type = value;
    }

    if let Ok(value) = env::var("IMAGECLASS_NUM_RUNS") {
        if let Ok(runs) = value.parse::<u32>() {
            config.benchmark.num_runs = runs;
        }
    }

    if let Ok(value) = env::var("IMAGECLASS_LABELS_DIR") {
        config.labels.dir = PathBuf::from(value);
    }

    if let Ok(value) = env::var("IMAGECLASS_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"device_type": "gpu", "num_runs": "5"}`)
pub fn apply_cli_overrides(config: &mut ImageClassConfig, cli_args: &HashMap<String, String>) {
    // Runtime settings
    if let Some(value) = cli_args.get("backend") {
        config.runtime.backend = value.clone();
    }
    if let Some(value) = cli_args.get("device_type") {
        config.runtime.device_type = value.clone();
    }
    if let Some(value) = cli_args.get("power_preference") {
        config.runtime.power_preference = Some(value.clone());
    }
    if let Some(value) = cli_args.get("num_threads") {
        if let Ok(threads) = value.parse::<u32>() {
            config.runtime.num_threads = Some(threads);
        }
    }

    // Model settings
    if let Some(value) = cli_args.get("model") {
        config.model.name = Some(value.clone());
    }
    if let Some(value) = cli_args.get("data_type") {
        config.model.data_type = value.clone();
    }
    if let Some(value) = cli_args.get("layout") {
        config.model.layout = Some(value.clone());
    }

    if let Some(value) = cli_args.get("num_runs") {
        if let Ok(runs) = value.parse::<u32>() {
            config.benchmark.num_runs = runs;
        }
    }

    if let Some(value) = cli_args.get("labels_dir") {
        config.labels.dir = PathBuf::from(value);
    }

    // Render loop
    if let Some(value) = cli_args.get("tick_interval_ms") {
        if let Ok(ms) = value.parse::<u64>() {
            config.render.tick_interval_ms = ms;
        }
    }
    if let Some(value) = cli_args.get("stop_timeout_ms") {
        if let Ok(ms) = value.parse::<u64>() {
            config.render.stop_timeout_ms = Some(ms);
        }
    }

    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("IMAGECLASS_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("IMAGECLASS_CONFIG_PATH");

        assert!(result.is_ok());
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("does_not_exist.toml");

        env::set_var("IMAGECLASS_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("IMAGECLASS_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let saved_runs = env::var("IMAGECLASS_NUM_RUNS").ok();
        env::remove_var("IMAGECLASS_NUM_RUNS");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[runtime]").unwrap();
        writeln!(file, "device_type = \"npu\"").unwrap();
        writeln!(file, "[benchmark]").unwrap();
        writeln!(file, "num_runs = 20").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.runtime.device_type, "npu");
        assert_eq!(config.benchmark.num_runs, 20);

        if let Some(value) = saved_runs {
            env::set_var("IMAGECLASS_NUM_RUNS", value);
        }
    }

    #[test]
    fn test_load_or_default_without_file() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let saved_cwd = env::current_dir().unwrap();
        let dir = tempdir().unwrap();
        env::set_current_dir(dir.path()).unwrap();
        env::remove_var("IMAGECLASS_CONFIG_PATH");

        let mut cli_args = HashMap::new();
        cli_args.insert("num_runs".to_string(), "3".to_string());
        let result = load_config_or_default(None, Some(&cli_args));

        env::set_current_dir(saved_cwd).unwrap();

        let config = result.unwrap();
        assert_eq!(config.benchmark.num_runs, 3);
        assert_eq!(config.runtime.backend, "polyfill");
    }

    #[test]
    fn test_load_or_default_explicit_path_must_exist() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let result = load_config_or_default(Some(&missing), None);
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = ImageClassConfig::default();

        env::set_var("IMAGECLASS_DEVICE_TYPE", "gpu");
        env::set_var("IMAGECLASS_NUM_THREADS", "4");
        env::set_var("IMAGECLASS_NUM_RUNS", "not-a-number");

        apply_environment_overrides(&mut config);

        env::remove_var("IMAGECLASS_DEVICE_TYPE");
        env::remove_var("IMAGECLASS_NUM_THREADS");
        env::remove_var("IMAGECLASS_NUM_RUNS");

        assert_eq!(config.runtime.device_type, "gpu");
        assert_eq!(config.runtime.num_threads, Some(4));
        // Unparseable values leave the previous setting in place
        assert_eq!(config.benchmark.num_runs, 1);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = ImageClassConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("backend".to_string(), "webnn".to_string());
        cli_args.insert("model".to_string(), "squeezenet".to_string());
        cli_args.insert("layout".to_string(), "nhwc".to_string());

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.runtime.backend, "webnn");
        assert_eq!(config.model.name.as_deref(), Some("squeezenet"));
        assert_eq!(config.model.layout.as_deref(), Some("nhwc"));
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[runtime]").unwrap();
        writeln!(file, "backend = \"polyfill\"").unwrap();
        writeln!(file, "device_type = \"cpu\"").unwrap();

        env::set_var("IMAGECLASS_BACKEND", "webnn");
        env::set_var("IMAGECLASS_DEVICE_TYPE", "gpu");

        let mut cli_args = HashMap::new();
        cli_args.insert("device_type".to_string(), "npu".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("IMAGECLASS_BACKEND");
        env::remove_var("IMAGECLASS_DEVICE_TYPE");

        // CLI wins for device, env wins for backend (no CLI override)
        assert_eq!(config.runtime.device_type, "npu");
        assert_eq!(config.runtime.backend, "webnn");
    }
}
