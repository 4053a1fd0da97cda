//! Command-line arguments

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use imageclass_session::{ClassifyResult, InputKind};

/// imageclass - classify images with a selectable model, backend and device
#[derive(Parser, Debug, Clone)]
#[command(name = "imageclass", version, author, long_about = None)]
pub struct Args {
    /// Path to the configuration file (default: search for imageclass_configuration.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Model to run (mobilenet, squeezenet, resnet50, resnet50v1, efficientnet)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Execution backend (webnn, polyfill)
    #[arg(long)]
    pub backend: Option<String>,

    /// Device type (cpu, gpu, npu)
    #[arg(long)]
    pub device: Option<String>,

    /// Precision (float32, float16)
    #[arg(long)]
    pub data_type: Option<String>,

    /// Tensor layout (nchw, nhwc); defaults to the device's preference
    #[arg(long)]
    pub layout: Option<String>,

    /// Timed compute runs after the warm-up (median reported when > 1)
    #[arg(short = 'n', long)]
    pub num_runs: Option<u32>,

    /// Input source (image, camera); inferred from --image / --frames when omitted
    #[arg(long)]
    pub source: Option<String>,

    /// Still image to classify
    #[arg(short, long, conflicts_with = "frames")]
    pub image: Option<PathBuf>,

    /// Directory of frames played back as a camera
    #[arg(long)]
    pub frames: Option<PathBuf>,

    /// Loop the frame directory until Ctrl+C
    #[arg(long, default_value_t = false)]
    pub loop_frames: bool,

    /// Root directory for label files
    #[arg(long)]
    pub labels_dir: Option<PathBuf>,

    /// Power preference hint (default, high-performance, low-power)
    #[arg(long)]
    pub power_preference: Option<String>,

    /// Thread count hint for CPU execution
    #[arg(long)]
    pub num_threads: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Configuration overrides in the form `apply_cli_overrides` expects
    pub fn config_overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                overrides.insert(key.to_string(), value);
            }
        };

        put("model", self.model.clone());
        put("backend", self.backend.clone());
        put("device_type", self.device.clone());
        put("data_type", self.data_type.clone());
        put("layout", self.layout.clone());
        put("num_runs", self.num_runs.map(|n| n.to_string()));
        put("labels_dir", self.labels_dir.as_ref().map(|p| p.display().to_string()));
        put("power_preference", self.power_preference.clone());
        put("num_threads", self.num_threads.map(|n| n.to_string()));
        put("log_level", self.log_level.clone());
        overrides
    }

    /// Input source to use
    ///
    /// # Errors
    /// * `ClassifyError::UnknownInputSource` - `--source` is not image or camera
    pub fn input_kind(&self) -> ClassifyResult<InputKind> {
        match &self.source {
            Some(name) => InputKind::parse(name),
            None if self.frames.is_some() => Ok(InputKind::Camera),
            None => Ok(InputKind::Image),
        }
    }
}
