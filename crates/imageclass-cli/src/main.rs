use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use imageclass_cli::{Args, DirectoryFrameSource};
use imageclass_config::{load_config_or_default, validate_config};
use imageclass_observability::{init_logging, parse_debug_flags, strip_debug_flags, LoggingOptions};
use imageclass_session::prelude::*;
use imageclass_session::available_models;

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    // Debug flags are not clap arguments; take them out before parsing
    let debug_flags = parse_debug_flags();
    let args = Args::parse_from(strip_debug_flags(std::env::args()));

    let overrides = args.config_overrides();
    let config = load_config_or_default(args.config.as_deref(), Some(&overrides))
        .context("Failed to load configuration")?;
    validate_config(&config)?;

    let logging = LoggingOptions {
        level: config.logging.level.clone(),
        file_logging: config.logging.file_logging,
        log_dir: config.logging.log_dir.clone(),
        ..LoggingOptions::default()
    };
    let _logging_guard = init_logging(&debug_flags, &logging)?;

    print_banner();

    let settings = PipelineSettings::from_config(&config)?;
    let model = settings
        .model
        .ok_or_else(|| anyhow!("No model selected; pass --model or set [model].name"))?;
    info!(
        target: "imageclass-cli",
        "Backend {}_{}, precision {}, {} run(s)",
        settings.backend,
        settings.device_type,
        settings.data_type,
        settings.num_runs
    );
    let offered = available_models(settings.device_type, Some(settings.data_type));
    if !offered.contains(&model) {
        warn!(
            target: "imageclass-cli",
            "{} is not offered for {} on {} (available: {:?})",
            model,
            settings.data_type,
            settings.device_type,
            offered
        );
    }

    let runtime: Arc<dyn InferenceRuntime> = Arc::new(ReferenceRuntime::new());
    let registry = Arc::new(BuiltinModelRegistry::new(runtime.clone()));
    let labels = Arc::new(CachedLabelStore::new(FileLabelStore::new(&config.labels.dir)));
    let presenter = Arc::new(TracingPresenter);
    let manager = SessionLifecycleManager::new(registry, labels, runtime).with_progress(presenter.clone());
    let mut pipeline = ClassificationPipeline::new(manager, presenter, settings);

    match args.input_kind()? {
        InputKind::Image => {
            let path = args
                .image
                .as_ref()
                .ok_or_else(|| anyhow!("Image input needs --image <path>"))?;
            info!(target: "imageclass-cli", "Classifying {}", path.display());
            let image = image::open(path).with_context(|| format!("Failed to open image: {}", path.display()))?;
            pipeline.set_image(image).await?;
        }
        InputKind::Camera => {
            let dir = args
                .frames
                .as_ref()
                .ok_or_else(|| anyhow!("Camera input needs --frames <dir>"))?;
            let frames = Arc::new(DirectoryFrameSource::open(dir, args.loop_frames)?);
            pipeline.use_camera(frames).await?;
            info!(target: "imageclass-cli", "Rendering frames (Press Ctrl+C to stop)...");
            wait_for_render_end(&pipeline).await;
        }
    }

    if let Err(e) = pipeline.shutdown().await {
        error!(target: "imageclass-cli", "Shutdown failed: {}", e);
        return Err(e.into());
    }
    info!(target: "imageclass-cli", "Shutdown complete");
    Ok(())
}

/// Block until Ctrl+C or until the frame source runs dry
async fn wait_for_render_end(pipeline: &ClassificationPipeline) {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!(target: "imageclass-cli", "Shutdown signal received...");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                if !pipeline.is_rendering() {
                    info!(target: "imageclass-cli", "Frame source finished");
                    break;
                }
            }
        }
    }
}

/// Print ASCII banner
fn print_banner() {
    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                                                           ║
║   imageclass v{:<10}                                  ║
║   Image classification: model, backend and device select  ║
║                                                           ║
╚═══════════════════════════════════════════════════════════╝
    "#,
        env!("CARGO_PKG_VERSION")
    );
}
