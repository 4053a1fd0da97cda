//! # imageclass - image classification demo core
//!
//! Selects a model, backend and device, keeps one inference session alive
//! across selections, and turns raw network output into the three most
//! likely labels. Camera input runs through a cancellable render loop.
//!
//! ## Feature Flags
//!
//! - **`config`** (default): TOML configuration loader
//! - **`observability`** (default): logging setup and per-crate debug flags
//! - **`file-logging`**: rotating log files under the configured directory
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use imageclass::prelude::*;
//!
//! # async fn demo() -> ClassifyResult<()> {
//! let runtime: Arc<dyn InferenceRuntime> = Arc::new(ReferenceRuntime::new());
//! let registry = Arc::new(BuiltinModelRegistry::new(runtime.clone()));
//! let labels = Arc::new(CachedLabelStore::new(FileLabelStore::new("./")));
//! let manager = SessionLifecycleManager::new(registry, labels, runtime);
//!
//! let mut pipeline = ClassificationPipeline::new(manager, Arc::new(TracingPresenter), PipelineSettings::default());
//! pipeline.select_model(ModelId::Squeezenet).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: imageclass-config                          │
//! │  (TOML + environment + CLI overrides)                   │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Core: imageclass-session                               │
//! │  (lifecycle, registry, labels, top-3, render loop)      │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application: imageclass-cli                            │
//! │  (still images and frame directories)                   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

pub use imageclass_session as session;

#[cfg(feature = "config")]
pub use imageclass_config as config;

#[cfg(feature = "observability")]
pub use imageclass_observability as observability;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::session::prelude::*;

    #[cfg(feature = "config")]
    pub use crate::config::{load_config_or_default, validate_config, ImageClassConfig};

    #[cfg(feature = "observability")]
    pub use crate::observability::{init_logging, parse_debug_flags, LoggingOptions};
}
