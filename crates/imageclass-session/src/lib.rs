// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # imageclass-session
//!
//! Core of the image classification demo:
//! - **Session lifecycle**: reuse or rebuild the inference session on selection changes
//! - **Post-processing**: top-3 classes with float16 widening and softmax
//! - **Render loop**: cancellable per-frame classification for camera input
//! - **Interfaces**: model registry, label store, inference runtime, presenter
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use imageclass_session::prelude::*;
//!
//! # async fn demo() -> ClassifyResult<()> {
//! let runtime: Arc<dyn InferenceRuntime> = Arc::new(ReferenceRuntime::new());
//! let registry = Arc::new(BuiltinModelRegistry::new(runtime.clone()));
//! let labels = Arc::new(CachedLabelStore::new(FileLabelStore::new("./")));
//! let manager = SessionLifecycleManager::new(registry, labels, runtime);
//!
//! let mut pipeline = ClassificationPipeline::new(
//!     manager,
//!     Arc::new(TracingPresenter),
//!     PipelineSettings::default(),
//! );
//! pipeline.select_backend(Backend::Polyfill, DeviceType::Cpu).await?;
//! pipeline.set_image(image::open("test.jpg")?).await?;
//! pipeline.select_model(ModelId::Mobilenet).await?;
//! # Ok(())
//! # }
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod labels;
pub mod lifecycle;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod presenter;
pub mod reference;
pub mod registry;
pub mod render_loop;
pub mod runtime;
pub mod tensor;
pub mod types;

pub use error::{ClassifyError, ClassifyResult};
pub use labels::{CachedLabelStore, FileLabelStore, LabelSet, LabelStore};
pub use lifecycle::{Session, SessionLifecycleManager};
pub use pipeline::{ClassificationPipeline, PipelineSettings};
pub use postprocess::{top_classes, TOP_K};
pub use presenter::{Presenter, PresenterProgress, ProgressListener, TracingPresenter};
pub use reference::ReferenceRuntime;
pub use registry::{available_models, BuiltinModelRegistry, InputOptions, ModelDescriptor, ModelKind, ModelRegistry};
pub use render_loop::{FrameSource, RenderLoopController};
pub use runtime::{ComputeOutputs, GraphHandle, InferenceRuntime, Network, RuntimeError};
pub use tensor::{InputTensor, OutputBuffer};
pub use types::*;

/// Everything needed to wire a pipeline
pub mod prelude {
    pub use crate::error::{ClassifyError, ClassifyResult};
    pub use crate::labels::{CachedLabelStore, FileLabelStore, LabelStore};
    pub use crate::lifecycle::SessionLifecycleManager;
    pub use crate::pipeline::{ClassificationPipeline, PipelineSettings};
    pub use crate::presenter::{Presenter, ProgressListener, TracingPresenter};
    pub use crate::reference::ReferenceRuntime;
    pub use crate::registry::{BuiltinModelRegistry, ModelRegistry};
    pub use crate::render_loop::FrameSource;
    pub use crate::runtime::{InferenceRuntime, Network};
    pub use crate::types::{Backend, DataType, DeviceType, InputKind, Layout, ModelId};
}
