// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Classification pipeline error types.

Every failure in the load → build → compute pipeline surfaces as a
`ClassifyError`; the pipeline boundary turns it into a user-visible message.

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::registry::ModelKind;
use crate::runtime::RuntimeError;

/// Errors raised by the session lifecycle, post-processing and render loop
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// The runtime rejected `load()`
    #[error("Failed to load {model}: {source}")]
    Load {
        model: ModelKind,
        #[source]
        source: RuntimeError,
    },

    /// The runtime rejected `build()`
    #[error("Failed to build {model}: {source}")]
    Build {
        model: ModelKind,
        #[source]
        source: RuntimeError,
    },

    /// The runtime rejected `compute()`
    #[error("Compute failed: {0}")]
    Compute(#[source] RuntimeError),

    /// The runtime could not switch backend or device
    #[error("Failed to set backend: {0}")]
    Backend(#[source] RuntimeError),

    /// `compute()` called without a built session
    #[error("No active inference session")]
    NoActiveSession,

    /// Fewer labels or output classes than the number of ranked results
    #[error("Need at least {required} classes, got {available}")]
    InsufficientClasses { required: usize, available: usize },

    /// Input source identifier not recognized
    #[error("Unknown input source '{0}'")]
    UnknownInputSource(String),

    /// The selected input source has nothing to classify yet
    #[error("No {0} input available")]
    NoInput(&'static str),

    /// No model descriptor exists for the combination
    #[error("No model for {model} / {layout} / {data_type}")]
    UnsupportedSelection {
        model: String,
        layout: String,
        data_type: String,
    },

    /// A selection field could not be parsed
    #[error("Invalid {field} '{value}'")]
    InvalidSelection { field: &'static str, value: String },

    /// Label file could not be read
    #[error("Failed to read labels from {path}: {source}")]
    Labels {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The network produced a NaN score
    #[error("Output score {index} is not a number")]
    NonFiniteScore { index: usize },

    /// Output buffer shorter than the declared output shape
    #[error("Output buffer holds {actual} elements, shape requires {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Input image could not be turned into a tensor
    #[error("Preprocessing failed: {0}")]
    Preprocess(String),

    /// The render loop did not drain within the configured bound
    #[error("Render loop did not stop within {0:?}")]
    StopTimeout(Duration),
}

/// Result type for classification operations
pub type ClassifyResult<T> = Result<T, ClassifyError>;

impl From<image::ImageError> for ClassifyError {
    fn from(err: image::ImageError) -> Self {
        ClassifyError::Preprocess(err.to_string())
    }
}
