/*!
Inference runtime abstraction.

The session layer drives any graph executor through two traits: an
[`InferenceRuntime`] that owns backend/device selection and hands out
networks, and a [`Network`] that goes through load → build → compute and
releases its resources on `dispose`.

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

use std::any::Any;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::registry::{InputOptions, ModelKind};
use crate::tensor::{InputTensor, OutputBuffer};
use crate::types::{Backend, ContextOptions, DeviceType};

/// Failure reported by a runtime implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RuntimeError(pub String);

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Opaque graph description produced by `load` and consumed by `build`
pub struct GraphHandle(Box<dyn Any + Send + Sync>);

impl GraphHandle {
    pub fn new<T: Any + Send + Sync>(graph: T) -> Self {
        Self(Box::new(graph))
    }

    /// Recover the runtime-specific graph type
    pub fn downcast<T: Any>(self) -> Result<T, RuntimeError> {
        self.0
            .downcast::<T>()
            .map(|graph| *graph)
            .map_err(|_| RuntimeError::new("graph handle belongs to another runtime"))
    }
}

impl fmt::Debug for GraphHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GraphHandle(..)")
    }
}

/// Buffers returned from a compute call
///
/// The output buffer is the one passed in, now holding the scores.
#[derive(Debug)]
pub struct ComputeOutputs {
    pub input: InputTensor,
    pub output: OutputBuffer,
}

/// A single model instance on the active backend
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch weights and describe the graph
    ///
    /// # Errors
    /// * `RuntimeError` - Weights unavailable or context creation failed
    async fn load(&mut self, context: &ContextOptions) -> Result<GraphHandle, RuntimeError>;

    /// Compile a loaded graph for execution
    ///
    /// # Errors
    /// * `RuntimeError` - Compilation rejected by the backend
    async fn build(&mut self, graph: GraphHandle) -> Result<(), RuntimeError>;

    /// Run one inference, writing scores into `output`
    ///
    /// # Errors
    /// * `RuntimeError` - Graph not built or execution failed
    async fn compute(
        &mut self,
        input: InputTensor,
        output: OutputBuffer,
    ) -> Result<ComputeOutputs, RuntimeError>;

    /// Release backend resources. Must be safe to call on a partially
    /// loaded network.
    fn dispose(&mut self);
}

/// Backend-level runtime: selects the device and creates networks
#[async_trait]
pub trait InferenceRuntime: Send + Sync {
    /// Switch the active backend and device
    ///
    /// # Errors
    /// * `RuntimeError` - The backend is not available on this host
    async fn set_backend(&self, backend: Backend, device_type: DeviceType) -> Result<(), RuntimeError>;

    /// Create an unloaded network for `kind`
    fn create_network(&self, kind: ModelKind, input_options: &InputOptions) -> Box<dyn Network>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_handle_downcast() {
        let handle = GraphHandle::new(42u32);
        assert_eq!(handle.downcast::<u32>().unwrap(), 42);

        let handle = GraphHandle::new("graph");
        assert!(handle.downcast::<u32>().is_err());
    }
}
