// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Reference CPU runtime
//!
//! A deterministic stand-in for a hardware inference backend. It does not
//! run the real architectures: each "graph" pools the input into per-channel
//! means and projects them onto the class scores with weights seeded from
//! the model variant, so the same image always yields the same ranking.
//! Float32 variants emit probabilities; float16 variants emit raw logits
//! as half-precision bit patterns.

use half::f16;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use async_trait::async_trait;

use crate::postprocess::softmax;
use crate::registry::{InputOptions, ModelKind};
use crate::runtime::{ComputeOutputs, GraphHandle, InferenceRuntime, Network, RuntimeError};
use crate::tensor::{InputTensor, OutputBuffer};
use crate::types::{Backend, ContextOptions, DeviceType, Layout};

const CHANNELS: usize = 3;

/// CPU runtime accepting every backend/device combination
#[derive(Debug, Default)]
pub struct ReferenceRuntime {
    active: RwLock<Option<(Backend, DeviceType)>>,
}

impl ReferenceRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend and device last set
    pub fn active_backend(&self) -> Option<(Backend, DeviceType)> {
        *self.active.read()
    }
}

#[async_trait]
impl InferenceRuntime for ReferenceRuntime {
    async fn set_backend(&self, backend: Backend, device_type: DeviceType) -> Result<(), RuntimeError> {
        *self.active.write() = Some((backend, device_type));
        Ok(())
    }

    fn create_network(&self, kind: ModelKind, input_options: &InputOptions) -> Box<dyn Network> {
        Box::new(ReferenceNetwork::new(kind, input_options.clone()))
    }
}

/// Class projection: `classes × CHANNELS` weights plus a bias per class
#[derive(Debug, Clone)]
struct ProjectionGraph {
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl ProjectionGraph {
    fn seeded(kind: ModelKind, classes: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(kind as u64 + 1);
        let weights = (0..classes * CHANNELS).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect();
        let bias = (0..classes).map(|_| rng.gen::<f32>() * 0.5 - 0.25).collect();
        Self { weights, bias }
    }

    fn logits(&self, pooled: &[f32; CHANNELS]) -> Vec<f32> {
        self.bias
            .iter()
            .enumerate()
            .map(|(class, bias)| {
                let row = &self.weights[class * CHANNELS..(class + 1) * CHANNELS];
                row.iter().zip(pooled).map(|(w, x)| w * x).sum::<f32>() + bias
            })
            .collect()
    }
}

/// One model instance on the reference runtime
pub struct ReferenceNetwork {
    kind: ModelKind,
    input_options: InputOptions,
    classes: usize,
    compiled: Option<ProjectionGraph>,
}

impl ReferenceNetwork {
    pub fn new(kind: ModelKind, input_options: InputOptions) -> Self {
        let classes = kind.output_dimensions().iter().product();
        Self {
            kind,
            input_options,
            classes,
            compiled: None,
        }
    }

    fn pool(&self, input: &InputTensor) -> Result<[f32; CHANNELS], RuntimeError> {
        let (height, width) = self.input_options.image_size();
        let plane = height * width;
        if plane == 0 || input.len() != plane * CHANNELS {
            return Err(RuntimeError::new(format!(
                "input has {} elements, expected {}",
                input.len(),
                plane * CHANNELS
            )));
        }

        let mut sums = [0.0f32; CHANNELS];
        for (c, sum) in sums.iter_mut().enumerate() {
            for p in 0..plane {
                let index = match self.input_options.input_layout {
                    Layout::Nchw => c * plane + p,
                    Layout::Nhwc => p * CHANNELS + c,
                };
                *sum += input.value_at(index).unwrap_or_default();
            }
        }
        Ok(sums.map(|sum| sum / plane as f32))
    }
}

#[async_trait]
impl Network for ReferenceNetwork {
    async fn load(&mut self, context: &ContextOptions) -> Result<GraphHandle, RuntimeError> {
        debug!(
            target: "imageclass-session",
            "Reference load of {} on {} (threads: {:?})",
            self.kind,
            context.device_type,
            context.num_threads
        );
        Ok(GraphHandle::new(ProjectionGraph::seeded(self.kind, self.classes)))
    }

    async fn build(&mut self, graph: GraphHandle) -> Result<(), RuntimeError> {
        self.compiled = Some(graph.downcast::<ProjectionGraph>()?);
        Ok(())
    }

    async fn compute(&mut self, input: InputTensor, output: OutputBuffer) -> Result<ComputeOutputs, RuntimeError> {
        let graph = self
            .compiled
            .as_ref()
            .ok_or_else(|| RuntimeError::new(format!("{} has not been built", self.kind)))?;
        if output.len() < self.classes {
            return Err(RuntimeError::new(format!(
                "output buffer holds {} elements, expected {}",
                output.len(),
                self.classes
            )));
        }

        let pooled = self.pool(&input)?;
        let logits = graph.logits(&pooled);

        let output = match output {
            OutputBuffer::Float32(mut values) => {
                values[..self.classes].copy_from_slice(&softmax(&logits));
                OutputBuffer::Float32(values)
            }
            OutputBuffer::Float16(mut values) => {
                for (slot, logit) in values.iter_mut().zip(&logits) {
                    *slot = f16::from_f32(*logit).to_bits();
                }
                OutputBuffer::Float16(values)
            }
        };
        Ok(ComputeOutputs { input, output })
    }

    fn dispose(&mut self) {
        self.compiled = None;
    }
}
