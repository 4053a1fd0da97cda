// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Input tensors and output buffers exchanged with the runtime.

use half::f16;

use crate::types::DataType;

/// Number of elements described by a shape
pub fn size_of_shape(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Median of a set of samples
///
/// Even counts average the two middle values. Returns `None` when empty.
pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Preprocessed model input
#[derive(Debug, Clone, PartialEq)]
pub enum InputTensor {
    Float32 { data: Vec<f32>, dims: Vec<usize> },
    /// Half precision stored as raw bit patterns
    Float16 { data: Vec<u16>, dims: Vec<usize> },
}

impl InputTensor {
    pub fn dims(&self) -> &[usize] {
        match self {
            InputTensor::Float32 { dims, .. } | InputTensor::Float16 { dims, .. } => dims,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            InputTensor::Float32 { data, .. } => data.len(),
            InputTensor::Float16 { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            InputTensor::Float32 { .. } => DataType::Float32,
            InputTensor::Float16 { .. } => DataType::Float16,
        }
    }

    /// Element `index` widened to f32
    pub fn value_at(&self, index: usize) -> Option<f32> {
        match self {
            InputTensor::Float32 { data, .. } => data.get(index).copied(),
            InputTensor::Float16 { data, .. } => data.get(index).map(|&bits| f16::from_bits(bits).to_f32()),
        }
    }
}

/// Caller-owned output storage, moved into `compute` and handed back
#[derive(Debug, Clone, PartialEq)]
pub enum OutputBuffer {
    Float32(Vec<f32>),
    /// Raw f16 bit patterns; widened during post-processing
    Float16(Vec<u16>),
}

impl OutputBuffer {
    /// Zero-filled buffer sized for `output_dims`
    pub fn zeros(data_type: DataType, output_dims: &[usize]) -> Self {
        let len = size_of_shape(output_dims);
        match data_type {
            DataType::Float32 => OutputBuffer::Float32(vec![0.0; len]),
            DataType::Float16 => OutputBuffer::Float16(vec![0; len]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OutputBuffer::Float32(v) => v.len(),
            OutputBuffer::Float16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            OutputBuffer::Float32(_) => DataType::Float32,
            OutputBuffer::Float16(_) => DataType::Float16,
        }
    }

    /// Values widened to f32
    pub fn to_f32(&self) -> Vec<f32> {
        match self {
            OutputBuffer::Float32(v) => v.clone(),
            OutputBuffer::Float16(v) => v.iter().map(|&bits| f16::from_bits(bits).to_f32()).collect(),
        }
    }
}
