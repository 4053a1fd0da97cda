// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Model catalogue
//!
//! Maps a selection to one of the built-in network variants, its input
//! preprocessing parameters and output shape.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ClassifyError, ClassifyResult};
use crate::runtime::{InferenceRuntime, Network};
use crate::types::{DataType, DeviceType, Layout, ModelId, SelectionKey};

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
const TF_MEAN: [f32; 3] = [127.5, 127.5, 127.5];
const TF_STD: [f32; 3] = [127.5, 127.5, 127.5];

const LABELS_1000: &str = "labels/labels1000.txt";
const LABELS_1001: &str = "labels/labels1001.txt";

/// Concrete network variant: architecture × layout × precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    MobilenetV2Nchw,
    MobilenetV2Nhwc,
    SqueezenetNchw,
    SqueezenetNhwc,
    Resnet50V2Nchw,
    Resnet50V2Nhwc,
    MobilenetV2Fp16Nchw,
    Resnet50V1Fp16Nchw,
    EfficientnetFp16Nchw,
}

impl ModelKind {
    pub const ALL: [ModelKind; 9] = [
        ModelKind::MobilenetV2Nchw,
        ModelKind::MobilenetV2Nhwc,
        ModelKind::SqueezenetNchw,
        ModelKind::SqueezenetNhwc,
        ModelKind::Resnet50V2Nchw,
        ModelKind::Resnet50V2Nhwc,
        ModelKind::MobilenetV2Fp16Nchw,
        ModelKind::Resnet50V1Fp16Nchw,
        ModelKind::EfficientnetFp16Nchw,
    ];

    /// Variant for a model/layout/precision combination, if one exists
    pub fn from_selection(model: ModelId, layout: Layout, data_type: DataType) -> Option<Self> {
        use DataType::*;
        use Layout::*;
        use ModelId::*;

        match (model, layout, data_type) {
            (Mobilenet, Nchw, Float32) => Some(ModelKind::MobilenetV2Nchw),
            (Mobilenet, Nhwc, Float32) => Some(ModelKind::MobilenetV2Nhwc),
            (Squeezenet, Nchw, Float32) => Some(ModelKind::SqueezenetNchw),
            (Squeezenet, Nhwc, Float32) => Some(ModelKind::SqueezenetNhwc),
            (Resnet50, Nchw, Float32) => Some(ModelKind::Resnet50V2Nchw),
            (Resnet50, Nhwc, Float32) => Some(ModelKind::Resnet50V2Nhwc),
            (Mobilenet, Nchw, Float16) => Some(ModelKind::MobilenetV2Fp16Nchw),
            (Resnet50V1, Nchw, Float16) => Some(ModelKind::Resnet50V1Fp16Nchw),
            (Efficientnet, Nchw, Float16) => Some(ModelKind::EfficientnetFp16Nchw),
            _ => None,
        }
    }

    pub fn model(&self) -> ModelId {
        match self {
            ModelKind::MobilenetV2Nchw | ModelKind::MobilenetV2Nhwc | ModelKind::MobilenetV2Fp16Nchw => {
                ModelId::Mobilenet
            }
            ModelKind::SqueezenetNchw | ModelKind::SqueezenetNhwc => ModelId::Squeezenet,
            ModelKind::Resnet50V2Nchw | ModelKind::Resnet50V2Nhwc => ModelId::Resnet50,
            ModelKind::Resnet50V1Fp16Nchw => ModelId::Resnet50V1,
            ModelKind::EfficientnetFp16Nchw => ModelId::Efficientnet,
        }
    }

    pub fn layout(&self) -> Layout {
        match self {
            ModelKind::MobilenetV2Nhwc | ModelKind::SqueezenetNhwc | ModelKind::Resnet50V2Nhwc => Layout::Nhwc,
            _ => Layout::Nchw,
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ModelKind::MobilenetV2Fp16Nchw | ModelKind::Resnet50V1Fp16Nchw | ModelKind::EfficientnetFp16Nchw => {
                DataType::Float16
            }
            _ => DataType::Float32,
        }
    }

    /// Preprocessing parameters the network expects
    pub fn input_options(&self) -> InputOptions {
        let data_type = self.data_type();
        match self.layout() {
            Layout::Nchw => InputOptions {
                mean: IMAGENET_MEAN,
                std: IMAGENET_STD,
                norm: true,
                channel_scheme: ChannelScheme::Rgb,
                input_layout: Layout::Nchw,
                input_dimensions: vec![1, 3, 224, 224],
                data_type,
                label_url: LABELS_1000.to_string(),
            },
            Layout::Nhwc => InputOptions {
                mean: TF_MEAN,
                std: TF_STD,
                norm: false,
                channel_scheme: ChannelScheme::Rgb,
                input_layout: Layout::Nhwc,
                input_dimensions: vec![1, 224, 224, 3],
                data_type,
                label_url: LABELS_1001.to_string(),
            },
        }
    }

    /// Output tensor shape
    pub fn output_dimensions(&self) -> Vec<usize> {
        match self.layout() {
            Layout::Nchw => vec![1, 1000],
            Layout::Nhwc => vec![1, 1001],
        }
    }
}

impl Display for ModelKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let precision = match self.data_type() {
            DataType::Float16 => "fp16",
            DataType::Float32 => "",
        };
        write!(f, "{}{}{}", self.model(), precision, self.layout())
    }
}

/// Channel order of the preprocessed input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelScheme {
    Rgb,
    Bgr,
}

/// Model input preprocessing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputOptions {
    pub mean: [f32; 3],
    pub std: [f32; 3],
    /// Scale pixel values to 0..1 before mean/std
    pub norm: bool,
    pub channel_scheme: ChannelScheme,
    pub input_layout: Layout,
    pub input_dimensions: Vec<usize>,
    pub data_type: DataType,
    /// Label file location, relative to the label store root
    pub label_url: String,
}

impl InputOptions {
    /// `(height, width)` of the input image
    pub fn image_size(&self) -> (usize, usize) {
        match (self.input_layout, self.input_dimensions.as_slice()) {
            (Layout::Nchw, [_, _, h, w]) | (Layout::Nhwc, [_, h, w, _]) => (*h, *w),
            _ => (0, 0),
        }
    }
}

/// Everything needed to bring one network up
pub struct ModelDescriptor {
    pub kind: ModelKind,
    pub input_options: InputOptions,
    pub output_dimensions: Vec<usize>,
    pub network: Box<dyn Network>,
}

impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("kind", &self.kind)
            .field("input_options", &self.input_options)
            .field("output_dimensions", &self.output_dimensions)
            .finish_non_exhaustive()
    }
}

/// Resolves a selection to a ready-to-load network
pub trait ModelRegistry: Send + Sync {
    /// # Errors
    /// * `ClassifyError::UnsupportedSelection` - No variant for the combination
    fn resolve(&self, key: &SelectionKey) -> ClassifyResult<ModelDescriptor>;
}

/// Registry over the built-in variants, creating networks on a runtime
pub struct BuiltinModelRegistry {
    runtime: Arc<dyn InferenceRuntime>,
}

impl BuiltinModelRegistry {
    pub fn new(runtime: Arc<dyn InferenceRuntime>) -> Self {
        Self { runtime }
    }
}

impl ModelRegistry for BuiltinModelRegistry {
    fn resolve(&self, key: &SelectionKey) -> ClassifyResult<ModelDescriptor> {
        let kind = ModelKind::from_selection(key.model, key.layout, key.data_type).ok_or_else(|| {
            ClassifyError::UnsupportedSelection {
                model: key.model.to_string(),
                layout: key.layout.to_string(),
                data_type: key.data_type.to_string(),
            }
        })?;
        let input_options = kind.input_options();
        let network = self.runtime.create_network(kind, &input_options);
        Ok(ModelDescriptor {
            kind,
            input_options,
            output_dimensions: kind.output_dimensions(),
            network,
        })
    }
}

/// Models offered on a device, optionally restricted to one precision
///
/// Order follows the float32 list, then float16, without duplicates.
pub fn available_models(device_type: DeviceType, data_type: Option<DataType>) -> Vec<ModelId> {
    let precisions: &[DataType] = match data_type {
        Some(DataType::Float32) => &[DataType::Float32],
        Some(DataType::Float16) => &[DataType::Float16],
        None => &[DataType::Float32, DataType::Float16],
    };

    let mut models = Vec::new();
    for precision in precisions {
        if !device_type.supported_data_types().contains(precision) {
            continue;
        }
        let listed: &[ModelId] = match precision {
            DataType::Float32 => &[ModelId::Mobilenet, ModelId::Squeezenet, ModelId::Resnet50],
            DataType::Float16 => &[ModelId::Efficientnet, ModelId::Mobilenet, ModelId::Resnet50V1],
        };
        for model in listed {
            if !models.contains(model) {
                models.push(*model);
            }
        }
    }
    models
}
