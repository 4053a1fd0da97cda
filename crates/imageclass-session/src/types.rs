// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Selection, result and timing types shared across the session crate.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClassifyError;

/// Defines a closed identifier enum with its canonical lowercase spelling,
/// `Display`, `FromStr` and an `ALL` table in declaration order.
macro_rules! define_identifier_enum {
    (
        $(#[doc = $doc:expr])*
        $name:ident ($field:literal) {
            $(
                $(#[doc = $variant_doc:expr])*
                $variant:ident => $text:literal
            ),+ $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[doc = $variant_doc])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical identifier
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ClassifyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ClassifyError::InvalidSelection {
                        field: $field,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

define_identifier_enum! {
    /// Network architecture offered by the demo
    ModelId("model") {
        Mobilenet => "mobilenet",
        Squeezenet => "squeezenet",
        /// ResNet50 V2
        Resnet50 => "resnet50",
        /// ResNet50 V1 (float16 only)
        Resnet50V1 => "resnet50v1",
        Efficientnet => "efficientnet",
    }
}

define_identifier_enum! {
    /// Tensor memory layout
    Layout("layout") {
        Nchw => "nchw",
        Nhwc => "nhwc",
    }
}

define_identifier_enum! {
    /// Precision of model inputs and outputs
    DataType("data type") {
        Float32 => "float32",
        /// Reduced precision; outputs are raw f16 bit patterns
        Float16 => "float16",
    }
}

define_identifier_enum! {
    /// Execution engine
    Backend("backend") {
        WebNn => "webnn",
        Polyfill => "polyfill",
    }
}

define_identifier_enum! {
    /// Hardware class executing the graph
    DeviceType("device type") {
        Cpu => "cpu",
        Gpu => "gpu",
        Npu => "npu",
    }
}

define_identifier_enum! {
    /// Power hint forwarded to the runtime context
    PowerPreference("power preference") {
        Default => "default",
        HighPerformance => "high-performance",
        LowPower => "low-power",
    }
}

define_identifier_enum! {
    /// Where input frames come from
    InputKind("input source") {
        Image => "image",
        Camera => "camera",
    }
}

impl InputKind {
    /// Parse an input source name, rejecting unknown ones as
    /// [`ClassifyError::UnknownInputSource`]
    pub fn parse(s: &str) -> Result<Self, ClassifyError> {
        s.parse()
            .map_err(|_| ClassifyError::UnknownInputSource(s.to_string()))
    }
}

impl Layout {
    /// Layout a device prefers when nothing else was chosen
    pub const fn default_for_device(device_type: DeviceType) -> Self {
        match device_type {
            DeviceType::Cpu => Layout::Nhwc,
            DeviceType::Gpu | DeviceType::Npu => Layout::Nchw,
        }
    }
}

impl DeviceType {
    /// Precisions the demo offers on this device
    ///
    /// CPU runs only float32 models, NPU only float16, GPU both.
    pub const fn supported_data_types(&self) -> &'static [DataType] {
        match self {
            DeviceType::Cpu => &[DataType::Float32],
            DeviceType::Gpu => &[DataType::Float32, DataType::Float16],
            DeviceType::Npu => &[DataType::Float16],
        }
    }
}

/// Split a combined backend button id such as `"webnn_gpu"`
pub fn parse_backend_device(id: &str) -> Result<(Backend, DeviceType), ClassifyError> {
    let (backend, device) = id.split_once('_').ok_or_else(|| ClassifyError::InvalidSelection {
        field: "backend",
        value: id.to_string(),
    })?;
    Ok((backend.parse()?, device.parse()?))
}

/// A unique combination the user has requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionKey {
    pub model: ModelId,
    pub layout: Layout,
    pub data_type: DataType,
    pub backend: Backend,
    pub device_type: DeviceType,
}

impl SelectionKey {
    /// Same network (model + layout). Precision is deliberately not compared.
    pub fn same_model(&self, other: &SelectionKey) -> bool {
        self.model == other.model && self.layout == other.layout
    }

    /// Same execution context (backend + device)
    pub fn same_backend(&self, other: &SelectionKey) -> bool {
        self.backend == other.backend && self.device_type == other.device_type
    }
}

impl Display for SelectionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{} on {}_{}",
            self.model, self.layout, self.data_type, self.backend, self.device_type
        )
    }
}

/// Options handed to the runtime when loading a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextOptions {
    pub device_type: DeviceType,
    pub power_preference: Option<PowerPreference>,
    pub num_threads: Option<u32>,
}

impl ContextOptions {
    pub fn new(device_type: DeviceType) -> Self {
        Self {
            device_type,
            power_preference: None,
            num_threads: None,
        }
    }
}

/// Outcome of comparing a new selection against the live session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReuseDecision {
    ReuseSession,
    RebuildSession,
}

/// Lifecycle state of the session manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Empty,
    Loading,
    Built,
    Computing,
}

/// One ranked prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    /// Percentage in 0..=100, rounded half-up to two decimals
    pub probability: f64,
    pub rank: usize,
}

impl Classification {
    /// Probability with exactly two decimals, e.g. `"33.33"`
    pub fn probability_text(&self) -> String {
        format!("{:.2}", self.probability)
    }
}

impl Display for Classification {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.2}%", self.label, self.probability)
    }
}

/// Reported inference latency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ComputeTiming {
    /// Latest single compute
    Single(f64),
    /// Median over several timed runs
    Median(f64),
}

impl ComputeTiming {
    pub fn millis(&self) -> f64 {
        match self {
            ComputeTiming::Single(ms) | ComputeTiming::Median(ms) => *ms,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComputeTiming::Single(_) => "Inference time",
            ComputeTiming::Median(_) => "Median inference time",
        }
    }
}

/// Wall-clock timings of the last load/build/compute cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub load_time_ms: f64,
    pub build_time_ms: f64,
    pub compute: Option<ComputeTiming>,
}

impl Display for TimingRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Load time: {:.2} ms, Build time: {:.2} ms",
            self.load_time_ms, self.build_time_ms
        )?;
        if let Some(compute) = &self.compute {
            write!(f, ", {}: {:.2} ms", compute.label(), compute.millis())?;
        }
        Ok(())
    }
}

/// State of one progress stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageState {
    Pending,
    Current,
    Done,
}

/// Progress of the three pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStages {
    pub load: StageState,
    pub build: StageState,
    pub compute: StageState,
}

impl ProgressStages {
    pub const LOADING: Self = Self::new(StageState::Current, StageState::Pending, StageState::Pending);
    pub const BUILDING: Self = Self::new(StageState::Done, StageState::Current, StageState::Pending);
    pub const COMPUTING: Self = Self::new(StageState::Done, StageState::Done, StageState::Current);
    pub const DONE: Self = Self::new(StageState::Done, StageState::Done, StageState::Done);

    pub const fn new(load: StageState, build: StageState, compute: StageState) -> Self {
        Self {
            load,
            build,
            compute,
        }
    }
}
