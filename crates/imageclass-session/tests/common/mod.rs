//! Common test utilities: recording runtime, presenter and frame source

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use parking_lot::Mutex;

use imageclass_session::{
    Backend, Classification, ClassifyResult, ComputeOutputs, ContextOptions, DeviceType, FrameSource, GraphHandle,
    InferenceRuntime, InputOptions, InputTensor, LabelSet, LabelStore, ModelKind, Network, OutputBuffer,
    Presenter, ProgressListener, ProgressStages, RuntimeError, TimingRecord,
};

/// One observed runtime interaction
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetBackend(Backend, DeviceType),
    Load(ModelKind),
    Build(ModelKind),
    Compute(ModelKind),
    ComputeDone(ModelKind),
    Dispose(ModelKind),
}

/// Behaviour of networks created by a [`RecordingRuntime`]
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub fail_set_backend: bool,
    pub fail_load: bool,
    pub fail_build: bool,
    pub fail_compute: bool,
    /// Delay of the n-th compute; the last entry repeats
    pub compute_delays_ms: Vec<u64>,
    /// Value written to every output element
    pub fill: Option<f32>,
}

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<Call>>,
    script: Mutex<Script>,
    computes: AtomicUsize,
}

/// Runtime whose networks log every call
#[derive(Clone, Default)]
pub struct RecordingRuntime {
    shared: Arc<Shared>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(script: Script) -> Self {
        let runtime = Self::default();
        *runtime.shared.script.lock() = script;
        runtime
    }

    pub fn set_script(&self, script: Script) {
        *self.shared.script.lock() = script;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.shared.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn clear(&self) {
        self.shared.calls.lock().clear();
    }

    fn record(&self, call: Call) {
        self.shared.calls.lock().push(call);
    }
}

#[async_trait]
impl InferenceRuntime for RecordingRuntime {
    async fn set_backend(&self, backend: Backend, device_type: DeviceType) -> Result<(), RuntimeError> {
        if self.shared.script.lock().fail_set_backend {
            return Err(RuntimeError::new("backend unavailable"));
        }
        self.record(Call::SetBackend(backend, device_type));
        Ok(())
    }

    fn create_network(&self, kind: ModelKind, _input_options: &InputOptions) -> Box<dyn Network> {
        Box::new(RecordingNetwork {
            kind,
            runtime: self.clone(),
        })
    }
}

struct RecordingNetwork {
    kind: ModelKind,
    runtime: RecordingRuntime,
}

#[async_trait]
impl Network for RecordingNetwork {
    async fn load(&mut self, _context: &ContextOptions) -> Result<GraphHandle, RuntimeError> {
        self.runtime.record(Call::Load(self.kind));
        if self.runtime.shared.script.lock().fail_load {
            return Err(RuntimeError::new("weights unavailable"));
        }
        Ok(GraphHandle::new(self.kind))
    }

    async fn build(&mut self, graph: GraphHandle) -> Result<(), RuntimeError> {
        self.runtime.record(Call::Build(self.kind));
        if self.runtime.shared.script.lock().fail_build {
            return Err(RuntimeError::new("compilation rejected"));
        }
        graph.downcast::<ModelKind>().map(|_| ())
    }

    async fn compute(&mut self, input: InputTensor, output: OutputBuffer) -> Result<ComputeOutputs, RuntimeError> {
        self.runtime.record(Call::Compute(self.kind));
        let index = self.runtime.shared.computes.fetch_add(1, Ordering::SeqCst);
        let script = self.runtime.shared.script.lock().clone();

        let delay = script
            .compute_delays_ms
            .get(index)
            .or(script.compute_delays_ms.last())
            .copied()
            .unwrap_or(0);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.runtime.record(Call::ComputeDone(self.kind));

        if script.fail_compute {
            return Err(RuntimeError::new("device lost"));
        }
        let output = match (output, script.fill) {
            (OutputBuffer::Float32(v), Some(fill)) => OutputBuffer::Float32(vec![fill; v.len()]),
            (OutputBuffer::Float16(v), Some(fill)) => {
                OutputBuffer::Float16(vec![half::f16::from_f32(fill).to_bits(); v.len()])
            }
            (output, None) => output,
        };
        Ok(ComputeOutputs { input, output })
    }

    fn dispose(&mut self) {
        self.runtime.record(Call::Dispose(self.kind));
    }
}

/// Label store returning `label0..labelN` for any URL
pub struct StaticLabels(pub usize);

#[async_trait]
impl LabelStore for StaticLabels {
    async fn fetch(&self, _label_url: &str) -> ClassifyResult<LabelSet> {
        Ok((0..self.0).map(|i| format!("label{}", i)).collect())
    }
}

/// Presenter notification
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Progress(ProgressStages),
    Classes(Vec<Classification>),
    Timings(TimingRecord),
    Fps(u32),
    Alert(String),
    Controls(bool),
    Results(bool),
}

#[derive(Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<Event>>,
}

impl RecordingPresenter {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Alert(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn last_classes(&self) -> Option<Vec<Classification>> {
        self.events().into_iter().rev().find_map(|e| match e {
            Event::Classes(classes) => Some(classes),
            _ => None,
        })
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }
}

impl ProgressListener for RecordingPresenter {
    fn progress(&self, stages: ProgressStages) {
        self.push(Event::Progress(stages));
    }
}

impl Presenter for RecordingPresenter {
    fn classes(&self, classes: &[Classification]) {
        self.push(Event::Classes(classes.to_vec()));
    }

    fn timings(&self, timings: &TimingRecord) {
        self.push(Event::Timings(*timings));
    }

    fn fps(&self, fps: u32) {
        self.push(Event::Fps(fps));
    }

    fn alert(&self, message: &str) {
        self.push(Event::Alert(message.to_string()));
    }

    fn set_controls_enabled(&self, enabled: bool) {
        self.push(Event::Controls(enabled));
    }

    fn set_results_visible(&self, visible: bool) {
        self.push(Event::Results(visible));
    }
}

/// Camera stand-in serving one solid image
pub struct StaticFrames {
    pub active: AtomicBool,
    pub ready: AtomicBool,
    pub stopped: AtomicBool,
    pub captures: AtomicUsize,
}

impl StaticFrames {
    pub fn new(ready: bool) -> Arc<Self> {
        Arc::new(Self {
            active: AtomicBool::new(true),
            ready: AtomicBool::new(ready),
            stopped: AtomicBool::new(false),
            captures: AtomicUsize::new(0),
        })
    }
}

impl FrameSource for StaticFrames {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn capture(&self) -> ClassifyResult<DynamicImage> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(test_image())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Small solid-colour image
pub fn test_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 12, Rgb([200, 120, 40])))
}

/// Label file with `n` lines under `labels/` in `dir`
pub fn write_labels(dir: &std::path::Path, file: &str, n: usize) {
    let labels_dir = dir.join("labels");
    std::fs::create_dir_all(&labels_dir).expect("Failed to create labels directory");
    let text: String = (0..n).map(|i| format!("class {}\n", i)).collect();
    std::fs::write(labels_dir.join(file), text).expect("Failed to write labels");
}
