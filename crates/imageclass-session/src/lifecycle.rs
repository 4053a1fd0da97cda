// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Inference Session Lifecycle Manager
//!
//! Decides when the live session can be reused and when it has to be
//! replaced, and drives load → build → compute with timing.
//! - At most one live session
//! - The previous session is disposed before the next one loads
//! - A failed load or build leaves no session behind

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ClassifyError, ClassifyResult};
use crate::labels::{LabelSet, LabelStore};
use crate::postprocess;
use crate::presenter::ProgressListener;
use crate::registry::{InputOptions, ModelDescriptor, ModelKind, ModelRegistry};
use crate::runtime::{ComputeOutputs, InferenceRuntime, Network};
use crate::tensor::{median, InputTensor, OutputBuffer};
use crate::types::{
    Backend, Classification, ComputeTiming, ContextOptions, DeviceType, ProgressStages, ReuseDecision,
    SelectionKey, SessionState, TimingRecord,
};

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// A loaded and built network together with its labels and output storage
///
/// Dropping a session disposes its network, so disposal happens exactly once.
pub struct Session {
    kind: ModelKind,
    input_options: InputOptions,
    output_dimensions: Vec<usize>,
    labels: LabelSet,
    /// Taken while a compute holds it
    output: Option<OutputBuffer>,
    network: Box<dyn Network>,
}

impl Session {
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn input_options(&self) -> &InputOptions {
        &self.input_options
    }

    pub fn output_dimensions(&self) -> &[usize] {
        &self.output_dimensions
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Scores of the latest compute
    pub fn output(&self) -> Option<&OutputBuffer> {
        self.output.as_ref()
    }

    fn fresh_output(&self) -> OutputBuffer {
        OutputBuffer::zeros(self.input_options.data_type, &self.output_dimensions)
    }

    /// Release the network
    pub fn dispose(self) {
        debug!(target: "imageclass-session", "Disposing session {}", self.kind);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.network.dispose();
    }
}

/// Network between creation and a successful build; disposed if dropped
struct PendingNetwork(Option<Box<dyn Network>>);

impl PendingNetwork {
    fn network(&mut self) -> ClassifyResult<&mut Box<dyn Network>> {
        self.0.as_mut().ok_or(ClassifyError::NoActiveSession)
    }

    fn into_inner(mut self) -> ClassifyResult<Box<dyn Network>> {
        self.0.take().ok_or(ClassifyError::NoActiveSession)
    }
}

impl Drop for PendingNetwork {
    fn drop(&mut self) {
        if let Some(mut network) = self.0.take() {
            network.dispose();
        }
    }
}

/// Owns the single inference session and its load/build/compute cycle
pub struct SessionLifecycleManager {
    registry: Arc<dyn ModelRegistry>,
    labels: Arc<dyn LabelStore>,
    runtime: Arc<dyn InferenceRuntime>,
    progress: Option<Arc<dyn ProgressListener>>,
    state: SessionState,
    session: Option<Session>,
    /// Backend and device of the last successful `set_backend`
    applied_backend: Option<(Backend, DeviceType)>,
    timings: TimingRecord,
}

impl SessionLifecycleManager {
    pub fn new(
        registry: Arc<dyn ModelRegistry>,
        labels: Arc<dyn LabelStore>,
        runtime: Arc<dyn InferenceRuntime>,
    ) -> Self {
        Self {
            registry,
            labels,
            runtime,
            progress: None,
            state: SessionState::Empty,
            session: None,
            applied_backend: None,
            timings: TimingRecord::default(),
        }
    }

    /// Report load/build stage changes to `listener`
    pub fn with_progress(mut self, listener: Arc<dyn ProgressListener>) -> Self {
        self.progress = Some(listener);
        self
    }

    pub fn has_progress(&self) -> bool {
        self.progress.is_some()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn timings(&self) -> TimingRecord {
        self.timings
    }

    /// Preprocessing parameters of the live session
    pub fn input_options(&self) -> Option<&InputOptions> {
        self.session.as_ref().map(Session::input_options)
    }

    fn report(&self, stages: ProgressStages) {
        if let Some(listener) = &self.progress {
            listener.progress(stages);
        }
    }

    /// Whether `key` can run on the live session
    ///
    /// Rebuild when there is no session, when model or layout differ from
    /// the live one, or when backend or device differ from the last applied.
    /// A precision-only change reuses the session.
    pub fn selection_changed(&self, key: &SelectionKey) -> ReuseDecision {
        let Some(session) = &self.session else {
            return ReuseDecision::RebuildSession;
        };
        if session.kind.model() != key.model || session.kind.layout() != key.layout {
            return ReuseDecision::RebuildSession;
        }
        if self.applied_backend != Some((key.backend, key.device_type)) {
            return ReuseDecision::RebuildSession;
        }
        ReuseDecision::ReuseSession
    }

    /// Point the runtime at `backend`/`device_type`; no-op when unchanged
    pub async fn apply_backend(&mut self, backend: Backend, device_type: DeviceType) -> ClassifyResult<()> {
        if self.applied_backend == Some((backend, device_type)) {
            return Ok(());
        }
        info!(target: "imageclass-session", "Setting backend {}_{}", backend, device_type);
        self.runtime
            .set_backend(backend, device_type)
            .await
            .map_err(ClassifyError::Backend)?;
        self.applied_backend = Some((backend, device_type));
        Ok(())
    }

    /// Replace the live session with a freshly loaded and built one
    ///
    /// # Errors
    /// * `ClassifyError::Labels` - Label file unavailable
    /// * `ClassifyError::Load` - The runtime rejected `load`
    /// * `ClassifyError::Build` - The runtime rejected `build`
    ///
    /// On any error the manager is left Empty with no session.
    pub async fn rebuild(
        &mut self,
        descriptor: ModelDescriptor,
        context_options: &ContextOptions,
    ) -> ClassifyResult<&Session> {
        self.dispose();
        self.state = SessionState::Loading;

        match self.load_and_build(descriptor, context_options).await {
            Ok((session, timings)) => {
                self.timings = timings;
                self.state = SessionState::Built;
                Ok(&*self.session.insert(session))
            }
            Err(e) => {
                self.state = SessionState::Empty;
                Err(e)
            }
        }
    }

    async fn load_and_build(
        &self,
        descriptor: ModelDescriptor,
        context_options: &ContextOptions,
    ) -> ClassifyResult<(Session, TimingRecord)> {
        let ModelDescriptor {
            kind,
            input_options,
            output_dimensions,
            network,
        } = descriptor;
        let mut pending = PendingNetwork(Some(network));

        let labels = self.labels.fetch(&input_options.label_url).await?;
        let output = OutputBuffer::zeros(input_options.data_type, &output_dimensions);

        info!(target: "imageclass-session", "- Model name: {}, Model layout: {} -", kind.model(), kind.layout());
        self.report(ProgressStages::LOADING);
        info!(target: "imageclass-session", "- Loading weights... ");
        let start = Instant::now();
        let graph = pending
            .network()?
            .load(context_options)
            .await
            .map_err(|source| ClassifyError::Load { model: kind, source })?;
        let load_time_ms = elapsed_ms(start);
        info!(target: "imageclass-session", "  done in {:.2} ms.", load_time_ms);

        self.report(ProgressStages::BUILDING);
        info!(target: "imageclass-session", "- Building... ");
        let start = Instant::now();
        pending
            .network()?
            .build(graph)
            .await
            .map_err(|source| ClassifyError::Build { model: kind, source })?;
        let build_time_ms = elapsed_ms(start);
        info!(target: "imageclass-session", "  done in {:.2} ms.", build_time_ms);

        let session = Session {
            kind,
            input_options,
            output_dimensions,
            labels,
            output: Some(output),
            network: pending.into_inner()?,
        };
        let timings = TimingRecord {
            load_time_ms,
            build_time_ms,
            compute: None,
        };
        Ok((session, timings))
    }

    /// Bring up a session able to serve `key`, rebuilding only when needed
    pub async fn ensure_session(
        &mut self,
        key: &SelectionKey,
        context_options: &ContextOptions,
    ) -> ClassifyResult<ReuseDecision> {
        let decision = self.selection_changed(key);
        if decision == ReuseDecision::RebuildSession {
            self.apply_backend(key.backend, key.device_type).await?;
            let descriptor = self.registry.resolve(key)?;
            self.rebuild(descriptor, context_options).await?;
        } else {
            debug!(target: "imageclass-session", "Reusing session for {}", key);
        }
        Ok(decision)
    }

    /// Run one inference on the live session
    ///
    /// Returns the input tensor so it can be fed to the next run.
    ///
    /// # Errors
    /// * `ClassifyError::NoActiveSession` - Nothing built, or disposed
    /// * `ClassifyError::Compute` - The runtime rejected `compute`
    pub async fn compute(&mut self, input: InputTensor) -> ClassifyResult<InputTensor> {
        let session = self.session.as_mut().ok_or(ClassifyError::NoActiveSession)?;
        let output = match session.output.take() {
            Some(output) => output,
            None => session.fresh_output(),
        };

        self.state = SessionState::Computing;
        let result = session.network.compute(input, output).await;
        self.state = SessionState::Built;

        match result {
            Ok(ComputeOutputs { input, output }) => {
                session.output = Some(output);
                Ok(input)
            }
            Err(e) => {
                warn!(target: "imageclass-session", "Compute failed on {}: {}", session.kind, e);
                session.output = Some(session.fresh_output());
                Err(ClassifyError::Compute(e))
            }
        }
    }

    /// One warm-up compute, then `num_runs` timed computes
    ///
    /// The reported compute time is the median when `num_runs > 1`. A failed
    /// run leaves no compute time recorded.
    pub async fn measure(&mut self, input: InputTensor, num_runs: usize) -> ClassifyResult<TimingRecord> {
        let num_runs = num_runs.max(1);
        self.timings.compute = None;
        info!(target: "imageclass-session", "- Computing... ");

        let mut input = self.compute(input).await?;
        let mut samples = Vec::with_capacity(num_runs);
        for run in 1..=num_runs {
            let start = Instant::now();
            input = self.compute(input).await?;
            let compute_ms = elapsed_ms(start);
            info!(target: "imageclass-session", "  compute time {}: {:.2} ms", run, compute_ms);
            samples.push(compute_ms);
        }

        let compute = if num_runs > 1 {
            let value = median(&samples).unwrap_or_default();
            info!(target: "imageclass-session", "  median compute time: {:.2} ms", value);
            ComputeTiming::Median(value)
        } else {
            ComputeTiming::Single(samples.last().copied().unwrap_or_default())
        };
        self.timings.compute = Some(compute);
        Ok(self.timings)
    }

    /// Record a single compute time measured by the caller
    pub fn record_compute_time(&mut self, compute_ms: f64) {
        self.timings.compute = Some(ComputeTiming::Single(compute_ms));
    }

    /// Top three classes of the latest compute
    pub fn top_classes(&self) -> ClassifyResult<[Classification; postprocess::TOP_K]> {
        let session = self.session.as_ref().ok_or(ClassifyError::NoActiveSession)?;
        let output = session.output.as_ref().ok_or(ClassifyError::NoActiveSession)?;
        postprocess::top_classes(
            output,
            &session.labels,
            session.input_options.data_type,
            &session.output_dimensions,
        )
    }

    /// Release the live session; no-op without one
    pub fn dispose(&mut self) {
        if let Some(session) = self.session.take() {
            session.dispose();
        }
        self.state = SessionState::Empty;
    }

    /// Dispose and forget the applied backend
    pub fn shutdown(&mut self) {
        self.dispose();
        self.applied_backend = None;
        info!(target: "imageclass-session", "Session manager shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{GraphHandle, RuntimeError};
    use crate::types::{DataType, Layout, ModelId};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Counters {
        loads: usize,
        builds: usize,
        computes: usize,
        disposes: usize,
    }

    struct StubNetwork {
        counters: Arc<Mutex<Counters>>,
        fail_build: bool,
    }

    #[async_trait]
    impl Network for StubNetwork {
        async fn load(&mut self, _context: &ContextOptions) -> Result<GraphHandle, RuntimeError> {
            self.counters.lock().loads += 1;
            Ok(GraphHandle::new(()))
        }

        async fn build(&mut self, _graph: GraphHandle) -> Result<(), RuntimeError> {
            self.counters.lock().builds += 1;
            if self.fail_build {
                return Err(RuntimeError::new("build rejected"));
            }
            Ok(())
        }

        async fn compute(&mut self, input: InputTensor, output: OutputBuffer) -> Result<ComputeOutputs, RuntimeError> {
            self.counters.lock().computes += 1;
            Ok(ComputeOutputs { input, output })
        }

        fn dispose(&mut self) {
            self.counters.lock().disposes += 1;
        }
    }

    struct StubRuntime {
        counters: Arc<Mutex<Counters>>,
        fail_build: bool,
    }

    #[async_trait]
    impl InferenceRuntime for StubRuntime {
        async fn set_backend(&self, _backend: Backend, _device_type: DeviceType) -> Result<(), RuntimeError> {
            Ok(())
        }

        fn create_network(&self, _kind: ModelKind, _input_options: &InputOptions) -> Box<dyn Network> {
            Box::new(StubNetwork {
                counters: self.counters.clone(),
                fail_build: self.fail_build,
            })
        }
    }

    struct StubLabels;

    #[async_trait]
    impl LabelStore for StubLabels {
        async fn fetch(&self, _label_url: &str) -> ClassifyResult<LabelSet> {
            Ok((0..1001).map(|i| format!("label{}", i)).collect())
        }
    }

    fn manager(fail_build: bool) -> (SessionLifecycleManager, Arc<Mutex<Counters>>) {
        let counters = Arc::new(Mutex::new(Counters::default()));
        let runtime: Arc<dyn InferenceRuntime> = Arc::new(StubRuntime {
            counters: counters.clone(),
            fail_build,
        });
        let registry = Arc::new(crate::registry::BuiltinModelRegistry::new(runtime.clone()));
        (
            SessionLifecycleManager::new(registry, Arc::new(StubLabels), runtime),
            counters,
        )
    }

    fn key() -> SelectionKey {
        SelectionKey {
            model: ModelId::Mobilenet,
            layout: Layout::Nchw,
            data_type: DataType::Float32,
            backend: Backend::WebNn,
            device_type: DeviceType::Gpu,
        }
    }

    #[tokio::test]
    async fn test_first_selection_rebuilds_then_reuses() {
        let (mut manager, counters) = manager(false);
        let ctx = ContextOptions::new(DeviceType::Gpu);

        assert_eq!(manager.state(), SessionState::Empty);
        assert_eq!(manager.ensure_session(&key(), &ctx).await.unwrap(), ReuseDecision::RebuildSession);
        assert_eq!(manager.state(), SessionState::Built);
        assert_eq!(manager.ensure_session(&key(), &ctx).await.unwrap(), ReuseDecision::ReuseSession);

        let c = counters.lock();
        assert_eq!((c.loads, c.builds, c.disposes), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_failed_build_disposes_partial_network() {
        let (mut manager, counters) = manager(true);
        let ctx = ContextOptions::new(DeviceType::Gpu);

        let err = manager.ensure_session(&key(), &ctx).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Build { model: ModelKind::MobilenetV2Nchw, .. }));
        assert_eq!(manager.state(), SessionState::Empty);
        assert!(!manager.has_session());
        assert_eq!(counters.lock().disposes, 1);
        assert_eq!(manager.selection_changed(&key()), ReuseDecision::RebuildSession);
    }

    #[tokio::test]
    async fn test_shutdown_is_terminal_and_idempotent() {
        let (mut manager, counters) = manager(false);
        manager
            .ensure_session(&key(), &ContextOptions::new(DeviceType::Gpu))
            .await
            .unwrap();

        manager.shutdown();
        manager.shutdown();
        assert_eq!(manager.state(), SessionState::Empty);
        assert_eq!(counters.lock().disposes, 1);
        assert!(matches!(manager.top_classes(), Err(ClassifyError::NoActiveSession)));
    }
}
