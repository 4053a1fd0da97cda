// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Classification pipeline: the event handlers behind the demo controls.

Each handler updates the current selection and, where the demo would,
runs the pipeline. `run` is the error boundary: failures are logged,
shown to the user through the presenter, and the controls are re-enabled
whatever happened.

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use imageclass_config::ImageClassConfig;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::{ClassifyError, ClassifyResult};
use crate::lifecycle::SessionLifecycleManager;
use crate::preprocess;
use crate::presenter::{Presenter, PresenterProgress};
use crate::render_loop::{FrameSource, RenderLoopController};
use crate::types::{
    Backend, ContextOptions, DataType, DeviceType, InputKind, Layout, ModelId, PowerPreference, ProgressStages,
    SelectionKey,
};

/// Runtime knobs resolved from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub backend: Backend,
    pub device_type: DeviceType,
    pub data_type: DataType,
    /// Overrides the device's default layout
    pub layout: Option<Layout>,
    pub model: Option<ModelId>,
    pub power_preference: Option<PowerPreference>,
    pub num_threads: Option<u32>,
    pub num_runs: usize,
    pub tick_interval: Duration,
    pub stop_timeout: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            backend: Backend::Polyfill,
            device_type: DeviceType::Cpu,
            data_type: DataType::Float32,
            layout: None,
            model: None,
            power_preference: None,
            num_threads: None,
            num_runs: 1,
            tick_interval: Duration::from_millis(16),
            stop_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl PipelineSettings {
    /// Interpret a validated configuration
    ///
    /// # Errors
    /// * `ClassifyError::InvalidSelection` - A name is not a known identifier
    pub fn from_config(config: &ImageClassConfig) -> ClassifyResult<Self> {
        Ok(Self {
            backend: config.runtime.backend.parse()?,
            device_type: config.runtime.device_type.parse()?,
            data_type: config.model.data_type.parse()?,
            layout: config.model.layout.as_deref().map(str::parse).transpose()?,
            model: config.model.name.as_deref().map(str::parse).transpose()?,
            power_preference: config.runtime.power_preference.as_deref().map(str::parse).transpose()?,
            num_threads: config.runtime.num_threads,
            num_runs: config.benchmark.num_runs.max(1) as usize,
            tick_interval: Duration::from_millis(config.render.tick_interval_ms.max(1)),
            stop_timeout: config.render.stop_timeout_ms.map(Duration::from_millis),
        })
    }

    pub fn context_options(&self, device_type: DeviceType) -> ContextOptions {
        ContextOptions {
            device_type,
            power_preference: self.power_preference,
            num_threads: self.num_threads,
        }
    }
}

/// UI-facing controller over one session manager
pub struct ClassificationPipeline {
    manager: Arc<Mutex<SessionLifecycleManager>>,
    presenter: Arc<dyn Presenter>,
    render_loop: RenderLoopController,
    settings: PipelineSettings,

    backend: Backend,
    device_type: DeviceType,
    layout: Layout,
    data_type: DataType,
    model: Option<ModelId>,

    input_kind: InputKind,
    image: Option<DynamicImage>,
    camera: Option<Arc<dyn FrameSource>>,
}

impl ClassificationPipeline {
    /// Load and build stages go to `presenter` unless the manager already
    /// has a progress listener.
    pub fn new(manager: SessionLifecycleManager, presenter: Arc<dyn Presenter>, settings: PipelineSettings) -> Self {
        let manager = if manager.has_progress() {
            manager
        } else {
            manager.with_progress(Arc::new(PresenterProgress(presenter.clone())))
        };
        let layout = settings
            .layout
            .unwrap_or_else(|| Layout::default_for_device(settings.device_type));
        Self {
            manager: Arc::new(Mutex::new(manager)),
            presenter,
            render_loop: RenderLoopController::new(settings.tick_interval, settings.stop_timeout),
            backend: settings.backend,
            device_type: settings.device_type,
            layout,
            data_type: settings.data_type,
            model: settings.model,
            input_kind: InputKind::Image,
            image: None,
            camera: None,
            settings,
        }
    }

    /// Shared handle to the session manager
    pub fn manager(&self) -> Arc<Mutex<SessionLifecycleManager>> {
        self.manager.clone()
    }

    pub fn input_kind(&self) -> InputKind {
        self.input_kind
    }

    pub fn is_rendering(&self) -> bool {
        self.render_loop.is_running()
    }

    /// Current selection, if a model is chosen
    pub fn selection(&self) -> Option<SelectionKey> {
        self.model.map(|model| SelectionKey {
            model,
            layout: self.layout,
            data_type: self.data_type,
            backend: self.backend,
            device_type: self.device_type,
        })
    }

    async fn stop_camera(&mut self) -> ClassifyResult<()> {
        if self.input_kind == InputKind::Camera {
            self.render_loop.stop().await?;
        }
        Ok(())
    }

    /// Switch backend and device
    ///
    /// Picks the device's default layout and a precision it supports, and
    /// clears the model choice. Nothing is rebuilt until a model is picked.
    pub async fn select_backend(&mut self, backend: Backend, device_type: DeviceType) -> ClassifyResult<()> {
        self.stop_camera().await?;
        self.layout = Layout::default_for_device(device_type);
        self.backend = backend;
        self.device_type = device_type;

        let supported = device_type.supported_data_types();
        if !supported.contains(&self.data_type) {
            self.data_type = supported[0];
        }
        self.model = None;
        info!(target: "imageclass-session", "Backend {}_{}, layout {}, precision {}", backend, device_type, self.layout, self.data_type);
        Ok(())
    }

    /// Choose precision; clears the model choice
    ///
    /// # Errors
    /// * `ClassifyError::InvalidSelection` - The device does not offer it
    pub fn select_data_type(&mut self, data_type: DataType) -> ClassifyResult<()> {
        if !self.device_type.supported_data_types().contains(&data_type) {
            return Err(ClassifyError::InvalidSelection {
                field: "data type",
                value: format!("{} on {}", data_type, self.device_type),
            });
        }
        self.data_type = data_type;
        self.model = None;
        Ok(())
    }

    /// Choose a model and run
    pub async fn select_model(&mut self, model: ModelId) -> ClassifyResult<()> {
        self.stop_camera().await?;
        self.model = Some(model);
        self.run().await
    }

    /// Leave camera mode and classify the still image; no-op in image mode
    pub async fn use_image(&mut self) -> ClassifyResult<()> {
        if self.input_kind != InputKind::Camera {
            return Ok(());
        }
        self.render_loop.stop().await?;
        self.input_kind = InputKind::Image;
        self.run().await
    }

    /// Replace the still image and run
    pub async fn set_image(&mut self, image: DynamicImage) -> ClassifyResult<()> {
        self.image = Some(image);
        self.run().await
    }

    /// Enter camera mode on `frames` and run; no-op in camera mode
    pub async fn use_camera(&mut self, frames: Arc<dyn FrameSource>) -> ClassifyResult<()> {
        if self.input_kind == InputKind::Camera {
            return Ok(());
        }
        self.input_kind = InputKind::Camera;
        self.camera = Some(frames);
        self.run().await
    }

    /// Run the pipeline for the current selection
    ///
    /// Does nothing until a model is chosen. Errors are logged and alerted
    /// before being returned; controls are re-enabled in every case.
    pub async fn run(&mut self) -> ClassifyResult<()> {
        let Some(key) = self.selection() else {
            debug!(target: "imageclass-session", "No model selected");
            return Ok(());
        };

        self.presenter.set_controls_enabled(false);
        let result = self.run_selection(&key).await;
        if let Err(e) = &result {
            error!(target: "imageclass-session", "Classification of {} failed: {}", key, e);
            self.presenter.alert(&e.to_string());
        }
        self.presenter.set_controls_enabled(true);
        result
    }

    async fn run_selection(&mut self, key: &SelectionKey) -> ClassifyResult<()> {
        let context_options = self.settings.context_options(key.device_type);
        let mut manager = self.manager.lock().await;
        manager.ensure_session(key, &context_options).await?;
        self.presenter.progress(ProgressStages::COMPUTING);

        match self.input_kind {
            InputKind::Image => {
                let image = self.image.as_ref().ok_or(ClassifyError::NoInput("image"))?;
                let options = manager.input_options().cloned().ok_or(ClassifyError::NoActiveSession)?;
                let input = preprocess::input_tensor(image, &options)?;
                let timings = manager.measure(input, self.settings.num_runs).await?;
                let classes = manager.top_classes()?;
                drop(manager);

                self.presenter.progress(ProgressStages::DONE);
                self.presenter.set_results_visible(true);
                self.presenter.classes(&classes);
                self.presenter.timings(&timings);
            }
            InputKind::Camera => {
                drop(manager);
                let frames = self.camera.clone().ok_or(ClassifyError::NoInput("camera"))?;
                self.render_loop
                    .start(self.manager.clone(), frames, self.presenter.clone());
                self.presenter.progress(ProgressStages::DONE);
                self.presenter.set_results_visible(true);
            }
        }
        Ok(())
    }

    /// Stop rendering and release the session
    pub async fn shutdown(&mut self) -> ClassifyResult<()> {
        self.render_loop.stop().await?;
        self.manager.lock().await.shutdown();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_default_config() {
        let settings = PipelineSettings::from_config(&ImageClassConfig::default()).unwrap();
        assert_eq!(settings.backend, Backend::Polyfill);
        assert_eq!(settings.device_type, DeviceType::Cpu);
        assert_eq!(settings.num_runs, 1);
        assert_eq!(settings.stop_timeout, Some(Duration::from_secs(10)));
        assert_eq!(settings.context_options(DeviceType::Cpu), ContextOptions::new(DeviceType::Cpu));
    }

    #[test]
    fn test_settings_reject_unknown_names() {
        let mut config = ImageClassConfig::default();
        config.model.name = Some("alexnet".to_string());
        assert!(matches!(
            PipelineSettings::from_config(&config),
            Err(ClassifyError::InvalidSelection { field: "model", .. })
        ));
    }

    #[test]
    fn test_settings_carry_context_hints() {
        let mut config = ImageClassConfig::default();
        config.runtime.power_preference = Some("low-power".to_string());
        config.runtime.num_threads = Some(4);
        config.model.layout = Some("nchw".to_string());
        let settings = PipelineSettings::from_config(&config).unwrap();
        let ctx = settings.context_options(DeviceType::Gpu);
        assert_eq!(ctx.power_preference, Some(PowerPreference::LowPower));
        assert_eq!(ctx.num_threads, Some(4));
        assert_eq!(settings.layout, Some(Layout::Nchw));
    }
}
