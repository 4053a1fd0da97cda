// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Continuous camera classification
//!
//! One tokio task captures a frame per tick and classifies it on the shared
//! session. Stopping is cooperative: a `watch` channel carries the request
//! and the task's `JoinHandle` signals that any in-flight compute drained.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{ClassifyError, ClassifyResult};
use crate::lifecycle::SessionLifecycleManager;
use crate::preprocess;
use crate::presenter::{fps_from_compute, Presenter};

/// Live frame provider (camera)
pub trait FrameSource: Send + Sync {
    /// False once the stream has ended or was stopped
    fn is_active(&self) -> bool;

    /// False while no frame is available yet
    fn is_ready(&self) -> bool;

    fn capture(&self) -> ClassifyResult<DynamicImage>;

    /// Release the underlying stream
    fn stop(&self);
}

struct ComputingFlag(Arc<AtomicBool>);

impl ComputingFlag {
    fn raise(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag.clone())
    }
}

impl Drop for ComputingFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Everything the loop task needs
struct RenderTask {
    manager: Arc<Mutex<SessionLifecycleManager>>,
    frames: Arc<dyn FrameSource>,
    presenter: Arc<dyn Presenter>,
    computing: Arc<AtomicBool>,
    tick_interval: Duration,
}

impl RenderTask {
    async fn run(self, mut stop_rx: watch::Receiver<bool>) {
        let mut frames_rendered: u64 = 0;
        loop {
            if *stop_rx.borrow_and_update() || !self.frames.is_active() {
                break;
            }

            if self.frames.is_ready() {
                if let Err(e) = self.render_frame().await {
                    error!(target: "imageclass-session", "Render loop failed: {}", e);
                    self.presenter.alert(&e.to_string());
                    break;
                }
                frames_rendered += 1;
            }

            if Self::wait_tick(&mut stop_rx, self.tick_interval).await {
                break;
            }
        }
        debug!(target: "imageclass-session", "Render loop exited after {} frames", frames_rendered);
    }

    /// Sleep one tick; true when a stop was requested meanwhile
    async fn wait_tick(stop_rx: &mut watch::Receiver<bool>, tick: Duration) -> bool {
        let changed = tokio::select! {
            res = stop_rx.changed() => Some(res.is_ok()),
            _ = tokio::time::sleep(tick) => None,
        };
        match changed {
            None => false,
            // Sender gone
            Some(false) => true,
            Some(true) => *stop_rx.borrow_and_update(),
        }
    }

    async fn render_frame(&self) -> ClassifyResult<()> {
        let image = self.frames.capture()?;

        let mut manager = self.manager.lock().await;
        let options = manager
            .input_options()
            .cloned()
            .ok_or(ClassifyError::NoActiveSession)?;
        let input = preprocess::input_tensor(&image, &options)?;

        let start = Instant::now();
        {
            let _computing = ComputingFlag::raise(&self.computing);
            manager.compute(input).await?;
        }
        let compute_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(target: "imageclass-session", "  done in {:.2} ms.", compute_ms);

        manager.record_compute_time(compute_ms);
        let classes = manager.top_classes()?;
        let timings = manager.timings();
        drop(manager);

        self.presenter.timings(&timings);
        self.presenter.classes(&classes);
        self.presenter.fps(fps_from_compute(compute_ms));
        Ok(())
    }
}

/// Starts and stops the per-frame classification task
pub struct RenderLoopController {
    tick_interval: Duration,
    stop_timeout: Option<Duration>,
    stop_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
    frames: Option<Arc<dyn FrameSource>>,
    computing: Arc<AtomicBool>,
}

impl RenderLoopController {
    pub fn new(tick_interval: Duration, stop_timeout: Option<Duration>) -> Self {
        Self {
            tick_interval,
            stop_timeout,
            stop_tx: None,
            handle: None,
            frames: None,
            computing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the loop task is alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Whether a compute is in flight right now
    pub fn is_computing(&self) -> bool {
        self.computing.load(Ordering::SeqCst)
    }

    /// Start rendering; returns false if already running
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        &mut self,
        manager: Arc<Mutex<SessionLifecycleManager>>,
        frames: Arc<dyn FrameSource>,
        presenter: Arc<dyn Presenter>,
    ) -> bool {
        if self.is_running() {
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = RenderTask {
            manager,
            frames: frames.clone(),
            presenter,
            computing: self.computing.clone(),
            tick_interval: self.tick_interval,
        };

        info!(target: "imageclass-session", "Starting render loop (tick {:?})", self.tick_interval);
        self.handle = Some(tokio::spawn(task.run(stop_rx)));
        self.stop_tx = Some(stop_tx);
        self.frames = Some(frames);
        true
    }

    /// Request a stop and wait for the loop to drain
    ///
    /// Returns at once when no compute is in flight; otherwise after it
    /// completes. No-op when the loop is not running.
    ///
    /// # Errors
    /// * `ClassifyError::StopTimeout` - The configured bound elapsed first;
    ///   calling `stop` again keeps waiting on the same task
    pub async fn stop(&mut self) -> ClassifyResult<()> {
        if let Some(stop_tx) = &self.stop_tx {
            stop_tx.send_replace(true);
        }
        if let Some(frames) = self.frames.take() {
            frames.stop();
        }

        let Some(handle) = self.handle.as_mut() else {
            return Ok(());
        };

        let joined = match self.stop_timeout {
            Some(limit) => tokio::time::timeout(limit, handle)
                .await
                .map_err(|_| ClassifyError::StopTimeout(limit))?,
            None => handle.await,
        };
        if let Err(e) = joined {
            warn!(target: "imageclass-session", "Render loop task ended abnormally: {}", e);
        }

        self.handle = None;
        self.stop_tx = None;
        info!(target: "imageclass-session", "Render loop stopped");
        Ok(())
    }
}
