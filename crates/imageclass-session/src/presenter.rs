// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Presentation surface
//!
//! The session layer reports progress, results and failures through these
//! traits; a UI (or the CLI) decides how to show them.

use std::sync::Arc;

use tracing::{error, info};

use crate::types::{Classification, ProgressStages, TimingRecord};

/// Receives load/build/compute stage changes
pub trait ProgressListener: Send + Sync {
    fn progress(&self, stages: ProgressStages);
}

/// Full result surface used by the pipeline and render loop
pub trait Presenter: ProgressListener {
    /// Ranked predictions for the latest frame
    fn classes(&self, classes: &[Classification]);

    fn timings(&self, timings: &TimingRecord);

    /// Frames per second derived from the latest compute
    fn fps(&self, fps: u32);

    /// User-visible error message
    fn alert(&self, message: &str);

    fn set_controls_enabled(&self, enabled: bool);

    /// Show or hide the result panel
    fn set_results_visible(&self, visible: bool);
}

/// Forwards stage changes to a presenter
pub struct PresenterProgress(pub Arc<dyn Presenter>);

impl ProgressListener for PresenterProgress {
    fn progress(&self, stages: ProgressStages) {
        self.0.progress(stages);
    }
}

/// Frames per second for one compute, rounded to the nearest integer
pub fn fps_from_compute(compute_ms: f64) -> u32 {
    if compute_ms <= 0.0 || !compute_ms.is_finite() {
        return 0;
    }
    (1000.0 / compute_ms).round() as u32
}

/// Presenter that writes everything to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresenter;

impl ProgressListener for TracingPresenter {
    fn progress(&self, stages: ProgressStages) {
        tracing::debug!(
            target: "imageclass-session",
            "Progress: load={:?} build={:?} compute={:?}",
            stages.load,
            stages.build,
            stages.compute
        );
    }
}

impl Presenter for TracingPresenter {
    fn classes(&self, classes: &[Classification]) {
        for class in classes {
            info!(target: "imageclass-session", "  #{} {}", class.rank + 1, class);
        }
    }

    fn timings(&self, timings: &TimingRecord) {
        info!(target: "imageclass-session", "{}", timings);
    }

    fn fps(&self, fps: u32) {
        info!(target: "imageclass-session", "{} FPS", fps);
    }

    fn alert(&self, message: &str) {
        error!(target: "imageclass-session", "{}", message);
    }

    fn set_controls_enabled(&self, _enabled: bool) {}

    fn set_results_visible(&self, _visible: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_rounding() {
        assert_eq!(fps_from_compute(16.0), 63);
        assert_eq!(fps_from_compute(33.4), 30);
        assert_eq!(fps_from_compute(0.0), 0);
    }
}
