//! Directory frame source
//!
//! Plays the images of a directory back in file-name order as if they came
//! from a camera, optionally looping.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{bail, Context, Result};
use image::DynamicImage;
use imageclass_session::{ClassifyError, ClassifyResult, FrameSource};
use tracing::{debug, info};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp"];

/// Camera stand-in backed by image files
pub struct DirectoryFrameSource {
    frames: Vec<PathBuf>,
    next: AtomicUsize,
    looping: bool,
    active: AtomicBool,
}

impl DirectoryFrameSource {
    /// Collect the image files of `dir`
    ///
    /// # Errors
    /// Fails when the directory cannot be read or holds no images.
    pub fn open(dir: impl AsRef<Path>, looping: bool) -> Result<Self> {
        let dir = dir.as_ref();
        let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory: {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();
        frames.sort();

        if frames.is_empty() {
            bail!("No image files found in {}", dir.display());
        }
        info!(target: "imageclass-cli", "Opened {} frames from {}", frames.len(), dir.display());

        Ok(Self {
            frames,
            next: AtomicUsize::new(0),
            looping,
            active: AtomicBool::new(true),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frames handed out so far
    pub fn frames_served(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }
}

fn is_image(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

impl FrameSource for DirectoryFrameSource {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && (self.looping || self.frames_served() < self.frames.len())
    }

    fn is_ready(&self) -> bool {
        self.is_active()
    }

    fn capture(&self) -> ClassifyResult<DynamicImage> {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        if !self.looping && index >= self.frames.len() {
            return Err(ClassifyError::NoInput("camera"));
        }
        let path = &self.frames[index % self.frames.len()];
        debug!(target: "imageclass-cli", "Frame {}: {}", index, path.display());
        Ok(image::open(path)?)
    }

    fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}
