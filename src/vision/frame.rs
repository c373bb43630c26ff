use std::path::PathBuf;

use crate::{Error, Result};

pub type Frame = image::DynamicImage;

/// Camera capability. Blocking; called from the sampling thread only.
pub trait FrameSource: Send {
    fn capture(&mut self) -> Result<Frame>;
}

/// Reads the most recent frame a camera daemon keeps writing to disk.
pub struct SnapshotFrameSource {
    path: PathBuf,
}

impl SnapshotFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FrameSource for SnapshotFrameSource {
    fn capture(&mut self) -> Result<Frame> {
        image::open(&self.path)
            .map_err(|e| Error::Capture(format!("{}: {}", self.path.display(), e)))
    }
}
