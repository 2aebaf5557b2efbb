use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::FrameSource;
use crate::errors::CaptureError;
use crate::models::Frame;
use crate::tools::{list_images, load_frame};

/// Frames read from the image files of a directory, in file-name order
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    looping: bool,
    files: Vec<PathBuf>,
    next: usize,
    opened: bool,
}

impl ImageSequenceSource {
    /// Source over the images directly inside `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            looping: false,
            files: Vec::new(),
            next: 0,
            opened: false,
        }
    }

    /// Restart from the first file after the last one
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Directory the images come from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files found by the last `open`
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<(), CaptureError> {
        self.files = list_images(&self.dir);
        if self.files.is_empty() {
            return Err(CaptureError::OpenFailed(format!(
                "no images in {}",
                self.dir.display()
            )));
        }
        self.next = 0;
        self.opened = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        if !self.opened {
            return Err(CaptureError::ReadFailed("source is not open".to_string()));
        }
        if self.next >= self.files.len() {
            if !self.looping {
                return Err(CaptureError::ReadFailed("end of sequence".to_string()));
            }
            self.next = 0;
        }
        let path = &self.files[self.next];
        self.next += 1;
        load_frame(path)
            .map_err(|e| CaptureError::ReadFailed(format!("{}: {}", path.display(), e)))
    }

    fn release(&mut self) {
        self.opened = false;
        self.files.clear();
    }

    fn describe(&self) -> String {
        format!("image sequence {}", self.dir.display())
    }
}

/// Frames served from memory, mostly for tests
#[derive(Debug, Clone, Default)]
pub struct MemoryFrameSource {
    frames: VecDeque<Frame>,
    looping: bool,
    opened: bool,
    fail_open: bool,
    reads: usize,
    releases: usize,
}

impl MemoryFrameSource {
    /// Serve `frames` once, in order
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            ..Self::default()
        }
    }

    /// Serve the frames forever, in order
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Make `open` fail, simulating a missing device
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Read attempts so far
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Times `release` was called
    pub fn releases(&self) -> usize {
        self.releases
    }
}

impl FrameSource for MemoryFrameSource {
    fn open(&mut self) -> Result<(), CaptureError> {
        if self.fail_open {
            return Err(CaptureError::OpenFailed("device unavailable".to_string()));
        }
        self.opened = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        if !self.opened {
            return Err(CaptureError::ReadFailed("source is not open".to_string()));
        }
        self.reads += 1;
        let frame = self
            .frames
            .pop_front()
            .ok_or_else(|| CaptureError::ReadFailed("no frames left".to_string()))?;
        if self.looping {
            self.frames.push_back(frame.clone());
        }
        Ok(frame)
    }

    fn release(&mut self) {
        self.opened = false;
        self.releases += 1;
    }

    fn describe(&self) -> String {
        format!("memory source ({} frames)", self.frames.len())
    }
}
