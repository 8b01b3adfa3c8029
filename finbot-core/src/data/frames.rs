//! Frame sources.
//!
//! `ImageDirSource` replays a directory of still images (a recorded session,
//! or frames dumped by a camera daemon) and `ScriptedFrames` serves an
//! in-memory sequence. The live webcam lives in `camera`.

use crate::domain::Frame;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The frame source could not produce a frame. Always fatal to the run.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("frame source exhausted")]
    Exhausted,

    #[error("failed to decode frame {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("I/O error reading frames: {0}")]
    Io(#[from] std::io::Error),
}

/// One call per tick.
pub trait FrameSource: Send {
    /// Human-readable description of the device.
    fn describe(&self) -> String;

    /// Block until the next frame is available.
    fn capture(&mut self) -> Result<Frame, CaptureError>;
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Replays the images in a directory in file-name order.
#[derive(Debug)]
pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
    looping: bool,
}

impl ImageDirSource {
    /// Scan `dir` for PNG/JPEG files. An empty directory is a device error.
    pub fn open(dir: &Path) -> Result<Self, CaptureError> {
        if !dir.is_dir() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "no PNG/JPEG frames in {}",
                dir.display()
            )));
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            next: 0,
            looping: false,
        })
    }

    /// Start over from the first file instead of reporting exhaustion.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn frame_count(&self) -> usize {
        self.files.len()
    }
}

impl FrameSource for ImageDirSource {
    fn describe(&self) -> String {
        format!("image directory {} ({} frames)", self.dir.display(), self.files.len())
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        if self.next >= self.files.len() {
            if !self.looping {
                return Err(CaptureError::Exhausted);
            }
            self.next = 0;
        }
        let path = &self.files[self.next];
        self.next += 1;

        let img = image::open(path).map_err(|e| CaptureError::Decode {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Frame::new(img.to_rgb8()))
    }
}

/// In-memory frame queue; reports `Exhausted` once drained.
#[derive(Debug, Default)]
pub struct ScriptedFrames {
    frames: VecDeque<Frame>,
}

impl ScriptedFrames {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ScriptedFrames {
    fn describe(&self) -> String {
        format!("scripted ({} frames left)", self.frames.len())
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        self.frames.pop_front().ok_or(CaptureError::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, shade: u8) {
        let img = image::RgbImage::from_pixel(8, 6, image::Rgb([shade, shade, shade]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn replays_in_name_order_then_exhausts() {
        let tmp = tempfile::tempdir().unwrap();
        write_png(tmp.path(), "frame_002.png", 200);
        write_png(tmp.path(), "frame_001.png", 10);
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let mut source = ImageDirSource::open(tmp.path()).unwrap();
        assert_eq!(source.frame_count(), 2);

        let first = source.capture().unwrap();
        assert_eq!(first.width(), 8);
        assert_eq!(first.image().get_pixel(0, 0).0, [10, 10, 10]);
        let second = source.capture().unwrap();
        assert_eq!(second.image().get_pixel(0, 0).0, [200, 200, 200]);
        assert!(matches!(source.capture(), Err(CaptureError::Exhausted)));
    }

    #[test]
    fn looping_source_wraps_around() {
        let tmp = tempfile::tempdir().unwrap();
        write_png(tmp.path(), "a.png", 1);
        let mut source = ImageDirSource::open(tmp.path()).unwrap().looping(true);
        for _ in 0..3 {
            assert!(source.capture().is_ok());
        }
    }

    #[test]
    fn empty_directory_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageDirSource::open(tmp.path()),
            Err(CaptureError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("bad.png"), b"not a png").unwrap();
        let mut source = ImageDirSource::open(tmp.path()).unwrap();
        assert!(matches!(source.capture(), Err(CaptureError::Decode { .. })));
    }

    #[test]
    fn scripted_frames_drain() {
        let mut source = ScriptedFrames::new(vec![Frame::solid(2, 2, [0, 0, 0])]);
        assert!(source.capture().is_ok());
        assert!(matches!(source.capture(), Err(CaptureError::Exhausted)));
    }
}
