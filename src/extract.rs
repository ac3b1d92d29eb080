//! Video-still source boundary.
//!
//! The codec does not demux video; an external tool extracts still images
//! at requested frame indices. This module defines the exact interface
//! the codec needs from that collaborator, plus a PNG-directory
//! implementation used by the CLI and tests, so the pipeline can be
//! exercised end to end without a video container.

use crate::image::ImageData;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors for individual still extractions.
///
/// Reported per index, never as a whole-call failure: one unreadable
/// still must not prevent the remaining frames from being decoded.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No still exists at the requested index.
    #[error("no still at frame index {0}")]
    NotFound(u32),
    /// The still could not be read or decoded as an image.
    #[error("failed to load still {index}: {reason}")]
    LoadFailed {
        /// Requested frame index.
        index: u32,
        /// Underlying failure description.
        reason: String,
    },
}

/// One extracted still image.
#[derive(Debug, Clone)]
pub struct Still {
    /// Frame index in the source sequence.
    pub index: u32,
    /// Timestamp of the still in seconds, derived from the fps hint.
    pub timestamp_secs: f64,
    /// Pixel data.
    pub image: ImageData,
}

/// Source of still images sampled from a frame sequence.
///
/// Implementations return one `Result` per requested index; a failed
/// index is an entry in the output, not an error for the whole call.
pub trait StillSource {
    /// Extracts stills at the given frame indices. `fps_hint` lets
    /// timestamp-seeking implementations map indices to times.
    fn stills(&mut self, indices: &[u32], fps_hint: f64) -> Vec<Result<Still, ExtractError>>;

    /// Number of stills this source can provide, if known.
    fn len_hint(&self) -> Option<usize> {
        None
    }
}

/// Still source backed by a directory of numbered PNG files
/// (`frame_00000.png`, `frame_00001.png`, ...), the layout the CLI's
/// encode step produces.
#[derive(Debug)]
pub struct PngDirectorySource {
    dir: PathBuf,
}

impl PngDirectorySource {
    /// Creates a source over the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File name used for a given frame index.
    pub fn frame_path(dir: &Path, index: u32) -> PathBuf {
        dir.join(format!("frame_{index:05}.png"))
    }

    fn load(&self, index: u32) -> Result<ImageData, ExtractError> {
        let path = Self::frame_path(&self.dir, index);
        if !path.exists() {
            return Err(ExtractError::NotFound(index));
        }
        let img = image::open(&path)
            .map_err(|e| ExtractError::LoadFailed {
                index,
                reason: e.to_string(),
            })?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Ok(ImageData::new(img.into_raw(), width, height))
    }

    /// Counts consecutively numbered frames starting at index 0.
    pub fn count_frames(&self) -> u32 {
        let mut n = 0;
        while Self::frame_path(&self.dir, n).exists() {
            n += 1;
        }
        n
    }
}

impl StillSource for PngDirectorySource {
    fn stills(&mut self, indices: &[u32], fps_hint: f64) -> Vec<Result<Still, ExtractError>> {
        indices
            .iter()
            .map(|&index| {
                self.load(index).map(|image| Still {
                    index,
                    timestamp_secs: if fps_hint > 0.0 {
                        index as f64 / fps_hint
                    } else {
                        0.0
                    },
                    image,
                })
            })
            .collect()
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.count_frames() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory source used to exercise the per-index failure contract.
    struct MemorySource {
        frames: Vec<Option<ImageData>>,
    }

    impl StillSource for MemorySource {
        fn stills(&mut self, indices: &[u32], fps_hint: f64) -> Vec<Result<Still, ExtractError>> {
            indices
                .iter()
                .map(|&index| {
                    self.frames
                        .get(index as usize)
                        .and_then(|f| f.clone())
                        .map(|image| Still {
                            index,
                            timestamp_secs: index as f64 / fps_hint,
                            image,
                        })
                        .ok_or(ExtractError::NotFound(index))
                })
                .collect()
        }
    }

    #[test]
    fn test_per_index_failures_do_not_poison_call() {
        let frame = ImageData::new(vec![255u8; 2 * 2 * 4], 2, 2);
        let mut source = MemorySource {
            frames: vec![Some(frame.clone()), None, Some(frame)],
        };

        let results = source.stills(&[0, 1, 2], 30.0);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(ExtractError::NotFound(1))));
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_timestamp_from_fps_hint() {
        let frame = ImageData::new(vec![255u8; 4], 1, 1);
        let mut source = MemorySource {
            frames: vec![Some(frame.clone()), Some(frame.clone()), Some(frame)],
        };
        let results = source.stills(&[2], 30.0);
        let still = results[0].as_ref().unwrap();
        assert!((still.timestamp_secs - 2.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_directory_reports_not_found() {
        let mut source = PngDirectorySource::new("/nonexistent/qrframe-test");
        let results = source.stills(&[0], 30.0);
        assert!(matches!(results[0], Err(ExtractError::NotFound(0))));
        assert_eq!(source.len_hint(), Some(0));
    }
}
