use std::path::PathBuf;

use crate::error::FrameError;
use crate::image::RasterImage;

/// Ordered, random-access provider of the frames of one acquisition.
pub trait FrameSource: Sync {
    fn frame_count(&self) -> usize;

    /// Acquisition time of frame `index`, milliseconds.
    fn timestamp_ms(&self, index: usize) -> i64;

    /// Size of the first readable frame; unreadable frames are skipped.
    fn dimensions(&self) -> Result<(usize, usize), FrameError>;

    fn read_frame(&self, index: usize) -> Result<RasterImage, FrameError>;

    fn timestamps_ms(&self) -> Vec<i64> {
        (0..self.frame_count()).map(|i| self.timestamp_ms(i)).collect()
    }
}

/// Frames decoded on demand from an ordered list of image files.
#[derive(Debug, Clone)]
pub struct FileFrameSource {
    paths: Vec<PathBuf>,
    first_ms: i64,
    interval_ms: i64,
}

impl FileFrameSource {
    pub fn new(paths: Vec<PathBuf>, interval_ms: i64) -> Self {
        Self {
            paths,
            first_ms: 0,
            interval_ms,
        }
    }

    pub fn with_first_timestamp(mut self, first_ms: i64) -> Self {
        self.first_ms = first_ms;
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn path(&self, index: usize) -> Result<&PathBuf, FrameError> {
        self.paths.get(index).ok_or(FrameError::OutOfRange {
            index,
            count: self.paths.len(),
        })
    }
}

impl FrameSource for FileFrameSource {
    fn frame_count(&self) -> usize {
        self.paths.len()
    }

    fn timestamp_ms(&self, index: usize) -> i64 {
        self.first_ms + index as i64 * self.interval_ms
    }

    fn dimensions(&self) -> Result<(usize, usize), FrameError> {
        let mut first_error = None;
        for path in &self.paths {
            match ::image::image_dimensions(path) {
                Ok((w, h)) => return Ok((w as usize, h as usize)),
                Err(source) => {
                    tracing::warn!(path = %path.display(), error = %source, "frame header unreadable");
                    if first_error.is_none() {
                        first_error = Some(FrameError::Open {
                            path: path.clone(),
                            source,
                        });
                    }
                }
            }
        }
        Err(first_error.unwrap_or(FrameError::OutOfRange { index: 0, count: 0 }))
    }

    fn read_frame(&self, index: usize) -> Result<RasterImage, FrameError> {
        let path = self.path(index)?;
        let decoded = ::image::open(path).map_err(|source| FrameError::Open {
            path: path.clone(),
            source,
        })?;
        tracing::trace!(frame = index, path = %path.display(), "decoded frame");
        Ok(RasterImage::from_dynamic(&decoded))
    }
}

/// Frames already held in memory.
#[derive(Debug, Clone)]
pub struct MemoryFrameSource {
    frames: Vec<RasterImage>,
    timestamps: Vec<i64>,
}

impl MemoryFrameSource {
    /// Frames spaced `interval_ms` apart, starting at 0.
    pub fn new(frames: Vec<RasterImage>, interval_ms: i64) -> Self {
        let timestamps = (0..frames.len() as i64).map(|i| i * interval_ms).collect();
        Self { frames, timestamps }
    }

    pub fn with_timestamps(frames: Vec<RasterImage>, timestamps: Vec<i64>) -> Self {
        assert_eq!(
            frames.len(),
            timestamps.len(),
            "one timestamp per frame required"
        );
        assert!(
            timestamps.windows(2).all(|w| w[0] <= w[1]),
            "timestamps must be sorted"
        );
        Self { frames, timestamps }
    }
}

impl FrameSource for MemoryFrameSource {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn timestamp_ms(&self, index: usize) -> i64 {
        self.timestamps[index]
    }

    fn dimensions(&self) -> Result<(usize, usize), FrameError> {
        self.frames
            .first()
            .map(|f| f.dimensions())
            .ok_or(FrameError::OutOfRange { index: 0, count: 0 })
    }

    fn read_frame(&self, index: usize) -> Result<RasterImage, FrameError> {
        self.frames
            .get(index)
            .cloned()
            .ok_or(FrameError::OutOfRange {
                index,
                count: self.frames.len(),
            })
    }
}
