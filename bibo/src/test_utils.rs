//! Synthetic frames and capillaries for tests.

#![allow(dead_code)]

use glam::DVec2;

use crate::capillary::{Capillary, Side};
use crate::error::FrameError;
use crate::geometry::Polyline;
use crate::image::{FrameSource, MemoryFrameSource, RasterImage};

/// Test-writer tracing subscriber, installed once.
pub fn init_tracing() {
    common::log_setup::init_test_logging();
}

pub fn uniform_frame(width: usize, height: usize, channels: usize, value: f32) -> RasterImage {
    RasterImage::from_fn(width, height, channels, |_, _, _| value)
}

/// Single-channel frames where pixel `(x, y)` of frame `t` is `f(x, y, t)`.
pub fn frames_from_fn(
    width: usize,
    height: usize,
    count: usize,
    f: impl Fn(usize, usize, usize) -> f32,
) -> Vec<RasterImage> {
    (0..count)
        .map(|t| RasterImage::from_fn(width, height, 1, |x, y, _| f(x, y, t)))
        .collect()
}

/// Gaussian blobs on a dark background; structure for phase correlation.
pub fn blob_frame(width: usize, height: usize, blobs: &[(f64, f64)], sigma: f64) -> RasterImage {
    RasterImage::from_fn(width, height, 1, |x, y, _| {
        let value: f64 = blobs
            .iter()
            .map(|&(cx, cy)| {
                let d2 = (x as f64 - cx).powi(2) + (y as f64 - cy).powi(2);
                200.0 * (-d2 / (2.0 * sigma * sigma)).exp()
            })
            .sum();
        value.min(255.0) as f32
    })
}

/// Deterministic noise texture; content at `(x, y)` is the texture at `(x - dx, y - dy)`,
/// so increasing `shift` moves the content right/down.
pub fn textured_frame(width: usize, height: usize, shift: (i64, i64)) -> RasterImage {
    RasterImage::from_fn(width, height, 1, |x, y, _| {
        texture(x as i64 - shift.0, y as i64 - shift.1)
    })
}

fn texture(x: i64, y: i64) -> f32 {
    let mut h = (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ (y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h ^= h >> 31;
    h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h ^= h >> 29;
    (h % 256) as f32
}

/// Vertical capillary at column `x` running from row `y0` down to row `y1`.
pub fn vertical_capillary(
    name: &str,
    side: Side,
    cage_id: usize,
    x: f64,
    y0: f64,
    y1: f64,
) -> Capillary {
    Capillary::new(
        name,
        side,
        cage_id,
        Polyline::line(DVec2::new(x, y0), DVec2::new(x, y1)),
    )
}

/// In-memory frames with one index that always fails to read.
pub struct FlakySource {
    pub inner: MemoryFrameSource,
    pub broken: usize,
}

impl FrameSource for FlakySource {
    fn frame_count(&self) -> usize {
        self.inner.frame_count()
    }

    fn timestamp_ms(&self, index: usize) -> i64 {
        self.inner.timestamp_ms(index)
    }

    fn dimensions(&self) -> Result<(usize, usize), FrameError> {
        (0..self.frame_count())
            .find_map(|index| self.read_frame(index).ok())
            .map(|frame| frame.dimensions())
            .ok_or(FrameError::OutOfRange {
                index: self.broken,
                count: self.frame_count(),
            })
    }

    fn read_frame(&self, index: usize) -> Result<RasterImage, FrameError> {
        if index == self.broken {
            return Err(FrameError::OutOfRange { index, count: 0 });
        }
        self.inner.read_frame(index)
    }
}
