//! Sampling masks along a capillary.
//!
//! A capillary polyline is rasterized into ordered pixel centers; each center
//! becomes a disk-shaped neighborhood (a [`Mask`]). The position of a mask in the
//! list is the row index of the kymograph, so the order is the polyline's
//! traversal order and never changes downstream.


use common::Buffer2;
use glam::I64Vec2;

use crate::geometry::bresenham::rasterize_polyline;
use crate::geometry::Polyline;
use crate::image::RasterImage;

/// Pixels `(x, y)` averaged into one kymograph row. May be empty near image borders.
pub type Mask = Vec<(usize, usize)>;

/// Image bounds and disk radius the masks of a geometry are built for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskGeometry {
    pub width: usize,
    pub height: usize,
    pub radius: f64,
}

impl MaskGeometry {
    pub fn new(width: usize, height: usize, radius: f64) -> Self {
        assert!(radius >= 0.0, "mask radius must be non-negative, got {radius}");
        Self {
            width,
            height,
            radius,
        }
    }
}

/// Offsets `(dx, dy)` with `dx² + dy² <= radius²`, row-major.
pub fn disk_offsets(radius: f64) -> Vec<I64Vec2> {
    let r = radius.floor() as i64;
    let r2 = radius * radius;
    let mut out = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if (dx * dx + dy * dy) as f64 <= r2 {
                out.push(I64Vec2::new(dx, dy));
            }
        }
    }
    out
}

/// One mask per rasterized pixel of `polyline`, clipped to the image.
///
/// Returns an empty list for polylines with fewer than two points; callers treat
/// that as "no geometry this frame" and skip sampling.
pub fn build_masks(polyline: &Polyline, geometry: &MaskGeometry) -> Vec<Mask> {
    let centers = rasterize_polyline(polyline.points());
    if centers.is_empty() {
        return Vec::new();
    }

    let offsets = disk_offsets(geometry.radius);
    let (w, h) = (geometry.width as i64, geometry.height as i64);
    centers
        .iter()
        .map(|&center| {
            offsets
                .iter()
                .map(|&o| center + o)
                .filter(|p| p.x >= 0 && p.y >= 0 && p.x < w && p.y < h)
                .map(|p| (p.x as usize, p.y as usize))
                .collect()
        })
        .collect()
}

/// Mean of `plane` over `mask`; 0 for an empty mask.
#[inline]
pub fn mask_mean(plane: &Buffer2<f32>, mask: &Mask) -> f32 {
    if mask.is_empty() {
        return 0.0;
    }
    let sum: f32 = mask.iter().map(|&(x, y)| plane[(x, y)]).sum();
    sum / mask.len() as f32
}

/// Per-channel mask means: `result[channel][row]`.
pub fn sample_masks(image: &RasterImage, masks: &[Mask]) -> Vec<Vec<f32>> {
    image
        .planes()
        .iter()
        .map(|plane| masks.iter().map(|m| mask_mean(plane, m)).collect())
        .collect()
}

/// Samples `masks` into a one-pixel-wide image, row = mask index.
pub fn profile_image(image: &RasterImage, masks: &[Mask]) -> RasterImage {
    let planes = sample_masks(image, masks)
        .into_iter()
        .map(|column| Buffer2::new(1, masks.len(), column))
        .collect();
    RasterImage::from_planes(planes)
}
