//! Kymograph assembly: one time-vs-position raster per capillary.
//!
//! Every time bin is mapped to its nearest source frame. One pool task per bin
//! decodes that frame once and samples it through the masks of every capillary
//! valid at that frame. The task returns the columns it sampled; once the whole
//! batch resolved, the columns are written into each capillary's private planes.
//! A failed bin leaves its column at zero.


use common::{BatchReport, Buffer2, WorkerPool};
use serde::{Deserialize, Serialize};

use crate::capillary::Capillary;
use crate::error::{Error, FrameError};
use crate::image::{FrameSource, RasterImage};
use crate::mask::{sample_masks, MaskGeometry};
use crate::timing::BinTiming;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KymographConfig {
    /// Radius of the disk averaged around each rasterized capillary pixel.
    pub mask_radius: f64,
}

impl Default for KymographConfig {
    fn default() -> Self {
        Self { mask_radius: 1.0 }
    }
}

impl KymographConfig {
    pub fn validate(&self) {
        assert!(
            self.mask_radius >= 0.0 && self.mask_radius.is_finite(),
            "mask_radius must be a finite non-negative number, got {}",
            self.mask_radius
        );
    }
}

/// Per-channel columns of every capillary for one bin; `None` where a capillary
/// has no geometry at that frame.
type BinColumns = Vec<Option<Vec<Vec<f32>>>>;

/// Builds the kymograph of every capillary, replacing previous ones.
///
/// Also rebuilds the masks of every geometry entry for the frame size.
pub fn build_kymographs(
    capillaries: &mut [Capillary],
    source: &dyn FrameSource,
    timing: &BinTiming,
    config: &KymographConfig,
) -> Result<BatchReport, Error> {
    config.validate();
    if source.frame_count() == 0 {
        return Err(Error::NoFrames);
    }
    let bin_count = timing.bin_count();
    if bin_count == 0 {
        return Err(Error::EmptyTiming);
    }

    let (width, height) = source.dimensions()?;
    let geometry = MaskGeometry::new(width, height, config.mask_radius);
    for capillary in capillaries.iter_mut() {
        capillary.along_t.rebuild_masks(&geometry);
    }

    let frames = timing.frames_for_bins(&source.timestamps_ms());
    let pool = WorkerPool::new("kymograph")?;
    tracing::info!(
        bins = bin_count,
        capillaries = capillaries.len(),
        threads = pool.threads(),
        "building kymographs"
    );

    let shared: &[Capillary] = capillaries;
    let results = pool.run(&frames, |bin, frame| -> Result<BinColumns, FrameError> {
        let frame = frame.ok_or(FrameError::OutOfRange { index: bin, count: 0 })?;
        let image = source.read_frame(frame)?;
        if image.dimensions() != (width, height) {
            return Err(FrameError::DimensionMismatch {
                expected: (width, height),
                actual: image.dimensions(),
            });
        }
        Ok(sample_bin(shared, &image, frame))
    });
    let report = BatchReport::from_results(&results);

    let channels = results
        .iter()
        .flatten()
        .flat_map(|columns| columns.iter().flatten())
        .map(|channels| channels.len())
        .max()
        .unwrap_or(1);

    for (index, capillary) in capillaries.iter_mut().enumerate() {
        let rows = capillary.along_t.max_mask_count();
        let mut planes = vec![Buffer2::<f32>::new_default(bin_count, rows); channels];
        for (bin, result) in results.iter().enumerate() {
            let Ok(columns) = result else { continue };
            let Some(sampled) = &columns[index] else { continue };
            for (plane, column) in planes.iter_mut().zip(sampled) {
                plane.set_column(bin, column);
            }
        }
        if rows == 0 {
            tracing::warn!(capillary = %capillary.name, "no sampling masks, kymograph is empty");
        }
        capillary.kymograph = Some(RasterImage::from_planes(planes));
    }

    tracing::info!(
        completed = report.completed,
        failed = report.failed,
        "kymographs built"
    );
    Ok(report)
}

fn sample_bin(capillaries: &[Capillary], image: &RasterImage, frame: usize) -> BinColumns {
    capillaries
        .iter()
        .map(|capillary| {
            capillary
                .along_t
                .at(frame)
                .filter(|entry| !entry.masks.is_empty())
                .map(|entry| sample_masks(image, &entry.masks))
        })
        .collect()
}

/// Pads every kymograph with zeros to the largest width and height among them.
///
/// Padding rows are indistinguishable from liquid under `Comparison::LessThan`,
/// so call this after levels have been detected.
pub fn normalize_kymographs(capillaries: &mut [Capillary]) {
    let (width, height) = capillaries
        .iter()
        .filter_map(|c| c.kymograph.as_ref())
        .fold((0, 0), |(w, h), k| (w.max(k.width()), h.max(k.height())));

    for kymograph in capillaries.iter_mut().filter_map(|c| c.kymograph.as_mut()) {
        if kymograph.dimensions() != (width, height) {
            *kymograph = kymograph.padded(width, height);
        }
    }
}
