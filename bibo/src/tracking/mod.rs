//! Capillary tracking across frames by phase correlation.
//!
//! Each step crops the previous and the current frame around the capillary's
//! previous ROI, estimates their translation and moves the ROI by it. Steps are
//! strictly sequential per capillary: the ROI tracked at frame N seeds frame
//! N + 1. Within one step all capillaries are tracked in parallel.
//!
//! A step that cannot be measured (crop too small, weak correlation, missing
//! frame) copies the previous ROI forward unchanged.

mod mismatch;
mod phase_correlation;

#[cfg(test)]
mod tests;

pub use mismatch::{
    check_length, FixedDecision, LengthMismatch, LengthTolerance, MismatchDecision,
    MismatchResolver,
};
pub use phase_correlation::{Correlation, PhaseCorrelationConfig, PhaseCorrelator, SubpixelMethod};

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::ops::RangeInclusive;

use common::{StopFlag, WorkerPool};
use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::capillary::{AlongT, Capillary};
use crate::error::Error;
use crate::geometry::Polyline;
use crate::image::{FrameSource, RasterImage};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Whether a full analysis run tracks capillaries before building kymographs.
    pub enabled: bool,
    /// Pixels added around the ROI bounding box.
    pub margin: usize,
    pub min_crop_width: usize,
    pub min_crop_height: usize,
    /// Channel correlated.
    pub channel: usize,
    pub correlation: PhaseCorrelationConfig,
    pub length_tolerance: LengthTolerance,
    /// Decision applied by batch runs when backward tracking finds a length mismatch.
    pub on_length_mismatch: MismatchDecision,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            margin: 20,
            min_crop_width: 32,
            min_crop_height: 16,
            channel: 0,
            correlation: PhaseCorrelationConfig::default(),
            length_tolerance: LengthTolerance::default(),
            on_length_mismatch: MismatchDecision::Abort,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) {
        assert!(
            self.min_crop_width > 0 && self.min_crop_height > 0,
            "minimum crop size must be positive"
        );
        match self.length_tolerance {
            LengthTolerance::Pixels(v) | LengthTolerance::Relative(v) => {
                assert!(v >= 0.0, "length tolerance must be non-negative, got {v}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    Tracked,
    /// Window below the minimum crop size; ROI copied forward.
    CropTooSmall,
    /// Correlation rejected or frames unusable; ROI copied forward.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackStep {
    pub roi: Polyline,
    /// Applied to the previous ROI; zero unless tracked.
    pub translation: DVec2,
    pub outcome: TrackOutcome,
}

impl TrackStep {
    fn unchanged(roi: &Polyline, outcome: TrackOutcome) -> Self {
        Self {
            roi: roi.clone(),
            translation: DVec2::ZERO,
            outcome,
        }
    }
}

/// Tracks `roi` from `previous` to `current`.
pub fn track_step(
    roi: &Polyline,
    previous: &RasterImage,
    current: &RasterImage,
    config: &TrackerConfig,
) -> TrackStep {
    if previous.dimensions() != current.dimensions()
        || config.channel >= previous.channel_count().min(current.channel_count())
    {
        return TrackStep::unchanged(roi, TrackOutcome::Failed);
    }
    let (width, height) = previous.dimensions();
    let window = roi
        .bounding_box()
        .map(|b| b.expanded(config.margin))
        .and_then(|b| b.clipped(width, height));
    let Some(window) = window else {
        return TrackStep::unchanged(roi, TrackOutcome::CropTooSmall);
    };
    if window.width() < config.min_crop_width || window.height() < config.min_crop_height {
        return TrackStep::unchanged(roi, TrackOutcome::CropTooSmall);
    }

    let crop = |image: &RasterImage| {
        image
            .plane(config.channel)
            .crop(window.x_min, window.y_min, window.width(), window.height())
    };
    let (reference, target) = (crop(previous), crop(current));
    let correlator = PhaseCorrelator::new(window.width(), window.height(), config.correlation);
    match correlator.correlate(&reference, &target) {
        Some(correlation) => {
            let translation = -correlation.offset;
            TrackStep {
                roi: roi.translated(translation),
                translation,
                outcome: TrackOutcome::Tracked,
            }
        }
        None => TrackStep::unchanged(roi, TrackOutcome::Failed),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    /// From the last frame of the range towards the first.
    Backward,
}

/// Tracked ROI of every capillary (`None` without geometry) per frame.
pub type RoiMap = BTreeMap<usize, Vec<Option<Polyline>>>;

/// Tracks every capillary over `frames`, starting from its geometry at the
/// first frame in tracking order.
///
/// Each tracked ROI that differs from the geometry valid at its frame becomes a
/// new geometry entry starting at that frame. Backward tracking first checks
/// the starting geometry against the adjacent earlier interval and lets
/// `resolver` settle a length mismatch.
pub fn track_capillaries(
    capillaries: &mut [Capillary],
    source: &dyn FrameSource,
    frames: RangeInclusive<usize>,
    direction: Direction,
    config: &TrackerConfig,
    resolver: &dyn MismatchResolver,
    stop: &StopFlag,
) -> Result<RoiMap, Error> {
    config.validate();
    if capillaries.is_empty() {
        return Err(Error::NoCapillaries);
    }
    let count = source.frame_count();
    if count == 0 {
        return Err(Error::NoFrames);
    }
    let (first, last) = (*frames.start(), (*frames.end()).min(count - 1));
    if first > last {
        return Err(Error::EmptyTiming);
    }
    let order: Vec<usize> = match direction {
        Direction::Forward => (first..=last).collect(),
        Direction::Backward => (first..=last).rev().collect(),
    };
    let seed = order[0];

    let mut rois: Vec<Option<Polyline>> = capillaries
        .iter()
        .map(|c| c.polyline_at(seed).cloned())
        .collect();
    if direction == Direction::Backward {
        for (capillary, roi) in capillaries.iter().zip(rois.iter_mut()) {
            resolve_backward_start(capillary, seed, roi, config, resolver)?;
        }
    }

    let pool = WorkerPool::new("tracking")?;
    tracing::info!(
        from = seed,
        to = order[order.len() - 1],
        ?direction,
        capillaries = capillaries.len(),
        "tracking capillaries"
    );

    let mut map = RoiMap::new();
    map.insert(seed, rois.clone());
    let mut previous = read_frame(source, seed);
    let (mut tracked, mut copied) = (0usize, 0usize);

    for &frame in &order[1..] {
        if stop.is_stopped() {
            tracing::info!(frame, "tracking stopped");
            return Err(Error::Cancelled { stage: "tracking" });
        }
        let current = read_frame(source, frame);
        match (&previous, &current) {
            (Some(prev), Some(cur)) => {
                let results = pool.run_mut(&mut rois, |_, roi| -> Result<_, Infallible> {
                    let Some(polyline) = roi.as_ref() else {
                        return Ok(None);
                    };
                    let step = track_step(polyline, prev, cur, config);
                    *roi = Some(step.roi);
                    Ok(Some(step.outcome))
                });
                for outcome in results.iter().flatten().flatten() {
                    match outcome {
                        TrackOutcome::Tracked => tracked += 1,
                        _ => copied += 1,
                    }
                }
            }
            _ => copied += rois.iter().flatten().count(),
        }
        if current.is_some() {
            previous = current;
        }

        for (capillary, roi) in capillaries.iter_mut().zip(&rois) {
            let Some(roi) = roi else { continue };
            let unchanged = capillary
                .polyline_at(frame)
                .is_some_and(|existing| existing.approx_eq(roi, common::EPSILON));
            if !unchanged {
                capillary.along_t.insert(AlongT::new(frame, roi.clone()));
            }
        }
        map.insert(frame, rois.clone());
    }

    tracing::info!(tracked, copied_forward = copied, "tracking finished");
    Ok(map)
}

fn read_frame(source: &dyn FrameSource, frame: usize) -> Option<RasterImage> {
    source
        .read_frame(frame)
        .map_err(|err| tracing::warn!(frame, error = %err, "frame unavailable, ROIs copied forward"))
        .ok()
}

fn resolve_backward_start(
    capillary: &Capillary,
    seed: usize,
    roi: &mut Option<Polyline>,
    config: &TrackerConfig,
    resolver: &dyn MismatchResolver,
) -> Result<(), Error> {
    let Some(current) = roi.as_ref() else {
        return Ok(());
    };
    let reference = capillary
        .along_t
        .index_at(seed)
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| capillary.along_t.get(i));
    let Some(reference) = reference else {
        return Ok(());
    };
    let Some(mismatch) = check_length(current, &reference.polyline, config.length_tolerance) else {
        return Ok(());
    };

    match resolver.resolve(capillary, &mismatch) {
        MismatchDecision::Abort => Err(Error::TrackingAborted {
            capillary: capillary.name.clone(),
            mismatch,
        }),
        MismatchDecision::ContinueAnyway => {
            tracing::warn!(capillary = %capillary.name, %mismatch, "tracking despite length mismatch");
            Ok(())
        }
        MismatchDecision::Resample => {
            let points = reference.polyline.point_count();
            tracing::info!(capillary = %capillary.name, points, "resampling before backward tracking");
            *roi = Some(current.resampled(points));
            Ok(())
        }
    }
}
