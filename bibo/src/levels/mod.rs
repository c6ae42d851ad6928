//! Liquid top/bottom detection, one column (time bin) at a time.
//!
//! Pass 1 finds the first row crossing a threshold, scanning down from
//! `jitter` rows above the previous column's top; a hit further down is
//! limited to `jitter` rows below it, so the level never jumps. The bottom is
//! searched from the lower edge of the search rectangle upwards. A column
//! without a valid top above its bottom repeats the previous column; invalid
//! columns before the first valid one take its level.
//! An optional pass 2 re-scores a narrower window around the pass-1 top on a
//! second transform.
//!
//! The same scanner runs on kymographs ([`detect_levels`]) and on per-frame
//! profiles sampled straight from the video ([`detect_levels_from_frames`]).

mod profile;
mod scanner;

#[cfg(test)]
mod tests;

pub use profile::detect_levels_from_frames;

use common::{BatchReport, Buffer2, WorkerPool};
use serde::{Deserialize, Serialize};

use crate::capillary::Capillary;
use crate::error::Error;
use crate::image::{ImageTransform, RasterImage};
use crate::measure::Level2D;
use scanner::{scan_columns, ScanInput};

/// Direction a pixel must cross the threshold in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Comparison {
    #[default]
    GreaterThan,
    LessThan,
}

impl Comparison {
    #[inline]
    pub fn crosses(self, value: f32, threshold: f32) -> bool {
        match self {
            Comparison::GreaterThan => value > threshold,
            Comparison::LessThan => value < threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnOrder {
    #[default]
    LeftToRight,
    RightToLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreMode {
    Max,
    Min,
}

/// How pass 2 picks the refined top inside its window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RefinePolicy {
    /// First row (top-down) crossing `threshold`.
    FirstCrossing {
        threshold: f32,
        comparison: Comparison,
    },
    /// Row with the highest or lowest score.
    BestScore { mode: ScoreMode },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementConfig {
    pub transform: ImageTransform,
    /// Half-height of the window around the pass-1 top.
    pub jitter: usize,
    pub policy: RefinePolicy,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            transform: ImageTransform::YDiffN { span: 3 },
            jitter: 5,
            policy: RefinePolicy::BestScore {
                mode: ScoreMode::Max,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Transform pass 1 is scored on.
    pub transform: ImageTransform,
    pub threshold: f32,
    pub comparison: Comparison,
    /// Maximum top displacement between adjacent columns.
    pub jitter: usize,
    /// Inclusive rows of the search rectangle; whole height when unset.
    pub row_range: Option<(usize, usize)>,
    /// Inclusive columns to (re-)analyze; the result is merged into existing levels.
    pub column_range: Option<(usize, usize)>,
    pub order: ColumnOrder,
    pub refinement: Option<RefinementConfig>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            transform: ImageTransform::None,
            threshold: 35.0,
            comparison: Comparison::GreaterThan,
            jitter: 10,
            row_range: None,
            column_range: None,
            order: ColumnOrder::LeftToRight,
            refinement: None,
        }
    }
}

impl LevelConfig {
    pub fn validate(&self) {
        assert!(self.threshold.is_finite(), "threshold must be finite");
        if let Some((first, last)) = self.row_range {
            assert!(first <= last, "row_range ({first}, {last}) is reversed");
        }
        if let Some((first, last)) = self.column_range {
            assert!(first <= last, "column_range ({first}, {last}) is reversed");
        }
        if let Some(refinement) = &self.refinement {
            if let RefinePolicy::FirstCrossing { threshold, .. } = refinement.policy {
                assert!(threshold.is_finite(), "refinement threshold must be finite");
            }
        }
    }

    /// Search rows clamped to an image of `height` rows.
    fn rows(&self, height: usize) -> (usize, usize) {
        let last = height.saturating_sub(1);
        match self.row_range {
            Some((first, end)) => (first.min(last), end.min(last)),
            None => (0, last),
        }
    }

    /// Analyzed columns clamped to an image of `width` columns.
    fn columns(&self, width: usize) -> Option<(usize, usize)> {
        let last = width.checked_sub(1)?;
        match self.column_range {
            Some((first, _)) if first > last => None,
            Some((first, end)) => Some((first, end.min(last))),
            None => Some((0, last)),
        }
    }
}

/// Pass-1 and optional pass-2 score planes of one source image.
///
/// `Err` carries the transform that is not applicable to the image.
pub(crate) fn score_planes(
    image: &RasterImage,
    config: &LevelConfig,
) -> Result<(Buffer2<f32>, Option<Buffer2<f32>>), ImageTransform> {
    let pass1 = config.transform.apply(image).ok_or(config.transform)?;
    let pass2 = match &config.refinement {
        Some(refinement) => Some(
            refinement
                .transform
                .apply(image)
                .ok_or(refinement.transform)?,
        ),
        None => None,
    };
    Ok((pass1, pass2))
}

/// Detected levels of columns `first..first + top.len()`.
pub(crate) struct DetectedLevels {
    pub top: Level2D,
    pub bottom: Level2D,
}

/// Runs the column scanner over `pass1`, honoring the column sub-range and
/// seeding from the capillary's existing top.
pub(crate) fn detect_on_planes(
    capillary: &Capillary,
    pass1: &Buffer2<f32>,
    pass2: Option<&Buffer2<f32>>,
    config: &LevelConfig,
) -> Result<DetectedLevels, Error> {
    if pass1.height() == 0 {
        return Err(Error::NoSamplingPositions {
            capillary: capillary.name.clone(),
        });
    }
    let (first, last) = config.columns(pass1.width()).ok_or_else(|| Error::ColumnRangeOutside {
        capillary: capillary.name.clone(),
        first: config.column_range.map_or(0, |(first, _)| first),
        width: pass1.width(),
    })?;
    let seed = match (config.column_range, &capillary.measures.top_raw) {
        (Some(_), Some(existing)) => {
            let neighbor = match config.order {
                ColumnOrder::LeftToRight => first.checked_sub(1),
                ColumnOrder::RightToLeft => Some(last + 1),
            };
            neighbor
                .and_then(|c| existing.get(c))
                .map(|top| top.max(0.0) as usize)
        }
        _ => None,
    };

    let input = ScanInput {
        pass1,
        pass2: pass2.zip(config.refinement.as_ref()),
        config,
        rows: config.rows(pass1.height()),
        columns: (first, last),
        seed,
    };
    let scanned = scan_columns(&input);
    Ok(DetectedLevels {
        top: Level2D::from_values(first, scanned.top.iter().map(|&y| y as f64).collect()),
        bottom: Level2D::from_values(first, scanned.bottom.iter().map(|&y| y as f64).collect()),
    })
}

/// Stores `detected`, merging into existing levels on partial re-analysis.
pub(crate) fn store_levels(capillary: &mut Capillary, detected: DetectedLevels, config: &LevelConfig) {
    let merge = |existing: &Option<Level2D>, update: Level2D| match (config.column_range, existing) {
        (Some(_), Some(existing)) => existing.with_range_replaced(&update),
        _ => update,
    };
    capillary.measures.top_raw = Some(merge(&capillary.measures.top_raw, detected.top));
    capillary.measures.bottom = Some(merge(&capillary.measures.bottom, detected.bottom));
}

/// Detects top and bottom levels on every capillary's kymograph.
///
/// A capillary without kymograph or with an inapplicable transform is logged
/// and skipped; the others are unaffected.
pub fn detect_levels(capillaries: &mut [Capillary], config: &LevelConfig) -> Result<BatchReport, Error> {
    config.validate();
    if capillaries.is_empty() {
        return Err(Error::NoCapillaries);
    }
    let pool = WorkerPool::new("levels")?;
    tracing::info!(capillaries = capillaries.len(), "detecting levels on kymographs");

    let results = pool.run_mut(capillaries, |_, capillary| -> Result<(), Error> {
        let kymograph = capillary.kymograph.as_ref().ok_or_else(|| Error::MissingKymograph {
            capillary: capillary.name.clone(),
        })?;
        let (pass1, pass2) =
            score_planes(kymograph, config).map_err(|transform| Error::TransformUnavailable {
                capillary: capillary.name.clone(),
                transform,
            })?;
        let detected = detect_on_planes(capillary, &pass1, pass2.as_ref(), config)?;
        store_levels(capillary, detected, config);
        Ok(())
    });

    let report = BatchReport::from_results(&results);
    tracing::debug!(completed = report.completed, failed = report.failed, "levels detected");
    Ok(report)
}
