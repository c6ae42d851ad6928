//! Gulp (feeding event) segmentation of the derivative signal.
//!
//! A gulp is a maximal run of consecutive indices where the derivative is on
//! the configured side of the threshold. Detection always replaces the
//! capillary's gulps; it never patches them.

mod summary;


pub use summary::GulpSummary;

use common::{BatchReport, WorkerPool};
use serde::{Deserialize, Serialize};

use crate::capillary::Capillary;
use crate::error::Error;
use crate::measure::Level2D;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Polarity {
    /// Derivative strictly above the threshold.
    #[default]
    Above,
    /// Derivative strictly below the threshold.
    Below,
}

impl Polarity {
    #[inline]
    fn exceeds(self, value: f64, threshold: f64) -> bool {
        match self {
            Polarity::Above => value > threshold,
            Polarity::Below => value < threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gulp {
    pub start_index: usize,
    /// Inclusive.
    pub end_index: usize,
    /// Largest derivative value within the run.
    pub amplitude: f64,
    pub points: Vec<(usize, f64)>,
}

impl Gulp {
    pub fn len(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// What the derivative is compared against.
#[derive(Debug, Clone, Copy)]
pub enum GulpThreshold<'a> {
    /// Per-index threshold; only indices present in both series are scanned.
    Series(&'a Level2D),
    Fixed(f64),
}

impl GulpThreshold<'_> {
    fn at(&self, index: usize) -> Option<f64> {
        match self {
            GulpThreshold::Series(series) => series.get(index),
            GulpThreshold::Fixed(value) => Some(*value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GulpConfig {
    pub polarity: Polarity,
    /// Used when no adaptive threshold is available.
    pub fallback_threshold: f64,
    /// Runs shorter than this are dropped.
    pub min_length: usize,
}

impl Default for GulpConfig {
    fn default() -> Self {
        Self {
            polarity: Polarity::Above,
            fallback_threshold: 90.0,
            min_length: 1,
        }
    }
}

impl GulpConfig {
    pub fn validate(&self) {
        assert!(self.fallback_threshold.is_finite(), "fallback_threshold must be finite");
        assert!(self.min_length > 0, "min_length must be > 0");
    }
}

/// Maximal runs of `derivative` exceeding `threshold`.
pub fn segment_gulps(
    derivative: &Level2D,
    threshold: GulpThreshold<'_>,
    polarity: Polarity,
    min_length: usize,
) -> Vec<Gulp> {
    let mut gulps = Vec::new();
    let mut current: Option<Gulp> = None;

    for (index, value) in derivative.points() {
        let hit = threshold
            .at(index)
            .is_some_and(|limit| polarity.exceeds(value, limit));
        if !hit {
            gulps.extend(current.take());
            continue;
        }
        match current.as_mut() {
            Some(gulp) => {
                gulp.end_index = index;
                gulp.amplitude = gulp.amplitude.max(value);
                gulp.points.push((index, value));
            }
            None => {
                current = Some(Gulp {
                    start_index: index,
                    end_index: index,
                    amplitude: value,
                    points: vec![(index, value)],
                })
            }
        }
    }
    gulps.extend(current);
    gulps.retain(|g| g.len() >= min_length);
    gulps
}

/// Replaces the gulps of every capillary with a derivative.
///
/// Uses the shared `threshold` series when given, `config.fallback_threshold` otherwise.
pub fn detect_gulps(
    capillaries: &mut [Capillary],
    threshold: Option<&Level2D>,
    config: &GulpConfig,
) -> Result<BatchReport, Error> {
    config.validate();
    if capillaries.is_empty() {
        return Err(Error::NoCapillaries);
    }
    let limit = match threshold {
        Some(series) => GulpThreshold::Series(series),
        None => {
            tracing::warn!(
                threshold = config.fallback_threshold,
                "no adaptive threshold, using fixed fallback"
            );
            GulpThreshold::Fixed(config.fallback_threshold)
        }
    };
    let pool = WorkerPool::new("gulps")?;

    let results = pool.run_mut(capillaries, |_, capillary| -> Result<usize, Error> {
        capillary.gulps.clear();
        let derivative = capillary
            .measures
            .derivative
            .as_ref()
            .ok_or_else(|| Error::MissingLevels {
                capillary: capillary.name.clone(),
            })?;
        let gulps = segment_gulps(derivative, limit, config.polarity, config.min_length);
        let count = gulps.len();
        capillary.gulps = gulps;
        Ok(count)
    });

    let report = BatchReport::from_results(&results);
    let total: usize = results.iter().flatten().sum();
    tracing::info!(gulps = total, failed = report.failed, "gulps detected");
    Ok(report)
}
