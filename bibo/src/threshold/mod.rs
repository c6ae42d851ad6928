//! Adaptive gulp threshold from the capillaries of empty cages.
//!
//! At every time index the derivative values of all control capillaries are
//! reduced to `location + k * spread`. The resulting series is shared by every
//! capillary of the experiment.

mod smoothing;
pub mod statistics;


pub use smoothing::{exponential_backward, savitzky_golay, Smoothing};

use serde::{Deserialize, Serialize};

use crate::capillary::Capillary;
use crate::measure::{Level2D, Level2DBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThresholdMethod {
    #[default]
    MeanPlusSd,
    MedianPlusIqr,
    MedianPlusMad,
}

impl ThresholdMethod {
    /// `location + k * spread` of `samples`.
    pub fn evaluate(self, samples: &[f64], k: f64) -> f64 {
        match self {
            ThresholdMethod::MeanPlusSd => {
                statistics::mean(samples) + k * statistics::sample_sd(samples)
            }
            ThresholdMethod::MedianPlusIqr => {
                statistics::median(samples) + k * statistics::iqr(samples)
            }
            ThresholdMethod::MedianPlusMad => {
                statistics::median(samples) + k * statistics::mad(samples)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub method: ThresholdMethod,
    pub k: f64,
    pub smoothing: Smoothing,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            method: ThresholdMethod::MeanPlusSd,
            k: 3.0,
            smoothing: Smoothing::None,
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) {
        assert!(self.k.is_finite(), "k must be finite");
        self.smoothing.validate();
    }
}

/// Threshold series from the derivative of every control capillary.
///
/// Returns `None` without controls; the caller falls back to a fixed threshold.
/// Indices no control covers repeat the previous value.
pub fn compute_threshold(capillaries: &[Capillary], config: &ThresholdConfig) -> Option<Level2D> {
    config.validate();
    let controls: Vec<&Level2D> = capillaries
        .iter()
        .filter(|c| c.is_control())
        .filter_map(|c| c.measures.derivative.as_ref())
        .filter(|d| !d.is_empty())
        .collect();

    match controls.len() {
        0 => {
            tracing::warn!("no control capillary with a derivative, threshold unavailable");
            return None;
        }
        1 => tracing::warn!("single control capillary, threshold spread is zero"),
        n => tracing::debug!(controls = n, method = ?config.method, "computing threshold"),
    }

    let first = controls.iter().map(|d| d.first_index()).min()?;
    let end = controls.iter().map(|d| d.end_index()).max()?;

    let mut builder = Level2DBuilder::with_capacity(first, end - first);
    let mut samples = Vec::with_capacity(controls.len());
    let mut last = 0.0;
    for t in first..end {
        samples.clear();
        samples.extend(controls.iter().filter_map(|d| d.get(t)));
        if !samples.is_empty() {
            last = config.method.evaluate(&samples, config.k);
        }
        builder.push(last);
    }
    let raw = builder.freeze();

    match config.smoothing {
        Smoothing::None => Some(raw),
        smoothing => Some(Level2D::from_values(first, smoothing.apply(raw.values()))),
    }
}
