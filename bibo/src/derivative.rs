//! Ridge-intensity signal along the detected top level.
//!
//! Named "derivative" after the acquisition software's measure, it is not a
//! derivative of the level curve: for every column it is the maximum of the
//! transformed kymograph within `jitter` rows of the top level. A gulp lowers
//! the meniscus abruptly, which lights up the horizontal-difference transform
//! at that column.

use common::{BatchReport, Buffer2, WorkerPool};
use serde::{Deserialize, Serialize};

use crate::capillary::Capillary;
use crate::error::Error;
use crate::image::ImageTransform;
use crate::measure::{Level2D, Level2DBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivativeConfig {
    pub transform: ImageTransform,
    /// Half-height of the band around the top level.
    pub jitter: usize,
}

impl Default for DerivativeConfig {
    fn default() -> Self {
        Self {
            transform: ImageTransform::XDiffN { span: 3 },
            jitter: 10,
        }
    }
}

impl DerivativeConfig {
    pub fn validate(&self) {
        if let ImageTransform::XDiffN { span }
        | ImageTransform::YDiffN { span }
        | ImageTransform::XyDiffN { span } = self.transform
        {
            assert!(span > 0, "difference span must be > 0");
        }
    }
}

/// Maximum of `plane` over rows `[top - jitter, top + jitter]` for every column of `top`.
///
/// Columns outside the plane end the series.
pub fn ridge_signal(plane: &Buffer2<f32>, top: &Level2D, jitter: usize) -> Level2D {
    let mut builder = Level2DBuilder::with_capacity(top.first_index(), top.len());
    if plane.height() == 0 {
        return builder.freeze();
    }
    let last_row = plane.height() - 1;
    for (x, level) in top.points() {
        if x >= plane.width() {
            break;
        }
        let center = (level.max(0.0).round() as usize).min(last_row);
        let (y0, y1) = (center.saturating_sub(jitter), (center + jitter).min(last_row));
        let max = (y0..=y1)
            .map(|y| plane[(x, y)])
            .fold(f32::NEG_INFINITY, f32::max);
        builder.push(max as f64);
    }
    builder.freeze()
}

/// Computes the derivative measure of every capillary with a kymograph and a top level.
pub fn build_derivatives(
    capillaries: &mut [Capillary],
    config: &DerivativeConfig,
) -> Result<BatchReport, Error> {
    config.validate();
    if capillaries.is_empty() {
        return Err(Error::NoCapillaries);
    }
    let pool = WorkerPool::new("derivative")?;

    let results = pool.run_mut(capillaries, |_, capillary| -> Result<(), Error> {
        let name = || capillary.name.clone();
        let kymograph = capillary
            .kymograph
            .as_ref()
            .ok_or_else(|| Error::MissingKymograph { capillary: name() })?;
        let top = capillary
            .measures
            .top_raw
            .as_ref()
            .ok_or_else(|| Error::MissingLevels { capillary: name() })?;
        let plane = config
            .transform
            .apply(kymograph)
            .ok_or_else(|| Error::TransformUnavailable {
                capillary: name(),
                transform: config.transform,
            })?;
        let derivative = ridge_signal(&plane, top, config.jitter);
        capillary.measures.derivative = Some(derivative);
        Ok(())
    });

    let report = BatchReport::from_results(&results);
    tracing::debug!(completed = report.completed, failed = report.failed, "derivatives built");
    Ok(report)
}
