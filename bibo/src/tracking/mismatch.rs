use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capillary::Capillary;
use crate::geometry::Polyline;

/// How much a polyline may differ in length from its reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LengthTolerance {
    Pixels(f64),
    /// Fraction of the reference length.
    Relative(f64),
}

impl Default for LengthTolerance {
    fn default() -> Self {
        LengthTolerance::Pixels(5.0)
    }
}

impl LengthTolerance {
    fn allows(self, current: f64, reference: f64) -> bool {
        let diff = (current - reference).abs();
        match self {
            LengthTolerance::Pixels(px) => diff <= px,
            LengthTolerance::Relative(fraction) => diff <= fraction * reference.abs(),
        }
    }
}

/// Geometry about to be tracked backwards disagrees with the interval it tracks into.
#[derive(Debug, Clone, PartialEq)]
pub struct LengthMismatch {
    pub current_points: usize,
    pub reference_points: usize,
    pub current_length: f64,
    pub reference_length: f64,
}

impl fmt::Display for LengthMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} points / {:.1} px vs reference {} points / {:.1} px",
            self.current_points, self.current_length, self.reference_points, self.reference_length
        )
    }
}

/// `Some` when the point counts differ or the lengths differ beyond `tolerance`.
pub fn check_length(
    current: &Polyline,
    reference: &Polyline,
    tolerance: LengthTolerance,
) -> Option<LengthMismatch> {
    let mismatch = LengthMismatch {
        current_points: current.point_count(),
        reference_points: reference.point_count(),
        current_length: current.length(),
        reference_length: reference.length(),
    };
    let same_points = mismatch.current_points == mismatch.reference_points;
    let same_length = tolerance.allows(mismatch.current_length, mismatch.reference_length);
    (!same_points || !same_length).then_some(mismatch)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MismatchDecision {
    #[default]
    Abort,
    /// Track the geometry as it is.
    ContinueAnyway,
    /// Resample the geometry to the reference point count first.
    Resample,
}

/// Decides what to do about a [`LengthMismatch`] before backward tracking.
///
/// Interactive front ends ask the user; batch callers use [`FixedDecision`].
pub trait MismatchResolver: Sync {
    fn resolve(&self, capillary: &Capillary, mismatch: &LengthMismatch) -> MismatchDecision;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDecision(pub MismatchDecision);

impl MismatchResolver for FixedDecision {
    fn resolve(&self, _: &Capillary, _: &LengthMismatch) -> MismatchDecision {
        self.0
    }
}

impl<F> MismatchResolver for F
where
    F: Fn(&Capillary, &LengthMismatch) -> MismatchDecision + Sync,
{
    fn resolve(&self, capillary: &Capillary, mismatch: &LengthMismatch) -> MismatchDecision {
        self(capillary, mismatch)
    }
}
