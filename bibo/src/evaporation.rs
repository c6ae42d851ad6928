//! Evaporation correction of the top level.
//!
//! Liquid evaporates from every capillary, fed on or not. The mean drift of the
//! control capillaries on one side is taken as the evaporation of that side and
//! subtracted from every capillary on the same side.

use std::collections::BTreeMap;

use crate::capillary::{Capillary, Side};
use crate::measure::{Level2D, Level2DBuilder};

/// Mean of `series` at every index of their union, relative to its first value.
///
/// Indices no series covers repeat the previous drift.
pub fn mean_drift(series: &[&Level2D]) -> Option<Level2D> {
    let first = series.iter().filter(|s| !s.is_empty()).map(|s| s.first_index()).min()?;
    let end = series.iter().map(|s| s.end_index()).max()?;

    let mut builder = Level2DBuilder::with_capacity(first, end - first);
    let mut last = 0.0;
    for t in first..end {
        let values: Vec<f64> = series.iter().filter_map(|s| s.get(t)).collect();
        if !values.is_empty() {
            last = values.iter().sum::<f64>() / values.len() as f64;
        }
        builder.push(last);
    }
    Some(builder.freeze().relative_to_first())
}

/// `raw - drift`, with the drift held constant outside its own range.
pub fn subtract_drift(raw: &Level2D, drift: &Level2D) -> Level2D {
    let before = drift.values().first().copied().unwrap_or(0.0);
    let after = drift.values().last().copied().unwrap_or(0.0);
    let mut builder = Level2DBuilder::with_capacity(raw.first_index(), raw.len());
    for (t, value) in raw.points() {
        let d = match drift.get(t) {
            Some(d) => d,
            None if t < drift.first_index() => before,
            None => after,
        };
        builder.push(value - d);
    }
    builder.freeze()
}

/// Sets `top_corrected` of every capillary with a raw top level.
///
/// Capillaries on a side without any control keep no corrected level. Returns
/// the number of corrected capillaries.
pub fn correct_evaporation(capillaries: &mut [Capillary]) -> usize {
    let mut drifts: BTreeMap<Side, Option<Level2D>> = BTreeMap::new();
    for side in [Side::Left, Side::Right] {
        let controls: Vec<&Level2D> = capillaries
            .iter()
            .filter(|c| c.side == side && c.is_control())
            .filter_map(|c| c.measures.top_raw.as_ref())
            .collect();
        let drift = mean_drift(&controls);
        if drift.is_none() && capillaries.iter().any(|c| c.side == side) {
            tracing::warn!(%side, "no control capillary on this side, evaporation not corrected");
        }
        drifts.insert(side, drift);
    }

    let mut corrected = 0;
    for capillary in capillaries.iter_mut() {
        let drift = drifts.get(&capillary.side).and_then(Option::as_ref);
        capillary.measures.top_corrected = match (&capillary.measures.top_raw, drift) {
            (Some(raw), Some(drift)) => {
                corrected += 1;
                Some(subtract_drift(raw, drift))
            }
            _ => None,
        };
    }
    tracing::debug!(corrected, "evaporation corrected");
    corrected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::vertical_capillary;

    fn capillary(side: Side, flies: u32, top: &[f64]) -> Capillary {
        let mut cap = vertical_capillary("c", side, 1, 0.0, 0.0, 1.0).with_fly_count(flies);
        cap.measures.top_raw = Some(Level2D::from_values(0, top.to_vec()));
        cap
    }

    #[test]
    fn test_mean_drift() {
        let a = Level2D::from_values(0, vec![10.0, 11.0, 12.0]);
        let b = Level2D::from_values(0, vec![20.0, 23.0, 24.0]);
        let drift = mean_drift(&[&a, &b]).unwrap();
        assert_eq!(drift.values(), &[0.0, 2.0, 3.0]);
        assert!(mean_drift(&[]).is_none());
    }

    #[test]
    fn test_subtract_drift_holds_ends() {
        let raw = Level2D::from_values(0, vec![5.0, 5.0, 5.0, 5.0]);
        let drift = Level2D::from_values(1, vec![1.0, 2.0]);
        assert_eq!(subtract_drift(&raw, &drift).values(), &[4.0, 4.0, 3.0, 3.0]);
    }

    #[test]
    fn test_correction_per_side() {
        let mut caps = vec![
            capillary(Side::Left, 0, &[10.0, 11.0, 12.0]),
            capillary(Side::Left, 1, &[10.0, 15.0, 20.0]),
            capillary(Side::Right, 1, &[10.0, 15.0, 20.0]),
        ];

        let corrected = correct_evaporation(&mut caps);

        assert_eq!(corrected, 2);
        let fed = caps[1].measures.top_corrected.as_ref().unwrap();
        assert_eq!(fed.values(), &[10.0, 14.0, 18.0]);
        let control = caps[0].measures.top_corrected.as_ref().unwrap();
        assert_eq!(control.values(), &[10.0, 10.0, 10.0]);
        assert!(
            caps[2].measures.top_corrected.is_none(),
            "right side has no control"
        );
    }
}
