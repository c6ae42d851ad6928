//! Per-cage consumption and side preference.

use std::collections::BTreeMap;

use crate::capillary::{Capillary, Side};
use crate::measure::{Level2D, Level2DBuilder};

/// Combined measures of the two capillaries of one cage.
#[derive(Debug, Clone, PartialEq)]
pub struct CageMeasures {
    pub cage_id: usize,
    /// Left plus right consumption.
    pub sum: Level2D,
    /// `(L - R) / (L + R)`, 0 where nothing was consumed.
    pub preference_index: Level2D,
}

/// Consumption of one capillary: top level relative to its first value, in
/// microliters when the capillary is calibrated.
pub fn consumption(capillary: &Capillary) -> Option<Level2D> {
    let relative = capillary.measures.top()?.relative_to_first();
    Some(match capillary.ul_per_px() {
        Some(scale) => relative.to_volume(scale),
        None => relative,
    })
}

/// Measures of every cage holding both a left and a right capillary with levels.
///
/// Only indices covered by both sides are kept.
pub fn cage_measures(capillaries: &[Capillary]) -> Vec<CageMeasures> {
    let mut cages: BTreeMap<usize, [Option<Level2D>; 2]> = BTreeMap::new();
    for capillary in capillaries {
        let Some(level) = consumption(capillary) else {
            continue;
        };
        let slot = match capillary.side {
            Side::Left => 0,
            Side::Right => 1,
        };
        cages.entry(capillary.cage_id).or_default()[slot] = Some(level);
    }

    cages
        .into_iter()
        .filter_map(|(cage_id, [left, right])| {
            let (left, right) = (left?, right?);
            let first = left.first_index().max(right.first_index());
            let end = left.end_index().min(right.end_index()).max(first);
            let mut sum = Level2DBuilder::with_capacity(first, end - first);
            let mut preference = Level2DBuilder::with_capacity(first, end - first);
            for t in first..end {
                let (l, r) = (left.get(t).unwrap_or(0.0), right.get(t).unwrap_or(0.0));
                let total = l + r;
                sum.push(total);
                preference.push(if total == 0.0 { 0.0 } else { (l - r) / total });
            }
            Some(CageMeasures {
                cage_id,
                sum: sum.freeze(),
                preference_index: preference.freeze(),
            })
        })
        .collect()
}
