//! Capillaries, their time-varying geometry and their measures.

mod along_t;

#[cfg(test)]
mod tests;

pub use along_t::{AlongT, AlongTList};

use serde::{Deserialize, Serialize};

use crate::geometry::Polyline;
use crate::gulps::Gulp;
use crate::image::RasterImage;
use crate::measure::Level2D;

/// Which tube of a cage a capillary is.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
pub enum Side {
    #[strum(to_string = "L")]
    Left,
    #[strum(to_string = "R")]
    Right,
}

/// Level series produced by the detection stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapillaryMeasures {
    pub top_raw: Option<Level2D>,
    /// `top_raw` minus the evaporation drift of the control capillaries on the same side.
    pub top_corrected: Option<Level2D>,
    pub bottom: Option<Level2D>,
    /// Ridge intensity around the top level; gulps are segmented on it.
    pub derivative: Option<Level2D>,
}

impl CapillaryMeasures {
    /// Corrected top level when available, raw otherwise.
    pub fn top(&self) -> Option<&Level2D> {
        self.top_corrected.as_ref().or(self.top_raw.as_ref())
    }
}

#[derive(Debug, Clone)]
pub struct Capillary {
    pub name: String,
    pub side: Side,
    pub cage_id: usize,
    /// Position of this capillary's kymograph in the experiment's output.
    pub kymograph_index: usize,
    pub fly_count: u32,
    /// Liquid volume of the full capillary and its length in pixels; both zero when unknown.
    pub volume_ul: f64,
    pub length_px: f64,
    pub along_t: AlongTList,
    pub measures: CapillaryMeasures,
    pub gulps: Vec<Gulp>,
    pub kymograph: Option<RasterImage>,
}

impl Capillary {
    /// Capillary with a single geometry valid from frame 0 on.
    pub fn new(name: impl Into<String>, side: Side, cage_id: usize, polyline: Polyline) -> Self {
        let mut along_t = AlongTList::default();
        along_t.insert(AlongT::new(0, polyline));
        Self {
            name: name.into(),
            side,
            cage_id,
            kymograph_index: 0,
            fly_count: 1,
            volume_ul: 0.0,
            length_px: 0.0,
            along_t,
            measures: CapillaryMeasures::default(),
            gulps: Vec::new(),
            kymograph: None,
        }
    }

    pub fn with_fly_count(mut self, fly_count: u32) -> Self {
        self.fly_count = fly_count;
        self
    }

    pub fn with_kymograph_index(mut self, index: usize) -> Self {
        self.kymograph_index = index;
        self
    }

    pub fn with_volume(mut self, volume_ul: f64, length_px: f64) -> Self {
        self.volume_ul = volume_ul;
        self.length_px = length_px;
        self
    }

    /// Capillaries of empty cages are the no-consumption reference.
    #[inline]
    pub fn is_control(&self) -> bool {
        self.fly_count == 0
    }

    pub fn polyline_at(&self, frame: usize) -> Option<&Polyline> {
        self.along_t.at(frame).map(|entry| &entry.polyline)
    }

    /// Microliters per pixel of capillary length, if calibrated.
    pub fn ul_per_px(&self) -> Option<f64> {
        (self.volume_ul > 0.0 && self.length_px > 0.0).then(|| self.volume_ul / self.length_px)
    }

    /// Drops every measure and gulp; geometry and kymograph are kept.
    pub fn clear_measures(&mut self) {
        self.measures = CapillaryMeasures::default();
        self.gulps.clear();
    }
}
