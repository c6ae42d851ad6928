//! Bibo - capillary feeding assay analysis.
//!
//! Turns time-lapse frames of flies drinking from liquid-filled capillaries into
//! per-capillary liquid-level series and discrete feeding events ("gulps"):
//! - Mask building and kymograph assembly along each capillary
//! - Liquid top/bottom level detection per time bin
//! - Ridge ("derivative") signal, adaptive thresholds from empty cages, gulp segmentation
//! - Phase-correlation tracking of capillaries drifting across frames
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bibo::prelude::*;
//!
//! let source = FileFrameSource::new(paths, 60_000);
//! let mut experiment = Experiment::new(capillaries, BinTiming::new(0, 3_600_000, 60_000));
//! let config = Config::load("bibo.yaml".as_ref())?;
//! bibo::run(&mut experiment, &source, &config, None)?;
//!
//! for capillary in &experiment.capillaries {
//!     println!("{}: {} gulps", capillary.name, capillary.gulps.len());
//! }
//! ```

pub mod cage;
pub mod capillary;
pub mod config;
pub mod derivative;
mod error;
pub mod evaporation;
pub mod geometry;
pub mod gulps;
pub mod image;
pub mod kymograph;
pub mod levels;
pub mod mask;
pub mod measure;
pub mod pipeline;
pub mod threshold;
pub mod timing;
pub mod tracking;

#[cfg(test)]
pub(crate) mod test_utils;

pub mod prelude;

pub use cage::CageMeasures;
pub use capillary::{AlongT, AlongTList, Capillary, CapillaryMeasures, Side};
pub use config::Config;
pub use error::{Error, FrameError};
pub use geometry::{Aabb, Polyline};
pub use gulps::{Gulp, GulpConfig, GulpSummary, Polarity};
pub use crate::image::{FileFrameSource, FrameSource, ImageTransform, MemoryFrameSource, RasterImage};
pub use measure::{Level2D, Level2DBuilder};
pub use pipeline::progress::{NoProgress, ProgressSink};
pub use pipeline::{run, Experiment, Stage, StageReport};
pub use timing::BinTiming;
