//! Common imports for callers driving a full analysis.

pub use crate::capillary::{Capillary, Side};
pub use crate::config::Config;
pub use crate::error::{Error, FrameError};
pub use crate::geometry::Polyline;
pub use crate::gulps::{Gulp, GulpConfig, Polarity};
pub use crate::image::{FileFrameSource, FrameSource, ImageTransform, MemoryFrameSource, RasterImage};
pub use crate::kymograph::KymographConfig;
pub use crate::levels::{Comparison, LevelConfig};
pub use crate::measure::Level2D;
pub use crate::pipeline::progress::ProgressSink;
pub use crate::pipeline::Experiment;
pub use crate::threshold::{Smoothing, ThresholdConfig, ThresholdMethod};
pub use crate::timing::BinTiming;
pub use crate::tracking::{MismatchDecision, MismatchResolver, TrackerConfig};
