//! Error types for the analysis pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::image::ImageTransform;
use crate::tracking::LengthMismatch;

/// Failure to produce one source frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame {index} out of range ({count} frames)")]
    OutOfRange { index: usize, count: usize },

    #[error("Failed to open frame '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[error("Frame size mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

/// Errors that stop a whole stage. Per-frame and per-capillary failures are
/// logged and skipped instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Frame source is empty")]
    NoFrames,

    #[error("Bin timing yields no time bins")]
    EmptyTiming,

    #[error("Experiment has no capillaries")]
    NoCapillaries,

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Stopped before stage '{stage}'")]
    Cancelled { stage: &'static str },

    #[error("Tracking of capillary '{capillary}' aborted: {mismatch}")]
    TrackingAborted {
        capillary: String,
        mismatch: LengthMismatch,
    },

    #[error("Capillary '{capillary}' has no kymograph")]
    MissingKymograph { capillary: String },

    #[error("Capillary '{capillary}' has no sampling positions")]
    NoSamplingPositions { capillary: String },

    #[error("Column range of capillary '{capillary}' starts at {first}, past its {width} columns")]
    ColumnRangeOutside {
        capillary: String,
        first: usize,
        width: usize,
    },

    #[error("Capillary '{capillary}' has no top level")]
    MissingLevels { capillary: String },

    #[error("Transform {transform} unavailable for capillary '{capillary}'")]
    TransformUnavailable {
        capillary: String,
        transform: ImageTransform,
    },
}
