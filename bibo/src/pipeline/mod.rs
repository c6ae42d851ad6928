//! Experiment aggregate and the staged analysis run.
//!
//! Stages never overlap: each one submits its batch, waits for every task and
//! only then hands over to the next. The stop flag is checked between stages.

pub mod progress;


use std::ops::RangeInclusive;

use common::{BatchReport, StopFlag};
use strum::IntoEnumIterator;

use crate::cage::{cage_measures, CageMeasures};
use crate::capillary::Capillary;
use crate::config::Config;
use crate::derivative::{build_derivatives, DerivativeConfig};
use crate::error::Error;
use crate::evaporation::correct_evaporation;
use crate::gulps::{detect_gulps, GulpConfig, GulpSummary};
use crate::image::FrameSource;
use crate::kymograph::{build_kymographs, normalize_kymographs, KymographConfig};
use crate::levels::{detect_levels, detect_levels_from_frames, LevelConfig};
use crate::measure::Level2D;
use crate::threshold::{compute_threshold, ThresholdConfig};
use crate::timing::BinTiming;
use crate::tracking::{
    track_capillaries, Direction, FixedDecision, MismatchResolver, RoiMap, TrackerConfig,
};
use progress::{NoProgress, ProgressSink};

/// All capillaries of one recording plus the state shared between them.
#[derive(Debug, Clone, Default)]
pub struct Experiment {
    pub capillaries: Vec<Capillary>,
    pub timing: BinTiming,
    /// Gulp threshold from the control capillaries; compared against, never copied
    /// into a capillary.
    pub threshold: Option<Level2D>,
    pub stop: StopFlag,
}

impl Experiment {
    pub fn new(capillaries: Vec<Capillary>, timing: BinTiming) -> Self {
        Self {
            capillaries,
            timing,
            threshold: None,
            stop: StopFlag::new(),
        }
    }

    pub fn control_count(&self) -> usize {
        self.capillaries.iter().filter(|c| c.is_control()).count()
    }

    pub fn capillary(&self, name: &str) -> Option<&Capillary> {
        self.capillaries.iter().find(|c| c.name == name)
    }

    pub fn track_capillaries(
        &mut self,
        source: &dyn FrameSource,
        frames: RangeInclusive<usize>,
        direction: Direction,
        config: &TrackerConfig,
        resolver: &dyn MismatchResolver,
    ) -> Result<RoiMap, Error> {
        track_capillaries(
            &mut self.capillaries,
            source,
            frames,
            direction,
            config,
            resolver,
            &self.stop,
        )
    }

    pub fn build_kymographs(
        &mut self,
        source: &dyn FrameSource,
        config: &KymographConfig,
    ) -> Result<BatchReport, Error> {
        build_kymographs(&mut self.capillaries, source, &self.timing, config)
    }

    pub fn normalize_kymographs(&mut self) {
        normalize_kymographs(&mut self.capillaries);
    }

    pub fn detect_levels(&mut self, config: &LevelConfig) -> Result<BatchReport, Error> {
        detect_levels(&mut self.capillaries, config)
    }

    pub fn detect_levels_from_frames(
        &mut self,
        source: &dyn FrameSource,
        kymograph: &KymographConfig,
        config: &LevelConfig,
    ) -> Result<BatchReport, Error> {
        detect_levels_from_frames(&mut self.capillaries, source, &self.timing, kymograph, config)
    }

    pub fn correct_evaporation(&mut self) -> usize {
        correct_evaporation(&mut self.capillaries)
    }

    pub fn build_derivatives(&mut self, config: &DerivativeConfig) -> Result<BatchReport, Error> {
        build_derivatives(&mut self.capillaries, config)
    }

    /// Recomputes the shared threshold; `None` when no control capillary has a derivative.
    pub fn compute_threshold(&mut self, config: &ThresholdConfig) -> Option<&Level2D> {
        self.threshold = compute_threshold(&self.capillaries, config);
        self.threshold.as_ref()
    }

    pub fn detect_gulps(&mut self, config: &GulpConfig) -> Result<BatchReport, Error> {
        detect_gulps(&mut self.capillaries, self.threshold.as_ref(), config)
    }

    pub fn gulp_summaries(&self) -> Vec<Option<GulpSummary>> {
        self.capillaries.iter().map(GulpSummary::of).collect()
    }

    pub fn cage_measures(&self) -> Vec<CageMeasures> {
        cage_measures(&self.capillaries)
    }
}

/// Stages of [`run`], in execution order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Tracking,
    Kymographs,
    Levels,
    Evaporation,
    Derivatives,
    Threshold,
    Gulps,
}

/// Report of one finished stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub report: BatchReport,
}

/// Runs the full analysis on `experiment`.
///
/// Tracking runs first when enabled, then kymographs, levels, evaporation
/// correction, derivatives, the shared threshold and gulps. Returns
/// [`Error::Cancelled`] when the experiment's stop flag is raised between stages.
pub fn run(
    experiment: &mut Experiment,
    source: &dyn FrameSource,
    config: &Config,
    progress: Option<&dyn ProgressSink>,
) -> Result<Vec<StageReport>, Error> {
    let progress = progress.unwrap_or(&NoProgress);
    let result = run_stages(experiment, source, config, progress);
    match &result {
        Ok(_) => progress.on_completed(),
        Err(err) => progress.on_failed(&err.to_string()),
    }
    result
}

fn run_stages(
    experiment: &mut Experiment,
    source: &dyn FrameSource,
    config: &Config,
    progress: &dyn ProgressSink,
) -> Result<Vec<StageReport>, Error> {
    config.validate();
    if experiment.capillaries.is_empty() {
        return Err(Error::NoCapillaries);
    }
    let total = Stage::iter().count();
    let mut reports = Vec::with_capacity(total);
    tracing::info!(
        capillaries = experiment.capillaries.len(),
        controls = experiment.control_count(),
        frames = source.frame_count(),
        bins = experiment.timing.bin_count(),
        "analysis started"
    );

    for (index, stage) in Stage::iter().enumerate() {
        if experiment.stop.is_stopped() {
            tracing::info!(%stage, "analysis stopped");
            return Err(Error::Cancelled {
                stage: stage.into(),
            });
        }
        let report = match stage {
            Stage::Tracking if config.tracker.enabled => {
                let last = source.frame_count().saturating_sub(1);
                let resolver = FixedDecision(config.tracker.on_length_mismatch);
                let rois = experiment.track_capillaries(
                    source,
                    0..=last,
                    Direction::Forward,
                    &config.tracker,
                    &resolver,
                )?;
                BatchReport {
                    completed: rois.len(),
                    failed: 0,
                }
            }
            Stage::Tracking => BatchReport::default(),
            Stage::Kymographs => experiment.build_kymographs(source, &config.kymograph)?,
            Stage::Levels => experiment.detect_levels(&config.levels)?,
            Stage::Evaporation => BatchReport {
                completed: experiment.correct_evaporation(),
                failed: 0,
            },
            Stage::Derivatives => experiment.build_derivatives(&config.derivative)?,
            Stage::Threshold => {
                let available = experiment.compute_threshold(&config.threshold).is_some();
                BatchReport {
                    completed: usize::from(available),
                    failed: usize::from(!available),
                }
            }
            Stage::Gulps => experiment.detect_gulps(&config.gulps)?,
        };
        tracing::debug!(%stage, completed = report.completed, failed = report.failed, "stage done");
        reports.push(StageReport { stage, report });
        progress.on_progress(index + 1, total);
    }

    // Padding rows would read as liquid under `LessThan`, so equalize only for output.
    experiment.normalize_kymographs();
    tracing::debug!("kymographs padded to a common height");

    tracing::info!("analysis finished");
    Ok(reports)
}
