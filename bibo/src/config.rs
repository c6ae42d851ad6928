//! Analysis settings, loadable from YAML or JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::derivative::DerivativeConfig;
use crate::gulps::GulpConfig;
use crate::kymograph::KymographConfig;
use crate::levels::LevelConfig;
use crate::threshold::ThresholdConfig;
use crate::tracking::TrackerConfig;

/// Settings of every stage. Missing sections and fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub kymograph: KymographConfig,
    pub levels: LevelConfig,
    pub derivative: DerivativeConfig,
    pub threshold: ThresholdConfig,
    pub gulps: GulpConfig,
}

impl Config {
    /// Panics on invalid settings.
    pub fn validate(&self) {
        self.tracker.validate();
        self.kymograph.validate();
        self.levels.validate();
        self.derivative.validate();
        self.threshold.validate();
        self.gulps.validate();
    }

    /// Reads a `.yaml`/`.yml` or `.json` file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: Config = common::file_format::load_file(path)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        common::file_format::save_file(self, path)
    }
}
