//! TOML pipeline configuration.
//!
//! ```toml
//! # pipeline.toml
//! region_indices = "region_indices.csv"
//! vinyl_parameters = "vinyl_parameters.csv"
//! pxylene_parameters = "pxylene_parameters.csv"
//! output_dir = "results"
//! r2_threshold = 0.95
//! parallel = true
//!
//! [solver]
//! max_iterations = 2000
//!
//! [[datasets]]
//! name = "df_t0"
//! path = "df_t0.csv"
//! minutes = 0
//! role = "reference"
//!
//! [[datasets]]
//! name = "df_t30"
//! path = "df_t30.csv"
//! minutes = 30
//! ```
//!
//! Relative paths in a file loaded with [`PipelineConfig::from_file`] are
//! resolved against the directory of that file.

use crate::conversion::TimePointRole;
use crate::error::{RamanError, Result};
use crate::lm::LmConfig;
use crate::ratio::DEFAULT_R2_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One dataset (time point) of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Output file stem; `<name>_ratio.csv` and `<name>_areas.csv`
    pub name: String,
    pub path: PathBuf,
    pub minutes: u32,
    #[serde(default = "default_role")]
    pub role: TimePointRole,
}

fn default_role() -> TimePointRole {
    TimePointRole::Sample
}

fn default_threshold() -> f64 {
    DEFAULT_R2_THRESHOLD
}

fn default_parallel() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Root configuration of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub datasets: Vec<DatasetConfig>,

    /// Headerless `key,index` table of region column bounds
    pub region_indices: PathBuf,

    /// Parameter definition table for the vinyl region
    pub vinyl_parameters: PathBuf,

    /// Parameter definition table for the p-xylene region
    pub pxylene_parameters: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Both regions must fit with R² above this to count
    #[serde(default = "default_threshold")]
    pub r2_threshold: f64,

    /// Fit the spectra of a dataset in parallel
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    #[serde(default)]
    pub solver: LmConfig,
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RamanError::MissingOrMalformedInput(format!("cannot read config file {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.datasets.is_empty() {
            return Err(RamanError::MissingOrMalformedInput(
                "config lists no datasets".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.r2_threshold) {
            return Err(RamanError::InvalidParameter(format!(
                "r2_threshold must lie in [0, 1], got {}",
                self.r2_threshold
            )));
        }
        let mut names: Vec<&str> = self.datasets.iter().map(|d| d.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(RamanError::MissingOrMalformedInput(
                "dataset names must be unique".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.region_indices);
        resolve(&mut self.vinyl_parameters);
        resolve(&mut self.pxylene_parameters);
        resolve(&mut self.output_dir);
        for dataset in &mut self.datasets {
            resolve(&mut dataset.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        region_indices = "indices.csv"
        vinyl_parameters = "vinyl.csv"
        pxylene_parameters = "pxylene.csv"

        [solver]
        max_iterations = 500

        [[datasets]]
        name = "df_t0"
        path = "df_t0.csv"
        minutes = 0
        role = "reference"

        [[datasets]]
        name = "df_t0_repeat"
        path = "df_t0_repeat.csv"
        minutes = 0
        role = "repeat"

        [[datasets]]
        name = "df_t30"
        path = "df_t30.csv"
        minutes = 30
    "#;

    #[test]
    fn test_parse_config() {
        let config = PipelineConfig::from_str(CONFIG).unwrap();
        assert_eq!(config.datasets.len(), 3);
        assert_eq!(config.datasets[0].role, TimePointRole::Reference);
        assert_eq!(config.datasets[1].role, TimePointRole::RepeatReference);
        assert_eq!(config.datasets[2].role, TimePointRole::Sample);
        assert_eq!(config.r2_threshold, 0.95);
        assert!(config.parallel);
        assert_eq!(config.solver.max_iterations, 500);
        assert_eq!(config.solver.ftol, LmConfig::default().ftol);
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_relative_paths_follow_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, CONFIG).unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.region_indices, dir.path().join("indices.csv"));
        assert_eq!(config.datasets[2].path, dir.path().join("df_t30.csv"));
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            PipelineConfig::from_str("datasets = []\nregion_indices = \"a\"\nvinyl_parameters = \"b\"\npxylene_parameters = \"c\""),
            Err(RamanError::MissingOrMalformedInput(_))
        ));

        let bad_threshold = CONFIG.replace("region_indices", "r2_threshold = 1.5\n        region_indices");
        assert!(PipelineConfig::from_str(&bad_threshold).is_err());

        assert!(matches!(
            PipelineConfig::from_str("not toml ="),
            Err(RamanError::TomlError(_))
        ));
    }
}
