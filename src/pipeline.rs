//! End-to-end pipeline: datasets to ratio tables to conversions.

use crate::batch::fit_batch;
use crate::config::PipelineConfig;
use crate::conversion::{calculate_conversion, ConversionTable, TimePointRatios};
use crate::dataset::SpectralDataset;
use crate::error::{RamanError, Result};
use crate::fitting::PeakFitter;
use crate::models::{FitParameters, Region};
use crate::ratio::{aggregate_ratio, RatioReport};
use crate::region::{slice_regions, RegionBounds};
use log::info;
use std::path::{Path, PathBuf};

/// Fitting and aggregation of one dataset into a ratio report.
#[derive(Debug, Clone)]
pub struct RatioStage {
    pub fitter: PeakFitter,
    pub bounds: RegionBounds,
    pub vinyl: FitParameters,
    pub pxylene: FitParameters,
    pub r2_threshold: f64,
    pub parallel: bool,
}

impl RatioStage {
    /// Slice, baseline-correct, fit and aggregate one dataset.
    pub fn process(&self, dataset: &SpectralDataset) -> Result<RatioReport> {
        let (vinyl_table, pxylene_table) = slice_regions(dataset, &self.bounds)?;
        let vinyl = fit_batch(&self.fitter, &vinyl_table, Region::Vinyl, &self.vinyl, self.parallel)?;
        let pxylene = fit_batch(&self.fitter, &pxylene_table, Region::PXylene, &self.pxylene, self.parallel)?;
        aggregate_ratio(dataset, &vinyl, &pxylene, self.r2_threshold)
    }

    /// Write `<name>_ratio.csv` and `<name>_areas.csv`, returning the ratio path.
    pub fn write(&self, report: &RatioReport, name: &str, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let ratio_path = dir.join(format!("{}_ratio.csv", name));
        report.stats.write_csv_file(&ratio_path)?;
        report.write_areas_csv_file(dir.join(format!("{}_areas.csv", name)))?;
        info!("Wrote {}", ratio_path.display());
        Ok(ratio_path)
    }
}

/// What happened to one dataset.
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub name: String,
    pub spectra: usize,
    pub passed: usize,
    pub ratio_path: PathBuf,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub datasets: Vec<DatasetSummary>,
    pub conversion: ConversionTable,
}

/// A configured pipeline run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    stage: RatioStage,
}

impl Pipeline {
    /// Load the region bounds and parameter templates named by `config`.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let stage = RatioStage {
            fitter: PeakFitter::with_config(config.solver.clone()),
            bounds: RegionBounds::from_csv_file(&config.region_indices)?,
            vinyl: FitParameters::from_csv_file(Region::Vinyl.model(), &config.vinyl_parameters)?,
            pxylene: FitParameters::from_csv_file(Region::PXylene.model(), &config.pxylene_parameters)?,
            r2_threshold: config.r2_threshold,
            parallel: config.parallel,
        };
        Ok(Self { config, stage })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn stage(&self) -> &RatioStage {
        &self.stage
    }

    /// Run every dataset, then the conversion.
    ///
    /// Ratio files are written only once every dataset has been processed,
    /// and the conversion files only once the conversion succeeded.
    pub fn run(&self) -> Result<PipelineSummary> {
        let mut reports = Vec::with_capacity(self.config.datasets.len());
        for dataset_config in &self.config.datasets {
            info!("Processing dataset {} ({})", dataset_config.name, dataset_config.path.display());
            let dataset = SpectralDataset::from_csv_file(&dataset_config.path)?;
            let report = self.stage.process(&dataset).map_err(|e| match e {
                RamanError::MissingOrMalformedInput(msg) => {
                    RamanError::MissingOrMalformedInput(format!("{}: {}", dataset_config.name, msg))
                }
                other => other,
            })?;
            reports.push(report);
        }

        let inputs: Vec<TimePointRatios> = self
            .config
            .datasets
            .iter()
            .zip(&reports)
            .map(|(d, report)| TimePointRatios {
                minutes: d.minutes,
                role: d.role,
                table: report.stats.clone(),
            })
            .collect();
        let conversion = calculate_conversion(&inputs)?;

        let output_dir = &self.config.output_dir;
        let mut datasets = Vec::with_capacity(reports.len());
        for (dataset_config, report) in self.config.datasets.iter().zip(&reports) {
            let ratio_path = self.stage.write(report, &dataset_config.name, output_dir)?;
            datasets.push(DatasetSummary {
                name: dataset_config.name.clone(),
                spectra: report.spectra.len(),
                passed: report.passed_count(),
                ratio_path,
            });
        }
        conversion.write_to_dir(output_dir)?;

        Ok(PipelineSummary { datasets, conversion })
    }
}
