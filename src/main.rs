//! # raman-conversion
//!
//! Command-line front end for the Raman conversion pipeline.
//!
//! ## Usage
//!
//! ```bash
//! # Full pipeline from a TOML config
//! raman-conversion run --config pipeline.toml
//!
//! # Ratio table of one dataset
//! raman-conversion ratio df_t30.csv --indices region_indices.csv \
//!     --vinyl-params vinyl.csv --pxylene-params pxylene.csv
//!
//! # Conversion from existing ratio tables
//! raman-conversion convert --reference df_t0_ratio.csv --repeat df_t0_repeat_ratio.csv \
//!     --sample 30=df_t30_ratio.csv --sample 120=df_t120_ratio.csv
//!
//! # Compare lorentzian and gaussian fits of one peak
//! raman-conversion single df_t0.csv --left 1600 --right 1660 --params single.csv
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

use raman_conversion::baseline::correct_baseline;
use raman_conversion::config::PipelineConfig;
use raman_conversion::conversion::{calculate_conversion, TimePointRatios, TimePointRole};
use raman_conversion::dataset::SpectralDataset;
use raman_conversion::fitting::PeakFitter;
use raman_conversion::models::{FitParameters, PeakModel, Region};
use raman_conversion::pipeline::{Pipeline, RatioStage};
use raman_conversion::ratio::{RatioTable, DEFAULT_R2_THRESHOLD};
use raman_conversion::region::{find_nearest, RegionBounds};

/// Raman conversion - peak fitting and conversion analysis of Raman spectra
#[derive(Parser)]
#[command(name = "raman-conversion")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every dataset and the conversion as described by a config file
    Run {
        /// Pipeline TOML file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Fit one dataset and write its ratio and area tables
    Ratio {
        /// Dataset CSV (index, condition, intensities by wavenumber)
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,

        /// Region index table (vinyl_left, vinyl_right, pxylene_left, pxylene_right)
        #[arg(long, value_name = "FILE")]
        indices: PathBuf,

        /// Vinyl parameter definition table
        #[arg(long, value_name = "FILE")]
        vinyl_params: PathBuf,

        /// p-xylene parameter definition table
        #[arg(long, value_name = "FILE")]
        pxylene_params: PathBuf,

        /// Directory for <name>_ratio.csv and <name>_areas.csv
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Output file stem (defaults to the dataset file stem)
        #[arg(long)]
        name: Option<String>,

        /// R² both regions must exceed
        #[arg(long, default_value_t = DEFAULT_R2_THRESHOLD)]
        threshold: f64,

        /// Fit spectra one after another
        #[arg(long)]
        sequential: bool,
    },

    /// Compute conversions from per-time-point ratio tables
    Convert {
        /// Ratio table of the t0 measurement
        #[arg(long, value_name = "FILE")]
        reference: PathBuf,

        /// Ratio table of the repeated t0 measurement (reference for the latest sample)
        #[arg(long, value_name = "FILE")]
        repeat: Option<PathBuf>,

        /// Sample ratio table as MINUTES=FILE, repeatable
        #[arg(long = "sample", value_name = "MINUTES=FILE", value_parser = parse_sample)]
        samples: Vec<(u32, PathBuf)>,

        /// Directory for df_conversion.csv and df_error.csv
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Baseline-correct one spectrum window and compare lorentzian and gaussian fits
    Single {
        /// Dataset CSV
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,

        /// Left wavenumber of the window
        #[arg(long)]
        left: f64,

        /// Right wavenumber of the window
        #[arg(long)]
        right: f64,

        /// Parameter definition table with p1_amplitude, p1_center, p1_half_width
        #[arg(long, value_name = "FILE")]
        params: PathBuf,

        /// Row (spectrum) to fit
        #[arg(long, default_value = "0")]
        row: usize,
    },
}

fn parse_sample(s: &str) -> std::result::Result<(u32, PathBuf), String> {
    let (minutes, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected MINUTES=FILE, got '{}'", s))?;
    let minutes = minutes
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("'{}' is not a whole number of minutes", minutes))?;
    Ok((minutes, PathBuf::from(path.trim())))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Run { config } => run_pipeline(&config),
        Commands::Ratio {
            dataset,
            indices,
            vinyl_params,
            pxylene_params,
            output_dir,
            name,
            threshold,
            sequential,
        } => {
            let stage = RatioStage {
                fitter: PeakFitter::new(),
                bounds: RegionBounds::from_csv_file(&indices).context("Failed to load region indices")?,
                vinyl: FitParameters::from_csv_file(Region::Vinyl.model(), &vinyl_params)
                    .context("Failed to load vinyl parameters")?,
                pxylene: FitParameters::from_csv_file(Region::PXylene.model(), &pxylene_params)
                    .context("Failed to load p-xylene parameters")?,
                r2_threshold: threshold,
                parallel: !sequential,
            };
            let name = match name {
                Some(name) => name,
                None => file_stem(&dataset)?,
            };
            run_ratio(&stage, &dataset, &name, &output_dir)
        }
        Commands::Convert {
            reference,
            repeat,
            samples,
            output_dir,
        } => run_convert(&reference, repeat.as_deref(), &samples, &output_dir),
        Commands::Single {
            dataset,
            left,
            right,
            params,
            row,
        } => run_single(&dataset, left, right, &params, row),
    }
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| format!("Cannot derive a name from {}", path.display()))
}

fn run_pipeline(config_path: &Path) -> Result<()> {
    let config = PipelineConfig::from_file(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    let pipeline = Pipeline::from_config(config).context("Failed to prepare pipeline")?;
    let summary = pipeline.run().context("Pipeline failed")?;

    for dataset in &summary.datasets {
        info!(
            "{}: {} of {} spectra passed -> {}",
            dataset.name,
            dataset.passed,
            dataset.spectra,
            dataset.ratio_path.display()
        );
    }
    info!(
        "Conversion over {:?} min written to {}",
        summary.conversion.time_points,
        pipeline.config().output_dir.display()
    );
    Ok(())
}

fn run_ratio(stage: &RatioStage, dataset_path: &Path, name: &str, output_dir: &Path) -> Result<()> {
    let dataset = SpectralDataset::from_csv_file(dataset_path)
        .with_context(|| format!("Failed to read dataset {}", dataset_path.display()))?;
    info!("Read {} spectra from {}", dataset.len(), dataset_path.display());

    let report = stage.process(&dataset).context("Ratio extraction failed")?;
    let path = stage
        .write(&report, name, output_dir)
        .context("Failed to write ratio tables")?;

    info!(
        "{} of {} spectra passed; ratio table at {}",
        report.passed_count(),
        report.spectra.len(),
        path.display()
    );
    Ok(())
}

fn run_convert(reference: &Path, repeat: Option<&Path>, samples: &[(u32, PathBuf)], output_dir: &Path) -> Result<()> {
    if samples.is_empty() {
        bail!("At least one --sample MINUTES=FILE is required");
    }

    let load = |path: &Path| {
        RatioTable::from_csv_file(path).with_context(|| format!("Failed to read ratio table {}", path.display()))
    };

    let mut inputs = vec![TimePointRatios {
        minutes: 0,
        role: TimePointRole::Reference,
        table: load(reference)?,
    }];
    if let Some(repeat) = repeat {
        inputs.push(TimePointRatios {
            minutes: 0,
            role: TimePointRole::RepeatReference,
            table: load(repeat)?,
        });
    }
    for (minutes, path) in samples {
        inputs.push(TimePointRatios {
            minutes: *minutes,
            role: TimePointRole::Sample,
            table: load(path)?,
        });
    }

    let conversion = calculate_conversion(&inputs).context("Conversion failed")?;
    std::fs::create_dir_all(output_dir)?;
    conversion
        .write_to_dir(output_dir)
        .context("Failed to write conversion tables")?;
    Ok(())
}

fn run_single(dataset_path: &Path, left: f64, right: f64, params_path: &Path, row: usize) -> Result<()> {
    let dataset = SpectralDataset::from_csv_file(dataset_path)
        .with_context(|| format!("Failed to read dataset {}", dataset_path.display()))?;
    let template = FitParameters::from_csv_file(PeakModel::Lorentzian, params_path)
        .context("Failed to load single-peak parameters")?;

    let (low, high) = if left <= right { (left, right) } else { (right, left) };
    let (start, _) = find_nearest(dataset.wavenumbers.view(), low)?;
    let (end, _) = find_nearest(dataset.wavenumbers.view(), high)?;

    let spectrum = dataset.spectrum(row)?;
    let x = spectrum.x.slice(ndarray::s![start..=end]);
    let y = spectrum.y.slice(ndarray::s![start..=end]);

    let corrected = correct_baseline(x, y).context("Baseline correction failed")?;
    let comparison = PeakFitter::new()
        .compare_lineshapes(&template, x, corrected.subtracted.view())
        .context("Peak fitting failed")?;

    println!(
        "Row {} (condition {}), {:.2} to {:.2} cm-1, {} samples",
        row,
        dataset.conditions[row],
        x[0],
        x[x.len() - 1],
        x.len()
    );
    println!(
        "Baseline: slope {:.6}, intercept {:.4}",
        corrected.line.slope, corrected.line.intercept
    );
    for fit in comparison.fits() {
        println!();
        println!("{}:", fit.lineshape);
        for param in fit.parameters.iter() {
            match param.stderr() {
                Some(stderr) => println!("  {:<16} {:>14.6} +/- {:.6}", param.name(), param.value(), stderr),
                None => println!("  {:<16} {:>14.6}", param.name(), param.value()),
            }
        }
        println!("  {:<16} {:>14.6}", "r2", fit.r2);
        println!("  {:<16} {:>14.6}", "fwhm", fit.fwhm);
        println!("  {:<16} {:>14.6}", "height", fit.height);
        println!("  {:<16} {:>14.6}", "auc", fit.auc);
    }
    println!();
    println!("Better fit: {}", comparison.best().lineshape);
    Ok(())
}
