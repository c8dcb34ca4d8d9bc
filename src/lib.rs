//! # raman-conversion
//!
//! `raman-conversion` turns batches of Raman spectra into reaction conversion
//! curves with propagated uncertainty.
//!
//! The pipeline:
//! - slices the vinyl and p-xylene regions out of each spectrum
//! - removes a linear baseline fitted through the region extremes
//! - fits peak models (lorentzian, gaussian, split-lorentzian superpositions)
//!   with a bounded Levenberg-Marquardt solver
//! - gates spectra on fit quality and aggregates vinyl / p-xylene area ratios
//!   per experimental condition
//! - converts ratio time series into conversion percentages relative to t0
//!
//! ## Basic Usage
//!
//! ```
//! use ndarray::Array1;
//! use raman_conversion::fitting::PeakFitter;
//! use raman_conversion::models::{lorentzian, FitParameters, Lineshape, PeakModel};
//! use raman_conversion::parameters::Parameters;
//!
//! let x = Array1::linspace(1600.0, 1660.0, 121);
//! let y = lorentzian(x.view(), 250.0, 1631.0, 3.5);
//!
//! let mut params = Parameters::new();
//! params.add_param_with_bounds("p1_amplitude", 200.0, 0.0, f64::INFINITY).unwrap();
//! params.add_param_with_bounds("p1_center", 1630.0, 0.0, f64::INFINITY).unwrap();
//! params.add_param_with_bounds("p1_half_width", 4.0, 0.0, f64::INFINITY).unwrap();
//! let template = FitParameters::new(PeakModel::Lorentzian, params).unwrap();
//!
//! let fit = PeakFitter::new()
//!     .fit_lineshape(Lineshape::Lorentzian, &template, x.view(), y.view())
//!     .unwrap();
//! assert!(fit.r2 > 0.999);
//! assert!((fit.fwhm - 7.0).abs() < 1e-4);
//! ```

pub mod error;

// Solver
pub mod lm;
pub mod model;
pub mod parameters;
pub mod problem;
pub mod uncertainty;
pub mod utils;

// Spectral analysis
pub mod baseline;
pub mod batch;
pub mod dataset;
pub mod fitting;
pub mod models;
pub mod region;

// Aggregation and output
pub mod config;
pub mod conversion;
pub mod pipeline;
pub mod ratio;

// Re-exports for convenience
pub use error::{RamanError, Result};
pub use fitting::PeakFitter;
pub use lm::LevenbergMarquardt;
pub use models::{PeakModel, Region};
pub use problem::Problem;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
