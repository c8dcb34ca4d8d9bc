//! Levenberg-Marquardt algorithm implementation.
//!
//! This module provides the damped least-squares solver used to fit peak
//! models to baseline-corrected spectra.

pub mod algorithm;
pub mod config;
pub mod convergence;

// Re-export key types
pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::LmConfig;
pub use convergence::ConvergenceStatus;
