//! Lineshapes and the peak models built from them.
//!
//! - [`lineshape`]: lorentzian, gaussian and split-lorentzian curves
//! - [`PeakModel`]: the four fitted superpositions (single lorentzian, single
//!   gaussian, vinyl, p-xylene)
//! - [`Region`]: the two spectral regions and the sub-peak each one reports
//! - [`FitParameters`]: a parameter template validated against a model

pub mod lineshape;
mod peak;
mod template;

pub use lineshape::{gaussian, lorentzian, split_lorentzian, Lineshape};
pub use peak::{PeakModel, Region};
pub use template::FitParameters;
