//! Peak models and spectral regions.
//!
//! A [`PeakModel`] is a fixed superposition of lineshapes with a fixed,
//! ordered parameter set. Parameter vectors passed to [`PeakModel::evaluate`]
//! follow the order of [`PeakModel::parameter_names`].

use crate::error::{RamanError, Result};
use crate::models::lineshape::{gaussian, lorentzian, split_lorentzian, Lineshape};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SINGLE_PEAK: [&str; 3] = ["p1_amplitude", "p1_center", "p1_half_width"];

const VINYL: [&str; 6] = [
    "p1_amplitude",
    "p1_center",
    "p1_half_width",
    "p2_amplitude",
    "p2_center",
    "p2_half_width",
];

const PXYLENE: [&str; 10] = [
    "p1_amplitude",
    "p1_center",
    "p1_half_width",
    "p2_amplitude",
    "p2_center",
    "p2_half_width",
    "p3_amplitude",
    "p3_center",
    "p3_half_width_left",
    "p3_half_width_right",
];

/// The model fitted to a region of a spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeakModel {
    /// One lorentzian peak
    Lorentzian,
    /// One gaussian peak
    Gaussian,
    /// Two lorentzians (vinyl region)
    Vinyl,
    /// Two lorentzians and a split lorentzian (p-xylene region)
    #[serde(rename = "p-xylene")]
    PXylene,
}

impl PeakModel {
    /// Ordered parameter names of the model.
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            PeakModel::Lorentzian | PeakModel::Gaussian => &SINGLE_PEAK,
            PeakModel::Vinyl => &VINYL,
            PeakModel::PXylene => &PXYLENE,
        }
    }

    /// Number of parameters of the model.
    pub fn parameter_count(&self) -> usize {
        self.parameter_names().len()
    }

    /// Whether a parameter must stay non-negative (amplitudes and widths).
    pub fn is_non_negative(name: &str) -> bool {
        name.ends_with("_amplitude") || name.contains("_half_width")
    }

    /// Evaluate the model curve at `x`.
    pub fn evaluate(&self, values: ArrayView1<f64>, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        if values.len() != self.parameter_count() {
            return Err(RamanError::DimensionMismatch(format!(
                "{} model takes {} parameters, got {}",
                self,
                self.parameter_count(),
                values.len()
            )));
        }

        let v = |i: usize| values[i];
        let curve = match self {
            PeakModel::Lorentzian => lorentzian(x, v(0), v(1), v(2)),
            PeakModel::Gaussian => gaussian(x, v(0), v(1), v(2)),
            PeakModel::Vinyl => lorentzian(x, v(0), v(1), v(2)) + lorentzian(x, v(3), v(4), v(5)),
            PeakModel::PXylene => {
                lorentzian(x, v(0), v(1), v(2))
                    + lorentzian(x, v(3), v(4), v(5))
                    + split_lorentzian(x, v(6), v(7), v(8), v(9))
            }
        };
        Ok(curve)
    }

    /// Residuals `model(x) - y`.
    pub fn residuals(
        &self,
        values: ArrayView1<f64>,
        x: ArrayView1<f64>,
        y: ArrayView1<f64>,
    ) -> Result<Array1<f64>> {
        if x.len() != y.len() {
            return Err(RamanError::DimensionMismatch(format!(
                "x has {} samples, y has {}",
                x.len(),
                y.len()
            )));
        }
        Ok(self.evaluate(values, x)? - &y)
    }
}

impl From<Lineshape> for PeakModel {
    fn from(lineshape: Lineshape) -> Self {
        match lineshape {
            Lineshape::Lorentzian => PeakModel::Lorentzian,
            Lineshape::Gaussian => PeakModel::Gaussian,
        }
    }
}

impl fmt::Display for PeakModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeakModel::Lorentzian => write!(f, "lorentzian"),
            PeakModel::Gaussian => write!(f, "gaussian"),
            PeakModel::Vinyl => write!(f, "vinyl"),
            PeakModel::PXylene => write!(f, "p-xylene"),
        }
    }
}

/// A named region of the spectrum with its own peak model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "vinyl")]
    Vinyl,
    #[serde(rename = "p-xylene", alias = "pxylene")]
    PXylene,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::Vinyl, Region::PXylene];

    /// The model fitted to this region.
    pub fn model(&self) -> PeakModel {
        match self {
            Region::Vinyl => PeakModel::Vinyl,
            Region::PXylene => PeakModel::PXylene,
        }
    }

    /// Curve of the sub-peak whose area is reported for this region.
    ///
    /// For vinyl this is the second lorentzian, for p-xylene the split
    /// lorentzian. `values` follows the order of the region's model.
    pub fn target_peak(&self, values: ArrayView1<f64>, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        let model = self.model();
        if values.len() != model.parameter_count() {
            return Err(RamanError::DimensionMismatch(format!(
                "{} region takes {} parameters, got {}",
                self,
                model.parameter_count(),
                values.len()
            )));
        }
        Ok(match self {
            Region::Vinyl => lorentzian(x, values[3], values[4], values[5]),
            Region::PXylene => split_lorentzian(x, values[6], values[7], values[8], values[9]),
        })
    }

    /// Key of the left boundary in a region index table.
    pub fn left_key(&self) -> &'static str {
        match self {
            Region::Vinyl => "vinyl_left",
            Region::PXylene => "pxylene_left",
        }
    }

    /// Key of the right boundary in a region index table.
    pub fn right_key(&self) -> &'static str {
        match self {
            Region::Vinyl => "vinyl_right",
            Region::PXylene => "pxylene_right",
        }
    }
}

impl FromStr for Region {
    type Err = RamanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "vinyl" => Ok(Region::Vinyl),
            "p-xylene" | "pxylene" => Ok(Region::PXylene),
            _ => Err(RamanError::UnsupportedRegion(s.to_string())),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.model())
    }
}
