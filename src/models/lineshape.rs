//! Peak lineshape functions.
//!
//! All three shapes are area-normalised: integrated over the real line they
//! give `amplitude`. Widths are half widths at half maximum (lorentzian family)
//! or the standard deviation (gaussian). Callers keep amplitudes and widths
//! non-negative through fit bounds; the functions only guard against division
//! by zero.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Floor used in lineshape denominators.
pub const TINY: f64 = 1.0e-15;

/// Lorentzian peak.
///
/// f(x) = (A / (π σ)) · 1 / (1 + ((x − c) / σ)²)
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use raman_conversion::models::lineshape::lorentzian;
///
/// let y = lorentzian(array![1630.0].view(), 3.0, 1630.0, 2.0);
/// assert!((y[0] - 3.0 / (std::f64::consts::PI * 2.0)).abs() < 1e-12);
/// ```
pub fn lorentzian(x: ArrayView1<f64>, amplitude: f64, center: f64, half_width: f64) -> Array1<f64> {
    let scale = amplitude / TINY.max(PI * half_width);
    let width = TINY.max(half_width);
    x.mapv(|xi| {
        let u = (xi - center) / width;
        scale / (1.0 + u * u)
    })
}

/// Gaussian peak.
///
/// f(x) = (A / (√(2π) σ)) · exp(−(x − c)² / (2σ²))
pub fn gaussian(x: ArrayView1<f64>, amplitude: f64, center: f64, half_width: f64) -> Array1<f64> {
    let scale = amplitude / TINY.max((2.0 * PI).sqrt() * half_width);
    let denominator = TINY.max(2.0 * half_width * half_width);
    x.mapv(|xi| scale * (-(xi - center).powi(2) / denominator).exp())
}

/// Split (asymmetric) Lorentzian peak.
///
/// Uses `half_width_left` for `x < center` and `half_width_right` for
/// `x >= center`. Both halves have height `2A / (π (σl + σr))` at the center,
/// so the curve is continuous there.
pub fn split_lorentzian(
    x: ArrayView1<f64>,
    amplitude: f64,
    center: f64,
    half_width_left: f64,
    half_width_right: f64,
) -> Array1<f64> {
    let scale = 2.0 * amplitude / (PI * TINY.max(half_width_left + half_width_right));
    x.mapv(|xi| {
        let width = if xi < center { half_width_left } else { half_width_right };
        let w2 = width * width;
        let d2 = (xi - center).powi(2);
        if d2 + w2 == 0.0 {
            return scale;
        }
        scale * w2 / (d2 + w2)
    })
}

/// A single-peak lineshape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lineshape {
    Lorentzian,
    Gaussian,
}

impl Lineshape {
    /// Both lineshapes, in reporting order.
    pub const ALL: [Lineshape; 2] = [Lineshape::Lorentzian, Lineshape::Gaussian];

    /// Evaluate the lineshape.
    pub fn evaluate(&self, x: ArrayView1<f64>, amplitude: f64, center: f64, half_width: f64) -> Array1<f64> {
        match self {
            Lineshape::Lorentzian => lorentzian(x, amplitude, center, half_width),
            Lineshape::Gaussian => gaussian(x, amplitude, center, half_width),
        }
    }

    /// Full width at half maximum for a given half width.
    pub fn fwhm(&self, half_width: f64) -> f64 {
        match self {
            Lineshape::Lorentzian => 2.0 * half_width,
            Lineshape::Gaussian => 2.0 * (2.0 * 2.0_f64.ln()).sqrt() * half_width,
        }
    }

    /// Peak height for a given amplitude and half width.
    pub fn height(&self, amplitude: f64, half_width: f64) -> f64 {
        let width = half_width.max(f64::EPSILON);
        match self {
            Lineshape::Lorentzian => amplitude / (PI * width),
            Lineshape::Gaussian => amplitude / ((2.0 * PI).sqrt() * width),
        }
    }
}

impl fmt::Display for Lineshape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lineshape::Lorentzian => write!(f, "lorentzian"),
            Lineshape::Gaussian => write!(f, "gaussian"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::integrate::simpson;
    use approx::assert_relative_eq;

    #[test]
    fn test_peak_values_at_center() {
        let x = Array1::linspace(1600.0, 1660.0, 61);
        let lor = lorentzian(x.view(), 5.0, 1630.0, 3.0);
        let gau = gaussian(x.view(), 5.0, 1630.0, 3.0);

        assert_relative_eq!(lor[30], 5.0 / (PI * 3.0), epsilon = 1e-12);
        assert_relative_eq!(gau[30], 5.0 / ((2.0 * PI).sqrt() * 3.0), epsilon = 1e-12);

        let lor_max = lor.iter().cloned().fold(f64::MIN, f64::max);
        assert_eq!(lor_max, lor[30]);
    }

    #[test]
    fn test_split_lorentzian_continuity() {
        let center = 1612.0;
        let x = Array1::from_vec(vec![center - 1e-9, center]);
        let y = split_lorentzian(x.view(), 4.0, center, 1.5, 6.0);
        assert_relative_eq!(y[0], y[1], epsilon = 1e-9);
        assert_relative_eq!(y[1], 2.0 * 4.0 / (PI * 7.5), epsilon = 1e-12);
    }

    #[test]
    fn test_split_lorentzian_asymmetry() {
        let x = Array1::from_vec(vec![1608.0, 1616.0]);
        let y = split_lorentzian(x.view(), 4.0, 1612.0, 1.0, 4.0);
        assert!(y[1] > y[0]);
    }

    #[test]
    fn test_equal_widths_match_lorentzian() {
        let x = Array1::linspace(-20.0, 20.0, 81);
        let split = split_lorentzian(x.view(), 2.0, 0.0, 3.0, 3.0);
        let lor = lorentzian(x.view(), 2.0, 0.0, 3.0);
        for (a, b) in split.iter().zip(lor.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gaussian_area() {
        let x = Array1::linspace(-50.0, 50.0, 2001);
        let y = gaussian(x.view(), 7.0, 0.0, 2.5);
        assert_relative_eq!(simpson(y.view(), x.view()), 7.0, epsilon = 1e-8);
    }

    #[test]
    fn test_zero_width_is_finite() {
        let x = Array1::linspace(-1.0, 1.0, 5);
        for y in [
            lorentzian(x.view(), 1.0, 0.0, 0.0),
            gaussian(x.view(), 1.0, 0.0, 0.0),
            split_lorentzian(x.view(), 1.0, 0.0, 0.0, 0.0),
        ] {
            assert!(y.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_fwhm_and_height() {
        assert_relative_eq!(Lineshape::Lorentzian.fwhm(2.0), 4.0);
        assert_relative_eq!(Lineshape::Gaussian.fwhm(1.0), 2.354820045, epsilon = 1e-8);
        assert_relative_eq!(Lineshape::Lorentzian.height(PI, 1.0), 1.0);
        assert!(Lineshape::Gaussian.height(1.0, 0.0).is_finite());
        assert_eq!(Lineshape::Gaussian.to_string(), "gaussian");
    }
}
