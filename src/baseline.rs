//! Linear baseline correction.
//!
//! The background under a region is modelled as a straight line through the
//! outermost samples on both sides, which are assumed to be peak-free.

use crate::error::{RamanError, Result};
use ndarray::{s, Array1, ArrayView1};

/// Number of samples taken from each end of a region.
pub const EXTREME_POINTS: usize = 5;

/// Smallest region that can be baseline-corrected.
pub const MIN_REGION_SAMPLES: usize = 2 * EXTREME_POINTS;

/// A fitted straight-line background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearBaseline {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearBaseline {
    /// Fit a line through the extreme samples of `(x, y)`.
    ///
    /// # Errors
    ///
    /// `InsufficientSamples` when the region has fewer than
    /// [`MIN_REGION_SAMPLES`] samples, `DimensionMismatch` when `x` and `y`
    /// differ in length.
    pub fn fit(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(RamanError::DimensionMismatch(format!(
                "x has {} samples, y has {}",
                x.len(),
                y.len()
            )));
        }
        check_region_len(x.len())?;

        let n = x.len();
        let xs = x
            .slice(s![..EXTREME_POINTS])
            .iter()
            .chain(x.slice(s![n - EXTREME_POINTS..]).iter())
            .copied()
            .collect::<Vec<_>>();
        let ys = y
            .slice(s![..EXTREME_POINTS])
            .iter()
            .chain(y.slice(s![n - EXTREME_POINTS..]).iter())
            .copied()
            .collect::<Vec<_>>();

        Self::least_squares(&xs, &ys)
    }

    /// Ordinary least-squares line through the points.
    fn least_squares(xs: &[f64], ys: &[f64]) -> Result<Self> {
        let count = xs.len() as f64;
        let x_mean = xs.iter().sum::<f64>() / count;
        let y_mean = ys.iter().sum::<f64>() / count;

        let sxx: f64 = xs.iter().map(|x| (x - x_mean).powi(2)).sum();
        let sxy: f64 = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| (x - x_mean) * (y - y_mean))
            .sum();

        if sxx == 0.0 || !sxx.is_finite() {
            return Err(RamanError::SingularMatrix);
        }

        let slope = sxy / sxx;
        Ok(Self {
            slope,
            intercept: y_mean - slope * x_mean,
        })
    }

    /// Evaluate the line at `x`.
    pub fn evaluate(&self, x: ArrayView1<f64>) -> Array1<f64> {
        x.mapv(|xi| self.slope * xi + self.intercept)
    }
}

/// A region with its background removed.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineCorrection {
    /// The fitted background line
    pub line: LinearBaseline,
    /// The line evaluated over the whole region
    pub baseline: Array1<f64>,
    /// `y - baseline`
    pub subtracted: Array1<f64>,
}

/// Fit and subtract a linear baseline from one region of one spectrum.
pub fn correct_baseline(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Result<BaselineCorrection> {
    let line = LinearBaseline::fit(x, y)?;
    let baseline = line.evaluate(x);
    let subtracted = &y - &baseline;
    Ok(BaselineCorrection {
        line,
        baseline,
        subtracted,
    })
}

/// Fail with `InsufficientSamples` for regions shorter than [`MIN_REGION_SAMPLES`].
pub fn check_region_len(len: usize) -> Result<()> {
    if len < MIN_REGION_SAMPLES {
        return Err(RamanError::InsufficientSamples {
            required: MIN_REGION_SAMPLES,
            found: len,
        });
    }
    Ok(())
}
