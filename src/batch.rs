//! Batch fitting of every spectrum in a region table.

use crate::baseline::{check_region_len, correct_baseline};
use crate::dataset::RegionTable;
use crate::error::Result;
use crate::fitting::{PeakFitter, RegionFit};
use crate::models::{FitParameters, Region};
use crate::parameters::Parameters;
use log::{debug, info, warn};
use rayon::prelude::*;

/// Outcome of fitting one row.
#[derive(Debug, Clone)]
pub enum RowOutcome {
    Fitted(RegionFit),
    /// The fit did not converge; the row fails the quality gate downstream.
    Failed { row: usize, reason: String },
}

impl RowOutcome {
    /// The fit, if there is one.
    pub fn fit(&self) -> Option<&RegionFit> {
        match self {
            RowOutcome::Fitted(fit) => Some(fit),
            RowOutcome::Failed { .. } => None,
        }
    }
}

/// Per-row results of a batch, in input row order.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub region: Region,
    pub rows: Vec<RowOutcome>,
}

impl BatchResult {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Best-fit parameters per row.
    pub fn params_list(&self) -> Vec<Option<&Parameters>> {
        self.rows.iter().map(|r| r.fit().map(|f| &f.parameters)).collect()
    }

    /// R² per row.
    pub fn r2_scores(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.fit().map(|f| f.r2)).collect()
    }

    /// Target sub-peak area per row.
    pub fn areas(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.fit().map(|f| f.area)).collect()
    }

    /// Indices of rows whose fit failed.
    pub fn failed_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .filter_map(|r| match r {
                RowOutcome::Failed { row, .. } => Some(*row),
                RowOutcome::Fitted(_) => None,
            })
            .collect()
    }
}

/// Baseline-correct and fit every row of `table`.
///
/// Every row starts from `template`; rows never see each other's results.
/// With `parallel` the rows are fitted on the rayon thread pool; the output
/// order is the input order either way.
///
/// # Errors
///
/// `InsufficientSamples` if the region is too narrow for a baseline, which
/// aborts the whole batch. Non-converged fits are recorded as
/// [`RowOutcome::Failed`]; any other row error aborts the batch.
pub fn fit_batch(
    fitter: &PeakFitter,
    table: &RegionTable,
    region: Region,
    template: &FitParameters,
    parallel: bool,
) -> Result<BatchResult> {
    check_region_len(table.width())?;
    info!("Fitting {} {} spectra ({} samples each)", table.len(), region, table.width());

    let fit_row = |row: usize| -> Result<RowOutcome> {
        let spectrum = table.spectrum(row);
        let corrected = correct_baseline(spectrum.x, spectrum.y)?;
        match fitter.fit_region(region, template, spectrum.x, corrected.subtracted.view()) {
            Ok(fit) => {
                debug!(
                    "{} row {}: r2 = {:.5}, area = {:.4}, {} iterations",
                    region, row, fit.r2, fit.area, fit.iterations
                );
                Ok(RowOutcome::Fitted(fit))
            }
            Err(err) if err.is_fit_failure() => {
                warn!("{} row {}: {}", region, row, err);
                Ok(RowOutcome::Failed {
                    row,
                    reason: err.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    };

    let rows = if parallel {
        (0..table.len()).into_par_iter().map(fit_row).collect::<Result<Vec<_>>>()?
    } else {
        (0..table.len()).map(fit_row).collect::<Result<Vec<_>>>()?
    };

    let result = BatchResult { region, rows };
    let failed = result.failed_rows().len();
    if failed > 0 {
        warn!("{} of {} {} fits did not converge", failed, result.len(), region);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RamanError;
    use crate::lm::LevenbergMarquardt;
    use crate::models::lorentzian;
    use ndarray::{Array1, Array2};

    fn vinyl_template() -> FitParameters {
        let mut params = Parameters::new();
        let start = [40.0, 1620.0, 3.0, 80.0, 1640.0, 3.0];
        for (name, value) in Region::Vinyl.model().parameter_names().iter().zip(start) {
            params.add_param_with_bounds(name, value, 0.0, f64::INFINITY).unwrap();
        }
        FitParameters::new(Region::Vinyl.model(), params).unwrap()
    }

    fn vinyl_table(second_amplitudes: &[f64]) -> RegionTable {
        let x = Array1::linspace(1600.0, 1660.0, 121);
        let mut intensities = Array2::zeros((second_amplitudes.len(), x.len()));
        for (mut row, &amplitude) in intensities.rows_mut().into_iter().zip(second_amplitudes) {
            let y = lorentzian(x.view(), 50.0, 1621.0, 2.5)
                + lorentzian(x.view(), amplitude, 1641.0, 3.0)
                + x.mapv(|v| 0.01 * v + 2.0);
            row.assign(&y);
        }
        RegionTable {
            wavenumbers: x,
            intensities,
        }
    }

    #[test]
    fn test_order_preserved() {
        let amplitudes = [60.0, 90.0, 120.0, 150.0];
        let table = vinyl_table(&amplitudes);
        let template = vinyl_template();
        let fitter = PeakFitter::new();

        for parallel in [false, true] {
            let result = fit_batch(&fitter, &table, Region::Vinyl, &template, parallel).unwrap();
            assert_eq!(result.len(), 4);
            let areas: Vec<f64> = result.areas().into_iter().map(|a| a.unwrap()).collect();
            for pair in areas.windows(2) {
                assert!(pair[0] < pair[1], "areas out of order: {:?}", areas);
            }
            assert!(result.r2_scores().iter().all(|r| r.unwrap() > 0.99));
            assert!(result.failed_rows().is_empty());
        }
    }

    #[test]
    fn test_failed_rows_do_not_abort() {
        let table = vinyl_table(&[60.0, 90.0]);
        let fitter = PeakFitter::with_solver(LevenbergMarquardt::new().with_max_iterations(1));

        let result = fit_batch(&fitter, &table, Region::Vinyl, &vinyl_template(), false).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.failed_rows(), vec![0, 1]);
        assert_eq!(result.areas(), vec![None, None]);
    }

    #[test]
    fn test_narrow_region_aborts() {
        let table = RegionTable {
            wavenumbers: Array1::linspace(0.0, 1.0, 9),
            intensities: Array2::zeros((3, 9)),
        };
        let err = fit_batch(&PeakFitter::new(), &table, Region::Vinyl, &vinyl_template(), false).unwrap_err();
        assert!(matches!(err, RamanError::InsufficientSamples { .. }));
    }
}
