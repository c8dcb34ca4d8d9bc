//! Peak fitting.
//!
//! [`PeakFitter`] runs the Levenberg-Marquardt solver on a bounded
//! [`ModelProblem`] and derives the reported quantities (R², FWHM, height,
//! area) from the converged parameters.

use crate::error::{RamanError, Result};
use crate::lm::{LevenbergMarquardt, LmConfig};
use crate::model::ModelProblem;
use crate::models::{FitParameters, Lineshape, PeakModel, Region};
use crate::parameters::Parameters;
use crate::uncertainty::{calculate_covariance, reduced_chi_square, standard_errors_from_covariance};
use crate::utils::{r2_score, simpson};
use log::debug;
use ndarray::{Array1, ArrayView1};

/// Result of fitting a single lorentzian or gaussian peak.
#[derive(Debug, Clone)]
pub struct LineshapeFit {
    pub lineshape: Lineshape,
    /// Best-fit parameters
    pub parameters: Parameters,
    /// Best-fit curve over the fitted x range
    pub best_fit: Array1<f64>,
    pub r2: f64,
    pub fwhm: f64,
    pub height: f64,
    /// Simpson integral of the best-fit curve
    pub auc: f64,
    pub iterations: usize,
}

/// Lorentzian and gaussian fits of the same data.
#[derive(Debug, Clone)]
pub struct LineshapeComparison {
    pub lorentzian: LineshapeFit,
    pub gaussian: LineshapeFit,
}

impl LineshapeComparison {
    /// The fit with the higher R² (lorentzian on ties).
    pub fn best(&self) -> &LineshapeFit {
        if self.gaussian.r2 > self.lorentzian.r2 {
            &self.gaussian
        } else {
            &self.lorentzian
        }
    }

    /// Fits in reporting order.
    pub fn fits(&self) -> [&LineshapeFit; 2] {
        [&self.lorentzian, &self.gaussian]
    }
}

/// Result of fitting one region of one spectrum.
#[derive(Debug, Clone)]
pub struct RegionFit {
    pub region: Region,
    /// Best-fit parameters of the full region model
    pub parameters: Parameters,
    /// Best-fit curve of the full region model
    pub best_fit: Array1<f64>,
    /// R² of the full model against the fitted data
    pub r2: f64,
    /// Simpson integral of the region's target sub-peak alone
    pub area: f64,
    pub iterations: usize,
}

/// Converged parameters and curve of one model fit.
struct ModelFit {
    parameters: Parameters,
    values: Array1<f64>,
    best_fit: Array1<f64>,
    r2: f64,
    iterations: usize,
}

/// Least-squares peak fitter.
///
/// Templates are never modified: every fit starts from the template's initial
/// values, so one template can be shared across a whole batch.
#[derive(Debug, Clone, Default)]
pub struct PeakFitter {
    solver: LevenbergMarquardt,
}

impl PeakFitter {
    /// Create a fitter with the default solver settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fitter with the given solver settings.
    pub fn with_config(config: LmConfig) -> Self {
        Self {
            solver: LevenbergMarquardt::with_config(config),
        }
    }

    /// Create a fitter around an existing solver.
    pub fn with_solver(solver: LevenbergMarquardt) -> Self {
        Self { solver }
    }

    /// The solver in use.
    pub fn solver(&self) -> &LevenbergMarquardt {
        &self.solver
    }

    /// Fit one lorentzian or gaussian peak.
    ///
    /// `template` must hold the single-peak keys (`p1_amplitude`, `p1_center`,
    /// `p1_half_width`); it may have been validated for either lineshape.
    pub fn fit_lineshape(
        &self,
        lineshape: Lineshape,
        template: &FitParameters,
        x: ArrayView1<f64>,
        y: ArrayView1<f64>,
    ) -> Result<LineshapeFit> {
        let template = template.for_model(PeakModel::from(lineshape))?;
        let fit = self.fit_model(&template, x, y)?;

        let amplitude = fit.values[0];
        let half_width = fit.values[2];
        let auc = simpson(fit.best_fit.view(), x);

        Ok(LineshapeFit {
            lineshape,
            fwhm: lineshape.fwhm(half_width),
            height: lineshape.height(amplitude, half_width),
            auc,
            parameters: fit.parameters,
            best_fit: fit.best_fit,
            r2: fit.r2,
            iterations: fit.iterations,
        })
    }

    /// Fit both lineshapes from the same template.
    pub fn compare_lineshapes(
        &self,
        template: &FitParameters,
        x: ArrayView1<f64>,
        y: ArrayView1<f64>,
    ) -> Result<LineshapeComparison> {
        Ok(LineshapeComparison {
            lorentzian: self.fit_lineshape(Lineshape::Lorentzian, template, x, y)?,
            gaussian: self.fit_lineshape(Lineshape::Gaussian, template, x, y)?,
        })
    }

    /// Fit a region model and integrate its target sub-peak.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `template` was built for another model,
    /// `FitDidNotConverge` if the solver stops without converging.
    pub fn fit_region(
        &self,
        region: Region,
        template: &FitParameters,
        x: ArrayView1<f64>,
        y: ArrayView1<f64>,
    ) -> Result<RegionFit> {
        if template.model() != region.model() {
            return Err(RamanError::InvalidParameter(format!(
                "the {} region needs a {} template, got {}",
                region,
                region.model(),
                template.model()
            )));
        }

        let fit = self.fit_model(template, x, y)?;
        let target = region.target_peak(fit.values.view(), x)?;
        let area = simpson(target.view(), x);

        Ok(RegionFit {
            region,
            parameters: fit.parameters,
            best_fit: fit.best_fit,
            r2: fit.r2,
            area,
            iterations: fit.iterations,
        })
    }

    fn fit_model(&self, template: &FitParameters, x: ArrayView1<f64>, y: ArrayView1<f64>) -> Result<ModelFit> {
        if x.len() != y.len() {
            return Err(RamanError::DimensionMismatch(format!(
                "x has {} samples, y has {}",
                x.len(),
                y.len()
            )));
        }

        let problem = ModelProblem::new(template, x.view(), y.view());
        let result = self.solver.minimize(&problem, problem.initial_internal()?)?;

        let mut parameters = template.parameters().clone();
        parameters.update_from_internal(&result.params)?;

        if !result.success() {
            return Err(RamanError::FitDidNotConverge {
                params: parameters.named_values(),
                iterations: result.iterations,
                message: result.message().to_string(),
            });
        }

        set_standard_errors(&problem, &mut parameters, result.cost);

        let values = parameters.values();
        let best_fit = &y + &result.residuals;
        let r2 = r2_score(y, best_fit.view());

        debug!(
            "{} fit: r2 = {:.6}, cost = {:.3e}, {} iterations ({})",
            template.model(),
            r2,
            result.cost,
            result.iterations,
            result.message()
        );

        Ok(ModelFit {
            parameters,
            values,
            best_fit,
            r2,
            iterations: result.iterations,
        })
    }
}

/// Attach standard errors from the covariance at the solution.
///
/// Left unset when the covariance cannot be estimated.
fn set_standard_errors(problem: &ModelProblem<'_>, parameters: &mut Parameters, cost: f64) {
    let redchi = reduced_chi_square(cost, problem.ndata(), parameters.len());
    let covariance = problem
        .external_jacobian(&parameters.values())
        .and_then(|jacobian| calculate_covariance(&jacobian, redchi));

    match covariance {
        Ok(covariance) => {
            let errors = standard_errors_from_covariance(&covariance);
            let names: Vec<String> = parameters.names().iter().map(|n| n.to_string()).collect();
            for (name, error) in names.iter().zip(errors.iter()) {
                if let Some(param) = parameters.get_mut(name) {
                    param.set_stderr(Some(*error));
                }
            }
        }
        Err(err) => debug!("no standard errors: {}", err),
    }
}
