//! Peak fitting on synthetic spectra with noise.

mod common;

use approx::assert_relative_eq;
use ndarray::{s, Array1};
use raman_conversion::baseline::correct_baseline;
use raman_conversion::batch::fit_batch;
use raman_conversion::dataset::SpectralDataset;
use raman_conversion::fitting::PeakFitter;
use raman_conversion::models::{lorentzian, FitParameters, Lineshape, PeakModel, Region};
use raman_conversion::parameters::Parameters;
use raman_conversion::region::{slice_region, RegionBounds};
use raman_conversion::RamanError;
use rand::Rng;

fn vinyl_template() -> FitParameters {
    FitParameters::new(
        PeakModel::Vinyl,
        Parameters::from_csv_reader(common::VINYL_PARAMETERS.as_bytes()).unwrap(),
    )
    .unwrap()
}

fn pxylene_template() -> FitParameters {
    FitParameters::new(
        PeakModel::PXylene,
        Parameters::from_csv_reader(common::PXYLENE_PARAMETERS.as_bytes()).unwrap(),
    )
    .unwrap()
}

fn single_template(amplitude: f64, center: f64, half_width: f64) -> FitParameters {
    let mut params = Parameters::new();
    params.add_param_with_bounds("p1_amplitude", amplitude, 0.0, f64::INFINITY).unwrap();
    params.add_param_with_bounds("p1_center", center, 0.0, f64::INFINITY).unwrap();
    params.add_param_with_bounds("p1_half_width", half_width, 0.0, f64::INFINITY).unwrap();
    FitParameters::new(PeakModel::Lorentzian, params).unwrap()
}

#[test]
fn test_noisy_lorentzian_recovery() {
    let x = Array1::linspace(1600.0, 1660.0, 241);
    let mut rng = common::rng(42);
    let y = lorentzian(x.view(), 250.0, 1631.0, 3.5).mapv(|v| v + rng.gen_range(-0.05..0.05));

    let fit = PeakFitter::new()
        .fit_lineshape(Lineshape::Lorentzian, &single_template(200.0, 1628.0, 5.0), x.view(), y.view())
        .unwrap();

    let center = fit.parameters.get("p1_center").unwrap();
    assert_relative_eq!(center.value(), 1631.0, epsilon = 0.02);
    assert_relative_eq!(fit.fwhm, 7.0, epsilon = 0.05);
    assert_relative_eq!(fit.height, 250.0 / (std::f64::consts::PI * 3.5), epsilon = 0.1);
    assert!(fit.r2 > 0.999);

    // Noise gives finite, small standard errors
    let stderr = center.stderr().unwrap();
    assert!(stderr > 0.0 && stderr < 0.05);
}

#[test]
fn test_lineshape_comparison_prefers_true_shape() {
    let x = Array1::linspace(1600.0, 1660.0, 241);
    let y = lorentzian(x.view(), 250.0, 1631.0, 3.5);

    let comparison = PeakFitter::new()
        .compare_lineshapes(&single_template(200.0, 1630.0, 4.0), x.view(), y.view())
        .unwrap();
    assert_eq!(comparison.best().lineshape, Lineshape::Lorentzian);
    assert!(comparison.gaussian.r2 < comparison.lorentzian.r2);
    // The lorentzian integrates to less than its amplitude over a finite window
    assert!(comparison.lorentzian.auc < 250.0);
    assert!(comparison.lorentzian.auc > 225.0);
}

#[test]
fn test_vinyl_region_after_baseline_correction() {
    let x = common::axis();
    let y = common::noisy_spectrum(&x, 100.0, &mut common::rng(3));

    let window = s![160..300];
    let (xr, yr) = (x.slice(window), y.slice(window));
    let corrected = correct_baseline(xr, yr).unwrap();
    assert!(corrected.line.slope.abs() < 0.05);

    let fit = PeakFitter::new()
        .fit_region(Region::Vinyl, &vinyl_template(), xr, corrected.subtracted.view())
        .unwrap();
    assert!(fit.r2 > 0.999);

    let params = &fit.parameters;
    assert_relative_eq!(params.value("p1_center").unwrap(), 1640.0, epsilon = 0.02);
    assert_relative_eq!(params.value("p2_center").unwrap(), 1665.0, epsilon = 0.02);
    assert_relative_eq!(params.value("p2_half_width").unwrap(), 1.2, epsilon = 0.05);

    // Area of the 1665 peak alone, truncated by the window
    let truth = lorentzian(xr, 100.0, 1665.0, 1.2);
    let expected = raman_conversion::utils::simpson(truth.view(), xr);
    assert_relative_eq!(fit.area, expected, max_relative = 0.02);
}

#[test]
fn test_pxylene_region_recovers_split_peak() {
    let x = common::axis();
    let y = common::clean_spectrum(&x, 100.0);

    let window = s![20..160];
    let (xr, yr) = (x.slice(window), y.slice(window));
    let corrected = correct_baseline(xr, yr).unwrap();
    let fit = PeakFitter::new()
        .fit_region(Region::PXylene, &pxylene_template(), xr, corrected.subtracted.view())
        .unwrap();

    assert!(fit.r2 > 0.999);
    let params = &fit.parameters;
    assert_eq!(params.len(), 10);
    assert_relative_eq!(params.value("p3_center").unwrap(), 1600.0, epsilon = 0.02);
    assert_relative_eq!(params.value("p3_half_width_left").unwrap(), 1.0, epsilon = 0.05);
    assert_relative_eq!(params.value("p3_half_width_right").unwrap(), 1.2, epsilon = 0.05);
    assert!(fit.area > 100.0 && fit.area < 120.0);
}

#[test]
fn test_template_must_match_region() {
    let x = common::axis();
    let y = common::clean_spectrum(&x, 100.0);
    let result = PeakFitter::new().fit_region(Region::PXylene, &vinyl_template(), x.view(), y.view());
    assert!(matches!(result, Err(RamanError::InvalidParameter(_))));
}

#[test]
fn test_unknown_region_name() {
    assert!(matches!("other".parse::<Region>(), Err(RamanError::UnsupportedRegion(_))));
    assert_eq!("p-xylene".parse::<Region>().unwrap(), Region::PXylene);
    assert!(matches!("Vinyl".parse::<Region>(), Err(RamanError::UnsupportedRegion(_))));
}

#[test]
fn test_batch_preserves_row_order() {
    let csv = common::dataset_csv(&[("1", 100.0), ("2", 40.0), ("3", 70.0)], 1, 5);
    let dataset = SpectralDataset::from_reader(csv.as_bytes()).unwrap();
    let bounds = RegionBounds::from_reader(common::region_indices_csv().as_bytes()).unwrap();
    let table = slice_region(&dataset, &bounds, Region::Vinyl).unwrap();
    assert_eq!(table.width(), common::VINYL_RIGHT - common::VINYL_LEFT);
    assert_relative_eq!(table.wavenumbers[0], 1620.0);

    let fitter = PeakFitter::new();
    let parallel = fit_batch(&fitter, &table, Region::Vinyl, &vinyl_template(), true).unwrap();
    let sequential = fit_batch(&fitter, &table, Region::Vinyl, &vinyl_template(), false).unwrap();

    let areas: Vec<f64> = parallel.areas().into_iter().map(Option::unwrap).collect();
    assert!(areas[0] > areas[2] && areas[2] > areas[1]);
    assert_relative_eq!(areas[1] / areas[0], 0.4, epsilon = 0.01);

    for (a, b) in parallel.areas().iter().zip(sequential.areas()) {
        assert_relative_eq!(a.unwrap(), b.unwrap(), epsilon = 1e-12);
    }
    assert!(parallel.failed_rows().is_empty());
}

#[test]
fn test_narrow_region_is_rejected() {
    let csv = common::dataset_csv(&[("1", 100.0)], 1, 9);
    let dataset = SpectralDataset::from_reader(csv.as_bytes()).unwrap();
    let bounds = RegionBounds {
        vinyl_left: 200,
        vinyl_right: 208,
        pxylene_left: common::PXYLENE_LEFT,
        pxylene_right: common::PXYLENE_RIGHT,
    };
    let table = slice_region(&dataset, &bounds, Region::Vinyl).unwrap();
    assert!(matches!(
        fit_batch(&PeakFitter::new(), &table, Region::Vinyl, &vinyl_template(), false),
        Err(RamanError::InsufficientSamples { required: 10, found: 8 })
    ));
}
