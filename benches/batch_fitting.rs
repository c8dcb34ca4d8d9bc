//! Benchmarks for region fitting
//!
//! Times a single vinyl fit and the batch fitter on synthetic spectra,
//! sequential against the rayon thread pool.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use raman_conversion::baseline::correct_baseline;
use raman_conversion::batch::fit_batch;
use raman_conversion::dataset::RegionTable;
use raman_conversion::fitting::PeakFitter;
use raman_conversion::models::{lorentzian, FitParameters, PeakModel, Region};
use raman_conversion::parameters::Parameters;

fn vinyl_template() -> FitParameters {
    let mut params = Parameters::new();
    params.add_param_with_bounds("p1_amplitude", 70.0, 0.0, f64::INFINITY).unwrap();
    params.add_param_with_bounds("p1_center", 1641.0, 1636.0, 1644.0).unwrap();
    params.add_param_with_bounds("p1_half_width", 1.3, 0.1, 10.0).unwrap();
    params.add_param_with_bounds("p2_amplitude", 90.0, 0.0, f64::INFINITY).unwrap();
    params.add_param_with_bounds("p2_center", 1664.0, 1660.0, 1670.0).unwrap();
    params.add_param_with_bounds("p2_half_width", 1.5, 0.1, 10.0).unwrap();
    FitParameters::new(PeakModel::Vinyl, params).unwrap()
}

/// `rows` noisy vinyl regions on a sloped baseline.
fn vinyl_table(rows: usize) -> RegionTable {
    let x = Array1::linspace(1620.0, 1689.5, 140);
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let mut intensities = Array2::zeros((rows, x.len()));
    for (i, mut row) in intensities.rows_mut().into_iter().enumerate() {
        let amplitude = 60.0 + 40.0 * (i % 5) as f64 / 4.0;
        let clean = lorentzian(x.view(), 80.0, 1640.0, 1.0) + lorentzian(x.view(), amplitude, 1665.0, 1.2);
        for (out, (xi, yi)) in row.iter_mut().zip(x.iter().zip(clean.iter())) {
            *out = yi + 5.0 + 0.01 * (xi - 1620.0) + rng.gen_range(-0.02..0.02);
        }
    }
    RegionTable {
        wavenumbers: x,
        intensities,
    }
}

fn bench_single_fit(c: &mut Criterion) {
    let table = vinyl_table(1);
    let template = vinyl_template();
    let fitter = PeakFitter::new();
    let spectrum = table.spectrum(0);
    let corrected = correct_baseline(spectrum.x, spectrum.y).unwrap();

    c.bench_function("vinyl_region_fit", |b| {
        b.iter(|| {
            fitter
                .fit_region(Region::Vinyl, black_box(&template), spectrum.x, black_box(corrected.subtracted.view()))
                .unwrap()
        })
    });
}

fn bench_batch(c: &mut Criterion) {
    let template = vinyl_template();
    let fitter = PeakFitter::new();

    let mut group = c.benchmark_group("vinyl_batch");
    group.sample_size(10);

    for rows in [16, 64] {
        let table = vinyl_table(rows);
        group.bench_with_input(BenchmarkId::new("sequential", rows), &table, |b, table| {
            b.iter(|| fit_batch(&fitter, black_box(table), Region::Vinyl, &template, false).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("parallel", rows), &table, |b, table| {
            b.iter(|| fit_batch(&fitter, black_box(table), Region::Vinyl, &template, true).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_fit, bench_batch);
criterion_main!(benches);
