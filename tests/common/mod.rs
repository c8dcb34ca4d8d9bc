//! Synthetic Raman datasets shared by the integration tests.
//!
//! The axis runs from 1540 to 1700 cm-1 in steps of 0.5. The p-xylene region
//! covers 1550 to 1619.5 and the vinyl region 1620 to 1689.5, both on top of
//! a sloped baseline.

#![allow(dead_code)]

use ndarray::Array1;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use raman_conversion::models::{lorentzian, split_lorentzian};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const AXIS_START: f64 = 1540.0;
pub const AXIS_STEP: f64 = 0.5;
pub const AXIS_LEN: usize = 321;

/// Raw-table column bounds (metadata columns included) of the two regions.
pub const PXYLENE_LEFT: usize = 22;
pub const PXYLENE_RIGHT: usize = 162;
pub const VINYL_LEFT: usize = 162;
pub const VINYL_RIGHT: usize = 302;

pub const NOISE: f64 = 0.02;

pub fn axis() -> Array1<f64> {
    Array1::from_shape_fn(AXIS_LEN, |i| AXIS_START + AXIS_STEP * i as f64)
}

/// Noise-free spectrum with the given vinyl target amplitude.
pub fn clean_spectrum(x: &Array1<f64>, vinyl_amplitude: f64) -> Array1<f64> {
    let baseline = x.mapv(|v| 5.0 + 0.01 * (v - AXIS_START));
    baseline
        + lorentzian(x.view(), 40.0, 1570.0, 1.0)
        + lorentzian(x.view(), 60.0, 1585.0, 1.0)
        + split_lorentzian(x.view(), 120.0, 1600.0, 1.0, 1.2)
        + lorentzian(x.view(), 80.0, 1640.0, 1.0)
        + lorentzian(x.view(), vinyl_amplitude, 1665.0, 1.2)
}

/// Spectrum with uniform noise of half-width [`NOISE`].
pub fn noisy_spectrum(x: &Array1<f64>, vinyl_amplitude: f64, rng: &mut ChaCha8Rng) -> Array1<f64> {
    clean_spectrum(x, vinyl_amplitude).mapv(|v| v + rng.gen_range(-NOISE..NOISE))
}

pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Dataset CSV text: `index,condition,<wavenumbers...>`, `per_condition`
/// spectra per `(condition, vinyl amplitude)` entry.
pub fn dataset_csv(conditions: &[(&str, f64)], per_condition: usize, seed: u64) -> String {
    let x = axis();
    let mut rng = rng(seed);
    let mut out = String::from(",condition");
    for v in x.iter() {
        write!(out, ",{}", v).unwrap();
    }
    out.push('\n');

    let mut index = 0;
    for (condition, amplitude) in conditions {
        for _ in 0..per_condition {
            write!(out, "{},{}", index, condition).unwrap();
            for v in noisy_spectrum(&x, *amplitude, &mut rng).iter() {
                write!(out, ",{}", v).unwrap();
            }
            out.push('\n');
            index += 1;
        }
    }
    out
}

pub fn region_indices_csv() -> String {
    format!(
        "vinyl_left,{}\nvinyl_right,{}\npxylene_left,{}\npxylene_right,{}\n",
        VINYL_LEFT, VINYL_RIGHT, PXYLENE_LEFT, PXYLENE_RIGHT
    )
}

pub const VINYL_PARAMETERS: &str = "\
name,value,min,max
p1_amplitude,70,0,
p1_center,1641,1636,1644
p1_half_width,1.3,0.1,10
p2_amplitude,90,0,
p2_center,1664,1660,1670
p2_half_width,1.5,0.1,10
";

pub const PXYLENE_PARAMETERS: &str = "\
name,value,min,max
p1_amplitude,35,0,
p1_center,1571,1566,1575
p1_half_width,1.2,0.1,10
p2_amplitude,55,0,
p2_center,1584,1580,1590
p2_half_width,1.2,0.1,10
p3_amplitude,100,0,
p3_center,1601,1596,1605
p3_half_width_left,1.3,0.1,10
p3_half_width_right,1.3,0.1,10
";

/// Write `contents` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
