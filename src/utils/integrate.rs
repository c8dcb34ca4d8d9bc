//! Numerical integration of sampled curves.

use ndarray::ArrayView1;

/// Integrate `y(x)` with the composite Simpson's rule.
///
/// Works on non-uniformly spaced samples. With an odd number of samples the
/// composite rule covers every interval; with an even number the rule covers
/// all but the last interval, which gets Cartwright's three-point correction.
/// Two samples fall back to the trapezoid rule and fewer than two integrate
/// to zero. This matches `scipy.integrate.simpson` from SciPy 1.11 on.
///
/// ```
/// use ndarray::array;
/// use raman_conversion::utils::integrate::simpson;
///
/// let x = array![0.0, 1.0, 2.0];
/// let y = x.mapv(|v: f64| v * v);
/// assert!((simpson(y.view(), x.view()) - 8.0 / 3.0).abs() < 1e-12);
/// ```
pub fn simpson(y: ArrayView1<f64>, x: ArrayView1<f64>) -> f64 {
    let n = y.len().min(x.len());
    match n {
        0 | 1 => 0.0,
        2 => 0.5 * (x[1] - x[0]) * (y[0] + y[1]),
        _ if n % 2 == 1 => basic_simpson(y, x, n - 2),
        _ => {
            let mut result = basic_simpson(y, x, n - 3);

            let h0 = x[n - 2] - x[n - 3];
            let h1 = x[n - 1] - x[n - 2];

            let alpha = (2.0 * h1 * h1 + 3.0 * h0 * h1) / (6.0 * (h1 + h0));
            let beta = (h1 * h1 + 3.0 * h0 * h1) / (6.0 * h0);
            let eta = h1.powi(3) / (6.0 * h0 * (h0 + h1));

            result += alpha * y[n - 1] + beta * y[n - 2] - eta * y[n - 3];
            result
        }
    }
}

/// Composite Simpson over the sample pairs starting at `0, 2, .., < stop`.
fn basic_simpson(y: ArrayView1<f64>, x: ArrayView1<f64>, stop: usize) -> f64 {
    (0..stop)
        .step_by(2)
        .map(|i| {
            let h0 = x[i + 1] - x[i];
            let h1 = x[i + 2] - x[i + 1];
            let hsum = h0 + h1;
            let hprod = h0 * h1;
            let h0divh1 = h0 / h1;
            hsum / 6.0
                * (y[i] * (2.0 - 1.0 / h0divh1)
                    + y[i + 1] * (hsum * hsum / hprod)
                    + y[i + 2] * (2.0 - h0divh1))
        })
        .sum()
}

/// Integrate `y(x)` with the trapezoid rule.
pub fn trapezoid(y: ArrayView1<f64>, x: ArrayView1<f64>) -> f64 {
    let n = y.len().min(x.len());
    (1..n)
        .map(|i| 0.5 * (x[i] - x[i - 1]) * (y[i] + y[i - 1]))
        .sum()
}
