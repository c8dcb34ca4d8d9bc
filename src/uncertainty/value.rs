//! Numbers with first-order (linear) uncertainty propagation.
//!
//! An [`UncertainValue`] keeps its sensitivity to every independent input
//! variable, so correlations introduced by reusing a value are handled
//! exactly: `x / x` is `1 ± 0`, while the quotient of two independent values
//! gets the usual `|z|·sqrt((σx/x)² + (σy/y)²)`.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VARIABLE: AtomicU64 = AtomicU64::new(0);

/// A nominal value with linear sensitivities to independent variables.
#[derive(Debug, Clone, PartialEq)]
pub struct UncertainValue {
    nominal: f64,
    /// variable id -> ∂value/∂variable · σ(variable)
    terms: BTreeMap<u64, f64>,
}

impl UncertainValue {
    /// A new independent variable with the given mean and standard deviation.
    ///
    /// ```
    /// use raman_conversion::uncertainty::UncertainValue;
    ///
    /// let x = UncertainValue::new(2.0, 0.1);
    /// let y = UncertainValue::new(4.0, 0.2);
    /// let z = &x / &y;
    /// assert!((z.nominal() - 0.5).abs() < 1e-12);
    /// assert!((z.std_dev() - 0.5 * (2.0 * 0.05_f64.powi(2)).sqrt()).abs() < 1e-12);
    /// assert_eq!((&x / &x).std_dev(), 0.0);
    /// ```
    pub fn new(nominal: f64, std_dev: f64) -> Self {
        let mut terms = BTreeMap::new();
        if std_dev != 0.0 {
            let id = NEXT_VARIABLE.fetch_add(1, Ordering::Relaxed);
            terms.insert(id, std_dev.abs());
        }
        Self { nominal, terms }
    }

    /// A value without uncertainty.
    pub fn exact(nominal: f64) -> Self {
        Self {
            nominal,
            terms: BTreeMap::new(),
        }
    }

    pub fn nominal(&self) -> f64 {
        self.nominal
    }

    /// Propagated standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.terms.values().fold(0.0, |acc, c| acc + c * c).sqrt()
    }

    /// Linear combination `a·self + b·other + c`, nominal given separately.
    fn combine(&self, a: f64, other: &Self, b: f64, nominal: f64) -> Self {
        let mut terms = self.scaled_terms(a);
        for (&id, &c) in &other.terms {
            *terms.entry(id).or_insert(0.0) += b * c;
        }
        Self { nominal, terms }
    }

    fn scaled_terms(&self, factor: f64) -> BTreeMap<u64, f64> {
        self.terms.iter().map(|(&id, &c)| (id, factor * c)).collect()
    }

    fn scaled(&self, factor: f64, nominal: f64) -> Self {
        Self {
            nominal,
            terms: self.scaled_terms(factor),
        }
    }
}

impl fmt::Display for UncertainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(p) => write!(f, "{:.*}+/-{:.*}", p, self.nominal, p, self.std_dev()),
            None => write!(f, "{}+/-{}", self.nominal, self.std_dev()),
        }
    }
}

impl Serialize for UncertainValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("UncertainValue", 2)?;
        state.serialize_field("nominal", &self.nominal)?;
        state.serialize_field("std_dev", &self.std_dev())?;
        state.end()
    }
}

impl Add<&UncertainValue> for &UncertainValue {
    type Output = UncertainValue;

    fn add(self, rhs: &UncertainValue) -> UncertainValue {
        self.combine(1.0, rhs, 1.0, self.nominal + rhs.nominal)
    }
}

impl Sub<&UncertainValue> for &UncertainValue {
    type Output = UncertainValue;

    fn sub(self, rhs: &UncertainValue) -> UncertainValue {
        self.combine(1.0, rhs, -1.0, self.nominal - rhs.nominal)
    }
}

impl Mul<&UncertainValue> for &UncertainValue {
    type Output = UncertainValue;

    fn mul(self, rhs: &UncertainValue) -> UncertainValue {
        // d(xy) = y dx + x dy
        self.combine(rhs.nominal, rhs, self.nominal, self.nominal * rhs.nominal)
    }
}

impl Div<&UncertainValue> for &UncertainValue {
    type Output = UncertainValue;

    fn div(self, rhs: &UncertainValue) -> UncertainValue {
        // d(x/y) = dx / y - (x/y) dy / y
        let z = self.nominal / rhs.nominal;
        self.combine(1.0 / rhs.nominal, rhs, -z / rhs.nominal, z)
    }
}

impl Add<f64> for &UncertainValue {
    type Output = UncertainValue;

    fn add(self, rhs: f64) -> UncertainValue {
        self.scaled(1.0, self.nominal + rhs)
    }
}

impl Sub<f64> for &UncertainValue {
    type Output = UncertainValue;

    fn sub(self, rhs: f64) -> UncertainValue {
        self.scaled(1.0, self.nominal - rhs)
    }
}

impl Mul<f64> for &UncertainValue {
    type Output = UncertainValue;

    fn mul(self, rhs: f64) -> UncertainValue {
        self.scaled(rhs, self.nominal * rhs)
    }
}

impl Div<f64> for &UncertainValue {
    type Output = UncertainValue;

    fn div(self, rhs: f64) -> UncertainValue {
        self.scaled(1.0 / rhs, self.nominal / rhs)
    }
}

impl Sub<&UncertainValue> for f64 {
    type Output = UncertainValue;

    fn sub(self, rhs: &UncertainValue) -> UncertainValue {
        rhs.scaled(-1.0, self - rhs.nominal)
    }
}

impl Mul<&UncertainValue> for f64 {
    type Output = UncertainValue;

    fn mul(self, rhs: &UncertainValue) -> UncertainValue {
        rhs * self
    }
}

impl Neg for &UncertainValue {
    type Output = UncertainValue;

    fn neg(self) -> UncertainValue {
        self.scaled(-1.0, -self.nominal)
    }
}

// Owned forms delegate to the borrowed ones
macro_rules! forward_owned {
    ($($trait:ident $method:ident),*) => {$(
        impl $trait<UncertainValue> for UncertainValue {
            type Output = UncertainValue;
            fn $method(self, rhs: UncertainValue) -> UncertainValue {
                (&self).$method(&rhs)
            }
        }

        impl $trait<f64> for UncertainValue {
            type Output = UncertainValue;
            fn $method(self, rhs: f64) -> UncertainValue {
                (&self).$method(rhs)
            }
        }
    )*};
}

forward_owned!(Add add, Sub sub, Mul mul, Div div);

impl Sub<UncertainValue> for f64 {
    type Output = UncertainValue;

    fn sub(self, rhs: UncertainValue) -> UncertainValue {
        self - &rhs
    }
}

impl Mul<UncertainValue> for f64 {
    type Output = UncertainValue;

    fn mul(self, rhs: UncertainValue) -> UncertainValue {
        self * &rhs
    }
}

impl Neg for UncertainValue {
    type Output = UncertainValue;

    fn neg(self) -> UncertainValue {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_independent_quotient() {
        let x = UncertainValue::new(3.0, 0.3);
        let y = UncertainValue::new(1.5, 0.05);
        let z = &x / &y;

        let expected = 2.0 * ((0.3_f64 / 3.0).powi(2) + (0.05_f64 / 1.5).powi(2)).sqrt();
        assert_relative_eq!(z.nominal(), 2.0);
        assert_relative_eq!(z.std_dev(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_self_correlation_cancels() {
        let x = UncertainValue::new(2.067, 0.115);
        let conversion = 100.0 * (1.0 - &x / &x);
        assert_eq!(conversion.nominal(), 0.0);
        assert_eq!(conversion.std_dev(), 0.0);

        assert_eq!((&x - &x).std_dev(), 0.0);
        assert_relative_eq!((&x + &x).std_dev(), 0.23, epsilon = 1e-12);
    }

    #[test]
    fn test_sum_and_product() {
        let x = UncertainValue::new(2.0, 0.3);
        let y = UncertainValue::new(5.0, 0.4);

        assert_relative_eq!((&x + &y).std_dev(), 0.5, epsilon = 1e-12);
        assert_relative_eq!((&x - &y).nominal(), -3.0);

        let p = &x * &y;
        assert_relative_eq!(p.nominal(), 10.0);
        assert_relative_eq!(p.std_dev(), (1.5_f64.powi(2) + 0.8_f64.powi(2)).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_scalar_operations() {
        let x = UncertainValue::new(4.0, 0.2);
        assert_relative_eq!((&x * 100.0).std_dev(), 20.0);
        assert_relative_eq!((&x / 2.0).std_dev(), 0.1);
        assert_relative_eq!((1.0 - &x).nominal(), -3.0);
        assert_relative_eq!((-x.clone()).nominal(), -4.0);
        assert_relative_eq!((x + 1.0).std_dev(), 0.2);
    }

    #[test]
    fn test_exact_and_nan_inputs() {
        let exact = UncertainValue::exact(3.0);
        assert_eq!(exact.std_dev(), 0.0);
        assert!(exact.std_dev().is_sign_positive());
        assert!((&exact / &exact).std_dev().is_sign_positive());
        assert!(UncertainValue::new(2.0, 0.0).std_dev().is_sign_positive());

        let missing = UncertainValue::new(f64::NAN, f64::NAN);
        let ratio = &missing / &exact;
        assert!(ratio.nominal().is_nan());
        assert!(ratio.std_dev().is_nan());
    }

    #[test]
    fn test_display() {
        let x = UncertainValue::new(1.5, 0.25);
        assert_eq!(x.to_string(), "1.5+/-0.25");
        assert_eq!(format!("{:.2}", x), "1.50+/-0.25");
    }
}
