//! Parameters collection implementation
//!
//! This module provides the Parameters struct, an insertion-ordered collection
//! of [`Parameter`] objects. The order matters: it defines the layout of the
//! parameter vector handed to the solver.

use crate::error::{RamanError, Result};
use crate::parameters::parameter::{Parameter, ParameterError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// An ordered collection of named fit parameters
///
/// This struct is similar to the Parameters class in lmfit-py, without the
/// expression machinery: each peak model only needs independent, bounded
/// parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    params: Vec<Parameter>,
}

impl Parameters {
    /// Create a new empty parameters collection
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter to the collection
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter with the same name already exists
    pub fn add(&mut self, param: Parameter) -> std::result::Result<(), ParameterError> {
        if self.contains(param.name()) {
            return Err(ParameterError::DuplicateParameter {
                name: param.name().to_string(),
            });
        }

        self.params.push(param);
        Ok(())
    }

    /// Add a new unbounded parameter with the given name and value
    pub fn add_param(&mut self, name: &str, value: f64) -> std::result::Result<(), ParameterError> {
        self.add(Parameter::new(name, value))
    }

    /// Add a new parameter with the given name, value, and bounds
    ///
    /// # Examples
    ///
    /// ```
    /// use raman_conversion::parameters::Parameters;
    ///
    /// let mut params = Parameters::new();
    /// params.add_param_with_bounds("p1_amplitude", 10.0, 0.0, f64::INFINITY).unwrap();
    /// assert_eq!(params.len(), 1);
    /// assert_eq!(params.value("p1_amplitude").unwrap(), 10.0);
    /// ```
    pub fn add_param_with_bounds(
        &mut self,
        name: &str,
        value: f64,
        min: f64,
        max: f64,
    ) -> std::result::Result<(), ParameterError> {
        self.add(Parameter::with_bounds(name, value, min, max)?)
    }

    /// Get a parameter by name
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name() == name)
    }

    /// Get a mutable parameter by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.iter_mut().find(|p| p.name() == name)
    }

    /// Whether a parameter with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get the value of a parameter by name
    pub fn value(&self, name: &str) -> Result<f64> {
        self.get(name)
            .map(Parameter::value)
            .ok_or_else(|| RamanError::ParameterNotFound(name.to_string()))
    }

    /// Number of parameters in the collection
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over the parameters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Names of the parameters in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(Parameter::name).collect()
    }

    /// Current values as a solver-ordered vector
    pub fn values(&self) -> Array1<f64> {
        self.params.iter().map(Parameter::value).collect()
    }

    /// `(name, value)` pairs, in order
    pub fn named_values(&self) -> Vec<(String, f64)> {
        self.params
            .iter()
            .map(|p| (p.name().to_string(), p.value()))
            .collect()
    }

    /// Current values mapped into the solver's unconstrained space
    pub fn internal_values(&self) -> Result<Array1<f64>> {
        let values = self
            .params
            .iter()
            .map(Parameter::internal_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Array1::from_vec(values))
    }

    /// External values corresponding to an internal vector, without modifying
    /// the collection
    pub fn external_from_internal(&self, internal: &Array1<f64>) -> Result<Array1<f64>> {
        self.check_len(internal.len())?;
        Ok(self
            .params
            .iter()
            .zip(internal.iter())
            .map(|(p, &i)| p.transform().to_external(i))
            .collect())
    }

    /// Update every parameter from an internal (unconstrained) vector
    pub fn update_from_internal(&mut self, internal: &Array1<f64>) -> Result<()> {
        self.check_len(internal.len())?;
        for (param, &value) in self.params.iter_mut().zip(internal.iter()) {
            param.set_from_internal(value);
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.params.len() {
            return Err(RamanError::DimensionMismatch(format!(
                "Expected {} parameter values, got {}",
                self.params.len(),
                len
            )));
        }
        Ok(())
    }

    /// Load parameters from a parameter definition table
    ///
    /// The table has a header row followed by one row per parameter with the
    /// columns name, initial value, lower bound and upper bound. Empty bound
    /// cells (or `None`/`nan`) leave that side unbounded. Legacy names such as
    /// `p2amp` are normalised with [`canonical_name`].
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut params = Parameters::new();

        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            if record.len() < 2 {
                return Err(RamanError::MissingOrMalformedInput(format!(
                    "parameter row {} has {} columns, expected name, value, min, max",
                    row + 1,
                    record.len()
                )));
            }

            let name = canonical_name(&record[0]);
            let value = parse_required(&record[1], &name, "value")?;
            let min = parse_optional(record.get(2).unwrap_or(""), &name, "min")?;
            let max = parse_optional(record.get(3).unwrap_or(""), &name, "max")?;

            let param = Parameter::with_bounds(
                &name,
                value,
                min.unwrap_or(f64::NEG_INFINITY),
                max.unwrap_or(f64::INFINITY),
            )?;
            params.add(param)?;
        }

        if params.is_empty() {
            return Err(RamanError::MissingOrMalformedInput(
                "parameter definition table contains no parameters".to_string(),
            ));
        }

        Ok(params)
    }

    /// Load parameters from a parameter definition CSV file
    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            RamanError::MissingOrMalformedInput(format!(
                "cannot open parameter file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_csv_reader(file)
    }

    /// Parse parameters from a JSON array
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vec<Parameter> = serde_json::from_str(json)?;
        let mut params = Parameters::new();
        for mut param in raw {
            let name = canonical_name(param.name());
            param.rename(&name);
            params.add(param)?;
        }
        Ok(params)
    }

    /// Serialize parameters to a JSON array
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || cell.eq_ignore_ascii_case("none") || cell.eq_ignore_ascii_case("nan")
}

fn parse_required(cell: &str, name: &str, column: &str) -> Result<f64> {
    cell.parse::<f64>().map_err(|_| {
        RamanError::MissingOrMalformedInput(format!(
            "parameter '{}' has non-numeric {} '{}'",
            name, column, cell
        ))
    })
}

fn parse_optional(cell: &str, name: &str, column: &str) -> Result<Option<f64>> {
    if is_missing(cell) {
        return Ok(None);
    }
    parse_required(cell, name, column).map(Some)
}

/// Normalise a parameter name to the canonical `pN_field` form
///
/// Older parameter files use compact names (`p1amp`, `p2center`, `p3width_left`).
/// Canonical names pass through unchanged.
///
/// ```
/// use raman_conversion::parameters::canonical_name;
///
/// assert_eq!(canonical_name("p2amp"), "p2_amplitude");
/// assert_eq!(canonical_name("p3width_right"), "p3_half_width_right");
/// assert_eq!(canonical_name("p1_center"), "p1_center");
/// ```
pub fn canonical_name(name: &str) -> String {
    let name = name.trim();
    let Some(rest) = name.strip_prefix('p') else {
        return name.to_string();
    };

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return name.to_string();
    }
    let (index, field) = rest.split_at(digits_end);

    let canonical_field = match field {
        "amp" => "amplitude",
        "center" => "center",
        "width" => "half_width",
        "width_left" => "half_width_left",
        "width_right" => "half_width_right",
        _ => return name.to_string(),
    };

    format!("p{}_{}", index, canonical_field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_and_lookup() {
        let mut params = Parameters::new();
        params.add_param_with_bounds("p1_amplitude", 10.0, 0.0, f64::INFINITY).unwrap();
        params.add_param("p1_center", 1630.0).unwrap();
        params.add_param_with_bounds("p1_half_width", 3.0, 0.0, f64::INFINITY).unwrap();

        assert_eq!(params.names(), vec!["p1_amplitude", "p1_center", "p1_half_width"]);
        assert_eq!(params.values().to_vec(), vec![10.0, 1630.0, 3.0]);
        assert!(params.value("p9_center").is_err());
        assert!(params.add_param("p1_center", 1.0).is_err());
    }

    #[test]
    fn test_internal_round_trip() {
        let mut params = Parameters::new();
        params.add_param_with_bounds("p1_amplitude", 10.0, 0.0, f64::INFINITY).unwrap();
        params.add_param_with_bounds("p1_center", 1630.0, 1600.0, 1660.0).unwrap();

        let internal = params.internal_values().unwrap();
        let external = params.external_from_internal(&internal).unwrap();
        assert!((external[0] - 10.0).abs() < 1e-9);
        assert!((external[1] - 1630.0).abs() < 1e-9);

        assert!(params.update_from_internal(&Array1::zeros(3)).is_err());
    }

    #[test]
    fn test_from_csv() {
        let csv = "name,value,min,max\n\
                   p1amp,120,0,\n\
                   p1center,1630,1600,1660\n\
                   p1width,4,0,None\n";
        let params = Parameters::from_csv_reader(csv.as_bytes()).unwrap();

        assert_eq!(params.names(), vec!["p1_amplitude", "p1_center", "p1_half_width"]);
        let width = params.get("p1_half_width").unwrap();
        assert_eq!(width.min(), 0.0);
        assert_eq!(width.max(), f64::INFINITY);
        assert_eq!(params.get("p1_center").unwrap().max(), 1660.0);
    }

    #[test]
    fn test_from_csv_rejects_bad_rows() {
        let csv = "name,value,min,max\np1_amplitude,abc,0,\n";
        assert!(matches!(
            Parameters::from_csv_reader(csv.as_bytes()),
            Err(RamanError::MissingOrMalformedInput(_))
        ));

        let csv = "name,value,min,max\n";
        assert!(Parameters::from_csv_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut params = Parameters::new();
        params.add_param_with_bounds("p1_amplitude", 10.0, 0.0, f64::INFINITY).unwrap();
        params.add_param("p1_center", 1630.0).unwrap();

        let json = params.to_json().unwrap();
        let back = Parameters::from_json(&json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("p1amp"), "p1_amplitude");
        assert_eq!(canonical_name("p12width"), "p12_half_width");
        assert_eq!(canonical_name("pressure"), "pressure");
        assert_eq!(canonical_name("p1_half_width"), "p1_half_width");
    }
}
