//! Spectral datasets.
//!
//! A dataset table has one spectrum per row. The first column holds the
//! original row index, the second the condition label, and every further
//! column one intensity, with the wavenumber as column header.

use crate::error::{RamanError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Number of metadata columns before the intensities.
pub const METADATA_COLUMNS: usize = 2;

/// An experimental condition label.
///
/// Labels that parse as numbers sort numerically and before all other
/// labels, which sort lexicographically. `"2" < "10" < "A"`.
#[derive(Debug, Clone, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionLabel(String);

impl ConditionLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<f64> {
        self.0.parse::<f64>().ok().filter(|v| !v.is_nan())
    }
}

impl PartialEq for ConditionLabel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for ConditionLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConditionLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            // "1" and "1.0" are distinct labels even though they compare equal numerically
            (Some(a), Some(b)) => a.total_cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl fmt::Display for ConditionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConditionLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// One spectrum: intensities `y` sampled at wavenumbers `x`.
#[derive(Debug, Clone, Copy)]
pub struct Spectrum<'a> {
    pub x: ArrayView1<'a, f64>,
    pub y: ArrayView1<'a, f64>,
}

/// A table of spectra sharing one wavenumber axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralDataset {
    /// Row index from the source table
    pub original_index: Vec<String>,
    /// Condition label per row
    pub conditions: Vec<ConditionLabel>,
    /// Wavenumber axis, strictly increasing
    pub wavenumbers: Array1<f64>,
    /// Intensities, one row per spectrum
    pub intensities: Array2<f64>,
}

impl SpectralDataset {
    /// Read a dataset table.
    ///
    /// # Errors
    ///
    /// `MissingOrMalformedInput` for a non-numeric or non-increasing
    /// wavenumber header, a short row, or a non-numeric intensity.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.len() <= METADATA_COLUMNS {
            return Err(RamanError::MissingOrMalformedInput(format!(
                "dataset has {} columns, expected index, condition and at least one wavenumber",
                headers.len()
            )));
        }

        let wavenumbers = headers
            .iter()
            .skip(METADATA_COLUMNS)
            .map(|h| {
                h.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| {
                    RamanError::MissingOrMalformedInput(format!("non-numeric wavenumber header '{}'", h))
                })
            })
            .collect::<Result<Array1<f64>>>()?;

        if wavenumbers.windows(2).into_iter().any(|w| w[1] <= w[0]) {
            return Err(RamanError::MissingOrMalformedInput(
                "wavenumber headers are not strictly increasing".to_string(),
            ));
        }

        let width = headers.len();
        let mut original_index = Vec::new();
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            if record.len() != width {
                return Err(RamanError::MissingOrMalformedInput(format!(
                    "row {} has {} columns, expected {}",
                    row + 1,
                    record.len(),
                    width
                )));
            }

            original_index.push(record[0].to_string());
            conditions.push(ConditionLabel::new(&record[1]));
            for (col, cell) in record.iter().enumerate().skip(METADATA_COLUMNS) {
                let value = cell.parse::<f64>().map_err(|_| {
                    RamanError::MissingOrMalformedInput(format!(
                        "row {}, column {}: non-numeric intensity '{}'",
                        row + 1,
                        col,
                        cell
                    ))
                })?;
                values.push(value);
            }
        }

        let intensities = Array2::from_shape_vec((conditions.len(), wavenumbers.len()), values)
            .map_err(|e| RamanError::DimensionMismatch(e.to_string()))?;

        Ok(Self {
            original_index,
            conditions,
            wavenumbers,
            intensities,
        })
    }

    /// Read a dataset CSV file.
    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            RamanError::MissingOrMalformedInput(format!("cannot open dataset {}: {}", path.display(), e))
        })?;
        Self::from_reader(file)
    }

    /// Number of spectra.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of columns of the source table, metadata included.
    pub fn column_count(&self) -> usize {
        self.wavenumbers.len() + METADATA_COLUMNS
    }

    /// The spectrum in `row`.
    pub fn spectrum(&self, row: usize) -> Result<Spectrum<'_>> {
        if row >= self.len() {
            return Err(RamanError::MissingOrMalformedInput(format!(
                "row {} out of range, dataset has {} spectra",
                row,
                self.len()
            )));
        }
        Ok(Spectrum {
            x: self.wavenumbers.view(),
            y: self.intensities.row(row),
        })
    }

    /// Distinct condition labels, ascending.
    pub fn distinct_conditions(&self) -> Vec<ConditionLabel> {
        self.conditions
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// The columns of a dataset belonging to one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionTable {
    pub wavenumbers: Array1<f64>,
    /// Intensities, one row per spectrum
    pub intensities: Array2<f64>,
}

impl RegionTable {
    /// Number of spectra.
    pub fn len(&self) -> usize {
        self.intensities.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of samples per spectrum.
    pub fn width(&self) -> usize {
        self.wavenumbers.len()
    }

    /// The region of the spectrum in `row`.
    pub fn spectrum(&self, row: usize) -> Spectrum<'_> {
        Spectrum {
            x: self.wavenumbers.view(),
            y: self.intensities.row(row),
        }
    }
}
