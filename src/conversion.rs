//! Conversion over time with propagated uncertainty.
//!
//! Conversion at time t is `100 · (1 − ratio(t) / ratio(reference))`. The
//! reference is the t0 measurement, except for the latest time point, which
//! is compared against a repeat of t0 when one was measured.

use crate::dataset::ConditionLabel;
use crate::error::{RamanError, Result};
use crate::ratio::RatioTable;
use crate::uncertainty::UncertainValue;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// What a ratio table stands for in the time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePointRole {
    /// The t0 measurement
    Reference,
    /// A repeat of t0, reference for the latest time point
    #[serde(rename = "repeat")]
    RepeatReference,
    /// A measurement after `minutes` of reaction
    Sample,
}

/// Ratio statistics of one time point.
#[derive(Debug, Clone)]
pub struct TimePointRatios {
    pub minutes: u32,
    pub role: TimePointRole,
    pub table: RatioTable,
}

/// Conversion of one condition at every time point.
#[derive(Debug, Clone)]
pub struct ConversionRow {
    pub condition: ConditionLabel,
    /// One value per entry of [`ConversionTable::time_points`]
    pub values: Vec<UncertainValue>,
}

/// Conversion (percent) per condition and time point.
#[derive(Debug, Clone)]
pub struct ConversionTable {
    /// Minutes of every column; the first one is the reference
    pub time_points: Vec<u32>,
    pub rows: Vec<ConversionRow>,
}

impl ConversionTable {
    /// Nominal conversions, one row per condition.
    pub fn conversion_frame(&self) -> Vec<(ConditionLabel, Vec<f64>)> {
        self.frame(UncertainValue::nominal)
    }

    /// Propagated standard deviations, one row per condition.
    pub fn error_frame(&self) -> Vec<(ConditionLabel, Vec<f64>)> {
        self.frame(UncertainValue::std_dev)
    }

    fn frame(&self, field: fn(&UncertainValue) -> f64) -> Vec<(ConditionLabel, Vec<f64>)> {
        self.rows
            .iter()
            .map(|row| (row.condition.clone(), row.values.iter().map(field).collect()))
            .collect()
    }

    /// Write the nominal conversions (`df_conversion.csv` layout).
    pub fn write_conversion_csv<W: Write>(&self, writer: W) -> Result<()> {
        self.write_frame(writer, &self.conversion_frame())
    }

    /// Write the propagated errors (`df_error.csv` layout).
    pub fn write_error_csv<W: Write>(&self, writer: W) -> Result<()> {
        self.write_frame(writer, &self.error_frame())
    }

    /// Write `df_conversion.csv` and `df_error.csv` into `dir`.
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        self.write_conversion_csv(File::create(dir.join("df_conversion.csv"))?)?;
        self.write_error_csv(File::create(dir.join("df_error.csv"))?)?;
        info!("Wrote df_conversion.csv and df_error.csv to {}", dir.display());
        Ok(())
    }

    fn write_frame<W: Write>(&self, writer: W, frame: &[(ConditionLabel, Vec<f64>)]) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header = vec!["condition".to_string()];
        header.extend(self.time_points.iter().map(u32::to_string));
        csv_writer.write_record(&header)?;

        for (condition, values) in frame {
            let mut record = vec![condition.to_string()];
            record.extend(values.iter().map(|v| {
                if v.is_finite() {
                    v.to_string()
                } else {
                    String::new()
                }
            }));
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// Compute conversions for every condition from per-time-point ratio tables.
///
/// Exactly one table must be the reference and at most one a repeat
/// reference. Samples are ordered by minutes; the latest sample uses the
/// repeat reference if there is one.
///
/// # Errors
///
/// `MisalignedConditions` when the tables do not list the same conditions in
/// the same order. `MissingOrMalformedInput` when the reference is missing or
/// duplicated, or when two tables share a time point.
pub fn calculate_conversion(inputs: &[TimePointRatios]) -> Result<ConversionTable> {
    let of_role = |role: TimePointRole| inputs.iter().filter(move |t| t.role == role);

    let reference = match of_role(TimePointRole::Reference).collect::<Vec<_>>().as_slice() {
        [single] => *single,
        found => {
            return Err(RamanError::MissingOrMalformedInput(format!(
                "expected exactly one reference time point, found {}",
                found.len()
            )))
        }
    };
    let repeats: Vec<_> = of_role(TimePointRole::RepeatReference).collect();
    if repeats.len() > 1 {
        return Err(RamanError::MissingOrMalformedInput(format!(
            "expected at most one repeat reference, found {}",
            repeats.len()
        )));
    }
    let repeat = repeats.first().copied();

    let mut samples: Vec<_> = of_role(TimePointRole::Sample).collect();
    samples.sort_by_key(|t| t.minutes);

    let mut time_points = vec![reference.minutes];
    time_points.extend(samples.iter().map(|t| t.minutes));
    let mut seen = time_points.clone();
    seen.sort_unstable();
    seen.dedup();
    if seen.len() != time_points.len() {
        return Err(RamanError::MissingOrMalformedInput(format!(
            "time points must be distinct, got {:?}",
            time_points
        )));
    }

    let conditions = reference.table.conditions();
    for other in repeat.iter().chain(samples.iter()) {
        if other.table.conditions() != conditions {
            return Err(RamanError::MisalignedConditions(format!(
                "t = {} min lists conditions {:?}, reference lists {:?}",
                other.minutes,
                labels(&other.table),
                labels(&reference.table)
            )));
        }
    }

    let to_values = |table: &RatioTable| -> Vec<UncertainValue> {
        table
            .rows
            .iter()
            .map(|r| UncertainValue::new(r.mean, r.std))
            .collect()
    };
    let reference_values = to_values(&reference.table);
    let repeat_values = repeat.map(|r| to_values(&r.table));
    let sample_values: Vec<Vec<UncertainValue>> = samples.iter().map(|s| to_values(&s.table)).collect();

    let conversion = |ratio: &UncertainValue, against: &UncertainValue| 100.0 * (1.0 - ratio / against);

    let rows = conditions
        .into_iter()
        .enumerate()
        .map(|(i, condition)| {
            let base = &reference_values[i];
            let mut values = vec![conversion(base, base)];
            for (k, sample) in sample_values.iter().enumerate() {
                let against = match &repeat_values {
                    Some(repeat) if k + 1 == sample_values.len() => &repeat[i],
                    _ => base,
                };
                values.push(conversion(&sample[i], against));
            }
            ConversionRow {
                condition: condition.clone(),
                values,
            }
        })
        .collect();

    Ok(ConversionTable { time_points, rows })
}

fn labels(table: &RatioTable) -> Vec<String> {
    table.conditions().iter().map(|c| c.to_string()).collect()
}
