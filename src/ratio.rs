//! Quality-gated vinyl / p-xylene area ratios per condition.

use crate::batch::BatchResult;
use crate::dataset::{ConditionLabel, SpectralDataset};
use crate::error::{RamanError, Result};
use crate::models::Region;
use crate::utils::{mean, sample_std};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Default R² threshold both regions must exceed.
pub const DEFAULT_R2_THRESHOLD: f64 = 0.95;

/// Areas and fit quality of one spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumAreas {
    pub index: String,
    pub condition: ConditionLabel,
    pub vinyl_area: Option<f64>,
    pub vinyl_r2: Option<f64>,
    pub pxylene_area: Option<f64>,
    pub pxylene_r2: Option<f64>,
    /// vinyl area / p-xylene area
    pub ratio: Option<f64>,
    /// Whether both fits beat the R² threshold
    pub passed: bool,
}

impl SpectrumAreas {
    /// Combine the two region results of one spectrum and apply the gate.
    ///
    /// A missing fit (failed row) never passes.
    pub fn new(
        index: impl Into<String>,
        condition: ConditionLabel,
        vinyl: Option<(f64, f64)>,
        pxylene: Option<(f64, f64)>,
        threshold: f64,
    ) -> Self {
        let ratio = match (vinyl, pxylene) {
            (Some((v, _)), Some((p, _))) => Some(v / p),
            _ => None,
        };
        let passed = matches!(
            (vinyl, pxylene),
            (Some((_, v_r2)), Some((_, p_r2))) if v_r2 > threshold && p_r2 > threshold
        ) && ratio.map_or(false, f64::is_finite);

        Self {
            index: index.into(),
            condition,
            vinyl_area: vinyl.map(|(a, _)| a),
            vinyl_r2: vinyl.map(|(_, r)| r),
            pxylene_area: pxylene.map(|(a, _)| a),
            pxylene_r2: pxylene.map(|(_, r)| r),
            ratio,
            passed,
        }
    }
}

/// Ratio statistics of one condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionRatioStats {
    pub condition: ConditionLabel,
    /// NaN when no spectrum passed the gate
    pub mean: f64,
    /// Sample standard deviation; NaN below two spectra
    pub std: f64,
    /// Spectra behind the statistics; unknown for tables read from disk
    pub count: Option<usize>,
}

/// One row of a `<dataset>_ratio.csv` file.
#[derive(Debug, Serialize, Deserialize)]
struct RatioRecord {
    condition: ConditionLabel,
    mean: Option<f64>,
    std: Option<f64>,
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Per-condition ratio statistics, ascending by condition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RatioTable {
    pub rows: Vec<ConditionRatioStats>,
}

impl RatioTable {
    /// Condition labels in table order.
    pub fn conditions(&self) -> Vec<&ConditionLabel> {
        self.rows.iter().map(|r| &r.condition).collect()
    }

    /// Statistics of one condition.
    pub fn get(&self, condition: &ConditionLabel) -> Option<&ConditionRatioStats> {
        self.rows.iter().find(|r| &r.condition == condition)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write `condition,mean,std`; NaN statistics become empty cells.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(RatioRecord {
                condition: row.condition.clone(),
                mean: finite(row.mean),
                std: finite(row.std),
            })?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_csv(File::create(path)?)
    }

    /// Read a table written by [`RatioTable::write_csv`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        for required in ["condition", "mean", "std"] {
            if !headers.iter().any(|h| h == required) {
                return Err(RamanError::MissingOrMalformedInput(format!(
                    "ratio table has no '{}' column",
                    required
                )));
            }
        }

        let mut rows = Vec::new();
        for record in csv_reader.deserialize::<RatioRecord>() {
            let record = record.map_err(|e| {
                RamanError::MissingOrMalformedInput(format!("malformed ratio table row: {}", e))
            })?;
            rows.push(ConditionRatioStats {
                condition: record.condition,
                mean: record.mean.unwrap_or(f64::NAN),
                std: record.std.unwrap_or(f64::NAN),
                count: None,
            });
        }
        Ok(Self { rows })
    }

    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            RamanError::MissingOrMalformedInput(format!("cannot open ratio table {}: {}", path.display(), e))
        })?;
        Self::from_reader(file)
    }
}

/// Per-spectrum areas plus the per-condition statistics derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioReport {
    pub spectra: Vec<SpectrumAreas>,
    pub stats: RatioTable,
}

impl RatioReport {
    /// Number of spectra that passed the gate.
    pub fn passed_count(&self) -> usize {
        self.spectra.iter().filter(|s| s.passed).count()
    }

    /// Write the per-spectrum table (`<dataset>_areas.csv`).
    pub fn write_areas_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for spectrum in &self.spectra {
            csv_writer.serialize(spectrum)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_areas_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_areas_csv(File::create(path)?)
    }
}

/// Join the two region batches onto the dataset rows and summarise.
///
/// # Errors
///
/// `MisalignedConditions` when a batch does not have one row per spectrum.
/// `InvalidParameter` when the batches are not vinyl and p-xylene.
pub fn aggregate_ratio(
    dataset: &SpectralDataset,
    vinyl: &BatchResult,
    pxylene: &BatchResult,
    threshold: f64,
) -> Result<RatioReport> {
    if vinyl.region != Region::Vinyl || pxylene.region != Region::PXylene {
        return Err(RamanError::InvalidParameter(format!(
            "expected vinyl and p-xylene batches, got {} and {}",
            vinyl.region, pxylene.region
        )));
    }
    for batch in [vinyl, pxylene] {
        if batch.len() != dataset.len() {
            return Err(RamanError::MisalignedConditions(format!(
                "{} batch has {} rows, dataset has {} spectra",
                batch.region,
                batch.len(),
                dataset.len()
            )));
        }
    }

    let spectra = dataset
        .original_index
        .iter()
        .zip(&dataset.conditions)
        .zip(vinyl.rows.iter().zip(&pxylene.rows))
        .map(|((index, condition), (v, p))| {
            SpectrumAreas::new(
                index.clone(),
                condition.clone(),
                v.fit().map(|f| (f.area, f.r2)),
                p.fit().map(|f| (f.area, f.r2)),
                threshold,
            )
        })
        .collect();

    Ok(aggregate_areas(spectra))
}

/// Group gated spectra by condition and compute mean and sample std.
///
/// Every condition present in `spectra` gets a row, even when none of its
/// spectra passed.
pub fn aggregate_areas(spectra: Vec<SpectrumAreas>) -> RatioReport {
    let mut groups: BTreeMap<ConditionLabel, Vec<f64>> = BTreeMap::new();
    for spectrum in &spectra {
        let ratios = groups.entry(spectrum.condition.clone()).or_default();
        if let (true, Some(ratio)) = (spectrum.passed, spectrum.ratio) {
            ratios.push(ratio);
        }
    }

    let rows = groups
        .into_iter()
        .map(|(condition, ratios)| {
            if ratios.is_empty() {
                warn!("condition {}: no spectrum passed the quality gate", condition);
            }
            ConditionRatioStats {
                mean: mean(&ratios),
                std: sample_std(&ratios),
                count: Some(ratios.len()),
                condition,
            }
        })
        .collect::<Vec<_>>();

    let report = RatioReport {
        spectra,
        stats: RatioTable { rows },
    };
    info!(
        "{} of {} spectra passed the quality gate across {} conditions",
        report.passed_count(),
        report.spectra.len(),
        report.stats.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spectrum(condition: &str, vinyl: (f64, f64), pxylene: (f64, f64)) -> SpectrumAreas {
        SpectrumAreas::new("0", condition.into(), Some(vinyl), Some(pxylene), DEFAULT_R2_THRESHOLD)
    }

    #[test]
    fn test_quality_gate() {
        assert!(!spectrum("A", (1.0, 0.94), (1.0, 0.99)).passed);
        assert!(!spectrum("A", (1.0, 0.99), (1.0, 0.95)).passed);
        assert!(spectrum("A", (1.0, 0.951), (1.0, 1.0)).passed);
        assert!(!SpectrumAreas::new("0", "A".into(), None, Some((1.0, 1.0)), 0.95).passed);
    }

    #[test]
    fn test_grouped_statistics() {
        let report = aggregate_areas(vec![
            spectrum("B", (2.0, 1.0), (1.0, 1.0)),
            spectrum("A", (3.0, 1.0), (3.0, 1.0)),
            spectrum("B", (4.0, 1.0), (2.0, 1.0)),
            spectrum("A", (1.0, 1.0), (1.0, 1.0)),
            spectrum("B", (2.2, 1.0), (1.0, 1.0)),
            spectrum("A", (5.0, 0.5), (1.0, 1.0)),
        ]);

        let a = &report.stats.rows[0];
        assert_eq!(a.condition.as_str(), "A");
        assert_eq!(a.count, Some(2));
        assert_relative_eq!(a.mean, 1.0);
        assert_relative_eq!(a.std, 0.0);

        let b = &report.stats.rows[1];
        assert_eq!(b.condition.as_str(), "B");
        assert_relative_eq!(b.mean, 6.2 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(b.std, 0.115_470_053_837_925_2, epsilon = 1e-12);
        assert_eq!(report.passed_count(), 5);
    }

    #[test]
    fn test_condition_without_survivors() {
        let report = aggregate_areas(vec![
            spectrum("10", (1.0, 0.5), (1.0, 1.0)),
            spectrum("2", (1.0, 1.0), (1.0, 1.0)),
        ]);
        let labels: Vec<&str> = report.stats.rows.iter().map(|r| r.condition.as_str()).collect();
        assert_eq!(labels, vec!["2", "10"]);

        let empty = report.stats.get(&"10".into()).unwrap();
        assert!(empty.mean.is_nan());
        assert!(empty.std.is_nan());
        assert_eq!(empty.count, Some(0));

        // A single survivor has a mean but no sample std
        let single = report.stats.get(&"2".into()).unwrap();
        assert_relative_eq!(single.mean, 1.0);
        assert!(single.std.is_nan());
    }

    #[test]
    fn test_ratio_table_csv() {
        let table = RatioTable {
            rows: vec![
                ConditionRatioStats {
                    condition: "A".into(),
                    mean: 1.5,
                    std: 0.25,
                    count: Some(3),
                },
                ConditionRatioStats {
                    condition: "B".into(),
                    mean: f64::NAN,
                    std: f64::NAN,
                    count: Some(0),
                },
            ],
        };

        let mut buffer = Vec::new();
        table.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert_eq!(text, "condition,mean,std\nA,1.5,0.25\nB,,\n");

        let back = RatioTable::from_reader(buffer.as_slice()).unwrap();
        assert_eq!(back.len(), 2);
        assert_relative_eq!(back.rows[0].mean, 1.5);
        assert!(back.rows[1].mean.is_nan());
        assert_eq!(back.rows[0].count, None);

        assert!(RatioTable::from_reader("condition,mean\nA,1\n".as_bytes()).is_err());
    }
}
