//! Region slicing.
//!
//! Region boundaries are column indices into the raw dataset table, metadata
//! columns included, and select the half-open range `[left, right)`.

use crate::dataset::{RegionTable, SpectralDataset, METADATA_COLUMNS};
use crate::error::{RamanError, Result};
use crate::models::Region;
use log::debug;
use ndarray::{s, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::ops::Range;
use std::path::Path;

/// Column ranges of the two regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub vinyl_left: usize,
    pub vinyl_right: usize,
    pub pxylene_left: usize,
    pub pxylene_right: usize,
}

impl RegionBounds {
    /// Read a headerless `key,index` table.
    ///
    /// All four keys (`vinyl_left`, `vinyl_right`, `pxylene_left`,
    /// `pxylene_right`) must be present with integer indices.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut entries = HashMap::new();
        for record in csv_reader.records() {
            let record = record?;
            if record.len() < 2 || record[0].is_empty() {
                continue;
            }
            entries.insert(record[0].to_string(), record[1].to_string());
        }

        let index = |key: &str| -> Result<usize> {
            let raw = entries.get(key).ok_or_else(|| {
                RamanError::MissingOrMalformedInput(format!("region index table has no '{}' entry", key))
            })?;
            // Index tables written by spreadsheet tools may carry a trailing ".0"
            let trimmed = raw.strip_suffix(".0").unwrap_or(raw);
            trimmed.parse::<usize>().map_err(|_| {
                RamanError::MissingOrMalformedInput(format!("'{}' has non-integer index '{}'", key, raw))
            })
        };

        Ok(Self {
            vinyl_left: index("vinyl_left")?,
            vinyl_right: index("vinyl_right")?,
            pxylene_left: index("pxylene_left")?,
            pxylene_right: index("pxylene_right")?,
        })
    }

    /// Read a region index CSV file.
    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            RamanError::MissingOrMalformedInput(format!(
                "cannot open region index table {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_reader(file)
    }

    /// Build bounds from wavenumber limits by nearest-match lookup.
    ///
    /// Each limit `(low, high)` selects the columns from the sample nearest
    /// `low` up to and including the sample nearest `high`.
    pub fn from_wavenumbers(axis: ArrayView1<f64>, vinyl: (f64, f64), pxylene: (f64, f64)) -> Result<Self> {
        let range = |(low, high): (f64, f64)| -> Result<(usize, usize)> {
            let (left, _) = find_nearest(axis, low)?;
            let (right, _) = find_nearest(axis, high)?;
            Ok((left + METADATA_COLUMNS, right + METADATA_COLUMNS + 1))
        };
        let (vinyl_left, vinyl_right) = range(vinyl)?;
        let (pxylene_left, pxylene_right) = range(pxylene)?;
        Ok(Self {
            vinyl_left,
            vinyl_right,
            pxylene_left,
            pxylene_right,
        })
    }

    /// Raw-table column range of a region.
    pub fn columns(&self, region: Region) -> Range<usize> {
        match region {
            Region::Vinyl => self.vinyl_left..self.vinyl_right,
            Region::PXylene => self.pxylene_left..self.pxylene_right,
        }
    }
}

/// Index and value of the element nearest `target` (first one on ties).
pub fn find_nearest(values: ArrayView1<f64>, target: f64) -> Result<(usize, f64)> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if (b - target).abs() <= (v - target).abs() => best,
            _ => Some((i, v)),
        })
        .ok_or_else(|| RamanError::MissingOrMalformedInput("cannot search an empty axis".to_string()))
}

/// Slice one region out of a dataset.
///
/// # Errors
///
/// `MissingOrMalformedInput` for an empty range, a range that includes the
/// metadata columns, or one past the last column.
pub fn slice_region(dataset: &SpectralDataset, bounds: &RegionBounds, region: Region) -> Result<RegionTable> {
    let columns = bounds.columns(region);
    if columns.start < METADATA_COLUMNS || columns.end > dataset.column_count() || columns.is_empty() {
        return Err(RamanError::MissingOrMalformedInput(format!(
            "{} columns {}..{} are not a range of intensity columns (2..{})",
            region,
            columns.start,
            columns.end,
            dataset.column_count()
        )));
    }

    let start = columns.start - METADATA_COLUMNS;
    let end = columns.end - METADATA_COLUMNS;
    debug!(
        "{} region: columns {}..{}, {} to {} cm-1",
        region,
        columns.start,
        columns.end,
        dataset.wavenumbers[start],
        dataset.wavenumbers[end - 1]
    );

    Ok(RegionTable {
        wavenumbers: dataset.wavenumbers.slice(s![start..end]).to_owned(),
        intensities: dataset.intensities.slice(s![.., start..end]).to_owned(),
    })
}

/// Slice both regions, vinyl first.
pub fn slice_regions(dataset: &SpectralDataset, bounds: &RegionBounds) -> Result<(RegionTable, RegionTable)> {
    Ok((
        slice_region(dataset, bounds, Region::Vinyl)?,
        slice_region(dataset, bounds, Region::PXylene)?,
    ))
}
