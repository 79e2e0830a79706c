#![warn(missing_docs)]
//! Reader for tabulated mirror positions and coatings.
//!
//! A mirror table is a whitespace (or tab) delimited text file. The first line is a comment and is ignored. Each further
//! line describes one mirror:
//!
//! ```text
//! # index  radius  [front m-value  [back m-value]]
//! 0  0.2076  4.0  0.0
//! 1  0.2012  4.0
//! ```
//!
//! Radii are given in meters at the extraction plane of the assembly.
use std::{fs::File, io::Read, path::Path};

use csv::ReaderBuilder;
use log::warn;
use uom::si::f64::Length;

use crate::{
    assembly::ConicProfile,
    error::{NmoError, NmoResult},
    meter,
};

/// A single row of a [`MirrorTable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MirrorTableRow {
    /// mirror index as given in the file
    pub index: usize,
    /// mirror radius at the extraction plane
    pub radius: Length,
    /// optional m-value of the front (concave) face
    pub front_m: Option<f64>,
    /// optional m-value of the back face
    pub back_m: Option<f64>,
}

/// Mirror positions (and optional coatings) read from a text table.
#[derive(Debug, Clone, Default)]
pub struct MirrorTable {
    rows: Vec<MirrorTableRow>,
}
impl MirrorTable {
    /// Read a [`MirrorTable`] from the given file.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be opened.
    pub fn read_file(path: &Path) -> NmoResult<Self> {
        let file = File::open(path)
            .map_err(|e| NmoError::Io(format!("could not open mirror table {}: {e}", path.display())))?;
        Ok(Self::from_reader(file))
    }
    /// Read a mirror table if the file exists.
    ///
    /// A missing file or a file without a single valid row is not an error: a warning is logged and `None` is returned
    /// so that the caller can fall back to the analytic construction.
    ///
    /// # Errors
    ///
    /// This function will return an error if an existing file could not be read.
    pub fn read_optional(path: &Path) -> NmoResult<Option<Self>> {
        if !path.exists() {
            warn!(
                "mirror table {} not found, using analytic mirror construction",
                path.display()
            );
            return Ok(None);
        }
        let table = Self::read_file(path)?;
        if table.is_empty() {
            warn!(
                "mirror table {} does not contain any valid row, using analytic mirror construction",
                path.display()
            );
            return Ok(None);
        }
        Ok(Some(table))
    }
    /// Parse a [`MirrorTable`] from a reader.
    ///
    /// Malformed rows are skipped (with a warning). The returned table is empty if no valid row was found.
    #[must_use]
    pub fn from_reader<R: Read>(reader: R) -> Self {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b'\t')
            .flexible(true)
            .quoting(false)
            .from_reader(reader);
        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            // line 1 is the comment line
            let line_no = line + 2;
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!("mirror table line {line_no}: {e}, skipping");
                    continue;
                }
            };
            let tokens: Vec<&str> = record.iter().flat_map(str::split_whitespace).collect();
            if tokens.is_empty() {
                continue;
            }
            match parse_row(&tokens) {
                Ok(row) => rows.push(row),
                Err(e) => warn!("mirror table line {line_no}: {e}, skipping"),
            }
        }
        Self { rows }
    }
    /// Returns the rows of this [`MirrorTable`] in file order.
    #[must_use]
    pub fn rows(&self) -> &[MirrorTableRow] {
        &self.rows
    }
    /// Returns the number of mirrors of this [`MirrorTable`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    /// Returns `true` if this [`MirrorTable`] is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    /// Reconstruct the mirror profiles through the tabulated radii at the extraction plane `z_extract`.
    ///
    /// # Errors
    ///
    /// This function will return an error if a profile cannot be constructed.
    pub fn profiles(
        &self,
        z_extract: Length,
        foci: (Length, Length),
    ) -> NmoResult<Vec<ConicProfile>> {
        self.rows
            .iter()
            .map(|row| ConicProfile::through_point(z_extract, row.radius, foci.0, foci.1))
            .collect()
    }
}

fn parse_row(tokens: &[&str]) -> Result<MirrorTableRow, String> {
    if tokens.len() < 2 || tokens.len() > 4 {
        return Err(format!("expected 2 to 4 columns, found {}", tokens.len()));
    }
    let index = tokens[0]
        .parse::<usize>()
        .map_err(|e| format!("invalid mirror index '{}': {e}", tokens[0]))?;
    let radius = tokens[1]
        .parse::<f64>()
        .map_err(|e| format!("invalid radius '{}': {e}", tokens[1]))?;
    if !radius.is_finite() || radius <= 0.0 {
        return Err(format!("radius must be > 0 and finite, found {radius}"));
    }
    let parse_m = |token: Option<&&str>| -> Result<Option<f64>, String> {
        token
            .map(|t| {
                t.parse::<f64>()
                    .map_err(|e| format!("invalid m-value '{t}': {e}"))
                    .and_then(|m| {
                        if m.is_finite() {
                            Ok(m)
                        } else {
                            Err(format!("m-value must be finite, found {m}"))
                        }
                    })
            })
            .transpose()
    };
    Ok(MirrorTableRow {
        index,
        radius: meter!(radius),
        front_m: parse_m(tokens.get(2))?,
        back_m: parse_m(tokens.get(3))?,
    })
}
