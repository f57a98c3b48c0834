//! Population pyramid ingestion from a spreadsheet cell range.
//!
//! # Responsibility
//! - Read one (age, count) pair per row over a 1-based inclusive row range.
//! - Normalize textual open-ended age labels such as `100 et +`.
//!
//! # Invariants
//! - Every row in range must yield a bin; any bad cell aborts the whole sheet.
//! - Ages above `AGE_CAP` are folded into the last bucket.

use crate::model::population::PopulationBin;
use crate::parse::age::cap_age;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static NON_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new("[^0-9]").expect("valid non-digit regex"));

/// Value of one spreadsheet cell, as seen by the ingester.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

/// Read-only spreadsheet access, 0-based coordinates.
pub trait CellGrid {
    fn cell(&self, row: u32, col: u32) -> Cell;
}

/// 1-based cell range of one pyramid sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PyramidLayout {
    pub age_column: u32,
    pub count_column: u32,
    pub first_row: u32,
    /// Inclusive.
    pub last_row: u32,
}

impl PyramidLayout {
    /// Layout of the INSEE `pyramide-des-ages` workbooks.
    pub const INSEE: Self = Self {
        age_column: 2,
        count_column: 5,
        first_row: 7,
        last_row: 107,
    };

    pub fn validate(&self) -> Result<(), PyramidError> {
        if self.age_column == 0
            || self.count_column == 0
            || self.first_row == 0
            || self.first_row > self.last_row
        {
            return Err(PyramidError::InvalidLayout(*self));
        }
        Ok(())
    }
}

/// Fatal pyramid ingestion failure.
#[derive(Debug, Clone, PartialEq)]
pub enum PyramidError {
    InvalidLayout(PyramidLayout),
    MissingAgeCell { row: u32 },
    MissingCountCell { row: u32 },
    InvalidAgeCell { row: u32, value: String },
    InvalidCountCell { row: u32, value: String },
}

impl Display for PyramidError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLayout(layout) => write!(
                f,
                "invalid pyramid layout: columns {}/{} rows {}..={}",
                layout.age_column, layout.count_column, layout.first_row, layout.last_row
            ),
            Self::MissingAgeCell { row } => write!(f, "empty age cell at row {row}"),
            Self::MissingCountCell { row } => write!(f, "empty count cell at row {row}"),
            Self::InvalidAgeCell { row, value } => {
                write!(f, "invalid age `{value}` at row {row}")
            }
            Self::InvalidCountCell { row, value } => {
                write!(f, "invalid count `{value}` at row {row}")
            }
        }
    }
}

impl Error for PyramidError {}

/// Reads all rows of `layout` from `grid` as bins of `year`.
pub fn ingest_pyramid<G: CellGrid + ?Sized>(
    grid: &G,
    layout: &PyramidLayout,
    year: i32,
) -> Result<Vec<PopulationBin>, PyramidError> {
    layout.validate()?;

    let mut bins = Vec::new();
    for row in layout.first_row..=layout.last_row {
        let age = parse_age(grid.cell(row - 1, layout.age_column - 1), row)?;
        let count = parse_count(grid.cell(row - 1, layout.count_column - 1), row)?;
        bins.push(PopulationBin {
            year,
            age: cap_age(age),
            count,
        });
    }
    Ok(bins)
}

fn parse_age(cell: Cell, row: u32) -> Result<i32, PyramidError> {
    let invalid = |value: String| PyramidError::InvalidAgeCell { row, value };
    match cell {
        Cell::Empty => Err(PyramidError::MissingAgeCell { row }),
        Cell::Text(text) if text.trim().is_empty() => Err(PyramidError::MissingAgeCell { row }),
        Cell::Text(text) => {
            let digits = NON_DIGITS.replace_all(&text, "").into_owned();
            digits.parse::<i32>().map_err(|_| invalid(text))
        }
        Cell::Number(value) => whole_number(value)
            .and_then(|age| i32::try_from(age).ok())
            .filter(|age| *age >= 0)
            .ok_or_else(|| invalid(value.to_string())),
    }
}

fn parse_count(cell: Cell, row: u32) -> Result<i64, PyramidError> {
    let invalid = |value: String| PyramidError::InvalidCountCell { row, value };
    let count = match cell {
        Cell::Empty => return Err(PyramidError::MissingCountCell { row }),
        Cell::Text(text) if text.trim().is_empty() => {
            return Err(PyramidError::MissingCountCell { row })
        }
        Cell::Text(text) => text.trim().parse::<i64>().map_err(|_| invalid(text))?,
        Cell::Number(value) => whole_number(value).ok_or_else(|| invalid(value.to_string()))?,
    };
    if count < 0 {
        return Err(invalid(count.to_string()));
    }
    Ok(count)
}

// Spreadsheet numbers are floats; truncate like an integer cast of the cell.
fn whole_number(value: f64) -> Option<i64> {
    if value.is_finite() {
        Some(value.trunc() as i64)
    } else {
        None
    }
}
