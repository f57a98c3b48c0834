//! Spreadsheet reader backed by `calamine` (`.xls`, `.xlsx`, `.ods`).

use super::pyramid::{Cell, CellGrid};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum WorkbookError {
    Open {
        path: PathBuf,
        source: calamine::Error,
    },
    NoSheet(PathBuf),
}

impl Display for WorkbookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { path, source } => {
                write!(f, "failed to read workbook `{}`: {source}", path.display())
            }
            Self::NoSheet(path) => write!(f, "workbook `{}` has no sheet", path.display()),
        }
    }
}

impl Error for WorkbookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::NoSheet(_) => None,
        }
    }
}

/// First sheet of a workbook, loaded in memory.
pub struct FirstSheet {
    range: Range<Data>,
}

impl FirstSheet {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WorkbookError> {
        let path = path.as_ref();
        let open_error = |source| WorkbookError::Open {
            path: path.to_path_buf(),
            source,
        };
        let mut workbook = open_workbook_auto(path).map_err(open_error)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| WorkbookError::NoSheet(path.to_path_buf()))?
            .map_err(open_error)?;
        Ok(Self { range })
    }
}

impl CellGrid for FirstSheet {
    fn cell(&self, row: u32, col: u32) -> Cell {
        match self.range.get_value((row, col)) {
            None | Some(Data::Empty) => Cell::Empty,
            Some(Data::Int(value)) => Cell::Number(*value as f64),
            Some(Data::Float(value)) => Cell::Number(*value),
            Some(Data::DateTime(value)) => Cell::Number(value.as_f64()),
            Some(Data::String(value))
            | Some(Data::DateTimeIso(value))
            | Some(Data::DurationIso(value)) => Cell::Text(value.clone()),
            Some(Data::Bool(value)) => Cell::Text(value.to_string()),
            Some(Data::Error(value)) => Cell::Text(value.to_string()),
        }
    }
}
