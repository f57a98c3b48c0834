//! Source file ingestion.
//!
//! # Responsibility
//! - Turn raw death files into `DeathRecord`s plus an error accounting.
//! - Turn population-pyramid cell ranges into `PopulationBin`s.
//!
//! # Invariants
//! - Death files tolerate bad lines (counted, skipped); pyramids do not.
//! - Ingestion never touches storage; callers persist the returned rows.

pub mod pyramid;
pub mod records;
pub mod workbook;
