//! Clear-and-reload import of every configured source.
//!
//! # Responsibility
//! - Parse all death files and pyramids before touching storage.
//! - Replace the `deaths` and `population` tables wholesale.
//!
//! # Invariants
//! - A fatal error (unreadable file, bad pyramid cell) aborts before any
//!   table is modified.
//! - Both tables are reloaded in one transaction; a storage failure rolls
//!   back both, so they always hold the same load.
//! - Re-running with unchanged files yields identical table contents.

use crate::config::{SourceDescriptor, SourceKind};
use crate::ingest::pyramid::{ingest_pyramid, PyramidError};
use crate::ingest::records::{ingest_file, RecordIngest};
use crate::ingest::workbook::{FirstSheet, WorkbookError};
use crate::model::death::DeathRecord;
use crate::model::population::PopulationBin;
use crate::repo::death_repo::DeathRepository;
use crate::repo::population_repo::PopulationRepository;
use crate::repo::RepoError;
use log::{error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug)]
pub enum ImportError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Workbook(WorkbookError),
    Pyramid {
        file_name: String,
        source: PyramidError,
    },
    Repo(RepoError),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Workbook(err) => write!(f, "{err}"),
            Self::Pyramid { file_name, source } => write!(f, "{file_name}: {source}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Workbook(err) => Some(err),
            Self::Pyramid { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<WorkbookError> for ImportError {
    fn from(value: WorkbookError) -> Self {
        Self::Workbook(value)
    }
}

impl From<RepoError> for ImportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Bins read from one pyramid workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyramidImport {
    pub file_name: String,
    pub year: i32,
    pub bins: usize,
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Per-file ingestion accounting; `records` are drained into storage.
    pub death_files: Vec<RecordIngest>,
    pub pyramids: Vec<PyramidImport>,
    pub stored_deaths: usize,
    pub stored_bins: usize,
}

/// Parses every source under `data_dir` and reloads both tables.
///
/// `deaths` and `population` must write through `conn`, which scopes the
/// reload transaction.
pub fn import_sources<D, P>(
    conn: &Connection,
    deaths: &D,
    population: &P,
    sources: &[SourceDescriptor],
    data_dir: &Path,
) -> Result<ImportSummary, ImportError>
where
    D: DeathRepository + ?Sized,
    P: PopulationRepository + ?Sized,
{
    let started_at = Instant::now();
    info!(
        "event=import module=import status=start sources={}",
        sources.len()
    );

    let parsed = parse_sources(sources, data_dir);
    let (mut summary, records, bins) = match parsed {
        Ok(parsed) => parsed,
        Err(err) => {
            error!(
                "event=import module=import status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err);
        }
    };

    if let Err(err) = store(conn, deaths, population, &records, &bins, &mut summary) {
        error!(
            "event=import module=import status=error stage=store duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        );
        return Err(err);
    }

    info!(
        "event=import module=import status=ok deaths={} bins={} duration_ms={}",
        summary.stored_deaths,
        summary.stored_bins,
        started_at.elapsed().as_millis()
    );
    Ok(summary)
}

fn store<D, P>(
    conn: &Connection,
    deaths: &D,
    population: &P,
    records: &[DeathRecord],
    bins: &[PopulationBin],
    summary: &mut ImportSummary,
) -> Result<(), ImportError>
where
    D: DeathRepository + ?Sized,
    P: PopulationRepository + ?Sized,
{
    // Dropping `tx` without commit rolls back both tables.
    let tx = conn.unchecked_transaction().map_err(RepoError::from)?;
    summary.stored_deaths = deaths.replace_all(records)?;
    summary.stored_bins = population.replace_all(bins)?;
    tx.commit().map_err(RepoError::from)?;
    Ok(())
}

fn parse_sources(
    sources: &[SourceDescriptor],
    data_dir: &Path,
) -> Result<(ImportSummary, Vec<DeathRecord>, Vec<PopulationBin>), ImportError> {
    let mut summary = ImportSummary::default();
    let mut records = Vec::new();
    let mut bins = Vec::new();

    for source in sources {
        let path = source.path_in(data_dir);
        match &source.kind {
            SourceKind::Deaths => {
                let mut ingest = ingest_file(&path).map_err(|source| ImportError::Io {
                    path: path.clone(),
                    source,
                })?;
                records.append(&mut ingest.records);
                summary.death_files.push(ingest);
            }
            SourceKind::Pyramid { year, layout } => {
                let sheet = FirstSheet::open(&path)?;
                let mut read = ingest_pyramid(&sheet, layout, *year).map_err(|err| {
                    ImportError::Pyramid {
                        file_name: source.file_name.clone(),
                        source: err,
                    }
                })?;
                info!(
                    "event=ingest_pyramid module=import status=ok file={} year={} bins={}",
                    source.file_name,
                    year,
                    read.len()
                );
                summary.pyramids.push(PyramidImport {
                    file_name: source.file_name.clone(),
                    year: *year,
                    bins: read.len(),
                });
                bins.append(&mut read);
            }
        }
    }
    Ok((summary, records, bins))
}
