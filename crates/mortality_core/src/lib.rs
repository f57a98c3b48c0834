//! Mortality comparison pipeline: ingestion, storage and reports.
//!
//! Death records from the civil registry and census population pyramids are
//! loaded into SQLite, then compared between a flu season and a pandemic
//! window on a shared, capped age axis.

pub mod config;
pub mod db;
pub mod fetch;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod parse;
pub mod repo;
pub mod report;
pub mod service;

pub use config::{ComparisonWindow, ConfigError, PipelineConfig, SourceDescriptor, SourceKind};
pub use fetch::{fetch_missing, Downloader, FetchError, FetchSummary, HttpDownloader};
pub use ingest::pyramid::{ingest_pyramid, Cell, CellGrid, PyramidError, PyramidLayout};
pub use ingest::records::{ingest_file, ingest_lines, parse_line, RecordIngest};
pub use ingest::workbook::{FirstSheet, WorkbookError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::death::{DeathRecord, Sex};
pub use model::population::PopulationBin;
pub use model::window::{DateWindow, WindowDurationMismatch};
pub use model::AGE_CAP;
pub use parse::age::age_at_death;
pub use parse::field::{parse_date, parse_sex, ErrorKind, FieldError};
pub use repo::death_repo::{DeathRepository, SqliteDeathRepository};
pub use repo::population_repo::{PopulationRepository, SqlitePopulationRepository};
pub use repo::{RepoError, RepoResult};
pub use report::{Chart, PlotError, Plotter, ReportError, ReportKind, ReportPipeline, Series, SvgPlotter};
pub use service::aggregate::{mortality_rate_by_age, Aggregator};
pub use service::import::{import_sources, ImportError, ImportSummary};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
