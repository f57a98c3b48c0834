//! Immutable pipeline configuration.
//!
//! # Responsibility
//! - Describe sources, comparison windows and output locations.
//! - Provide the built-in INSEE / data.gouv.fr setup as `Default`.
//!
//! # Invariants
//! - A validated config has windows of equal duration, unique non-empty
//!   file names and sane pyramid layouts.

use crate::ingest::pyramid::{PyramidError, PyramidLayout};
use crate::model::window::{ensure_same_duration, DateWindow, WindowDurationMismatch};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// A comparison window and the census year its population comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonWindow {
    pub window: DateWindow,
    pub census_year: i32,
}

/// What a downloaded source file contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceKind {
    /// Fixed-width death records.
    Deaths,
    /// Population pyramid workbook for one year.
    Pyramid { year: i32, layout: PyramidLayout },
}

/// Remote origin and local destination of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub origin: String,
    pub file_name: String,
    pub kind: SourceKind,
}

impl SourceDescriptor {
    pub fn path_in(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.file_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub database_path: PathBuf,
    pub flu: ComparisonWindow,
    pub pandemic: ComparisonWindow,
    pub sources: Vec<SourceDescriptor>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            database_path: PathBuf::from("data/data.sqlite"),
            flu: ComparisonWindow {
                window: DateWindow::new("flu 2016/2017", ymd(2017, 1, 1), ymd(2017, 2, 1)),
                census_year: 2017,
            },
            pandemic: ComparisonWindow {
                window: DateWindow::new("covid 2019/2020", ymd(2020, 3, 20), ymd(2020, 4, 20)),
                census_year: 2020,
            },
            sources: vec![
                deaths_source(
                    "https://www.data.gouv.fr/fr/datasets/r/fd61ff96-1e4e-450f-8648-3e3016edbe34",
                    "deces-2017.txt",
                ),
                deaths_source(
                    "https://www.data.gouv.fr/fr/datasets/r/a1f09595-0e79-4300-be1a-c97964e55f05",
                    "deces-2020.txt",
                ),
                pyramid_source(2017),
                pyramid_source(2020),
            ],
        }
    }
}

impl PipelineConfig {
    /// Reads a JSON config file and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for comparison in [&self.flu, &self.pandemic] {
            if comparison.window.label.trim().is_empty() {
                return Err(ConfigError::Invalid("window label cannot be empty".to_string()));
            }
            if comparison.window.end < comparison.window.start {
                return Err(ConfigError::Invalid(format!(
                    "window `{}` ends before it starts",
                    comparison.window.label
                )));
            }
        }
        ensure_same_duration(self.windows())?;

        let mut names = BTreeSet::new();
        for source in &self.sources {
            if source.file_name.trim().is_empty() {
                return Err(ConfigError::Invalid("source file name cannot be empty".to_string()));
            }
            if !names.insert(source.file_name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source file name `{}`",
                    source.file_name
                )));
            }
            if let SourceKind::Pyramid { layout, .. } = &source.kind {
                layout.validate()?;
            }
        }
        Ok(())
    }

    pub fn windows(&self) -> [&DateWindow; 2] {
        [&self.flu.window, &self.pandemic.window]
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    Windows(WindowDurationMismatch),
    Layout(PyramidError),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::Windows(err) => write!(f, "{err}"),
            Self::Layout(err) => write!(f, "{err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Windows(err) => Some(err),
            Self::Layout(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<WindowDurationMismatch> for ConfigError {
    fn from(value: WindowDurationMismatch) -> Self {
        Self::Windows(value)
    }
}

impl From<PyramidError> for ConfigError {
    fn from(value: PyramidError) -> Self {
        Self::Layout(value)
    }
}

fn deaths_source(origin: &str, file_name: &str) -> SourceDescriptor {
    SourceDescriptor {
        origin: origin.to_string(),
        file_name: file_name.to_string(),
        kind: SourceKind::Deaths,
    }
}

fn pyramid_source(year: i32) -> SourceDescriptor {
    SourceDescriptor {
        origin: format!(
            "https://www.insee.fr/fr/statistiques/fichier/1913143/pyramide-des-ages-{year}.xls"
        ),
        file_name: format!("pyramide-des-ages-{year}.xls"),
        kind: SourceKind::Pyramid {
            year,
            layout: PyramidLayout::INSEE,
        },
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid built-in window date")
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, PipelineConfig, SourceKind};
    use chrono::NaiveDate;

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.sources.len(), 4);
        assert_eq!(config.flu.window.duration(), config.pandemic.window.duration());
    }

    #[test]
    fn default_windows_use_the_documented_dates() {
        let config = PipelineConfig::default();
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(config.flu.window.start, day(2017, 1, 1));
        assert_eq!(config.flu.window.end, day(2017, 2, 1));
        assert_eq!(config.pandemic.window.start, day(2020, 3, 20));
        assert_eq!(config.pandemic.window.end, day(2020, 4, 20));
        assert_eq!((config.flu.census_year, config.pandemic.census_year), (2017, 2020));
    }

    #[test]
    fn json_roundtrip_keeps_everything() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"type\": \"pyramid\""));
        assert!(json.contains("\"2020-03-20\""));
        let parsed: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn load_reads_file_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = PipelineConfig::default();
        config.pandemic.window.end = NaiveDate::from_ymd_opt(2020, 4, 30).unwrap();
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Windows(_)));

        let err = PipelineConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn duplicate_file_names_are_rejected() {
        let mut config = PipelineConfig::default();
        let duplicate = config.sources[0].clone();
        config.sources.push(duplicate);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_based_layout_is_rejected() {
        let mut config = PipelineConfig::default();
        if let SourceKind::Pyramid { layout, .. } = &mut config.sources[2].kind {
            layout.first_row = 0;
        }
        assert!(matches!(config.validate(), Err(ConfigError::Layout(_))));
    }
}
