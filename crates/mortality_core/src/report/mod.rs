//! Comparison report pipeline.
//!
//! # Responsibility
//! - Check that both comparison windows span the same number of days.
//! - Turn aggregator outputs into dense, equally long chart series.
//! - Hand finished charts to a `Plotter`.
//!
//! # Invariants
//! - The duration check runs before any aggregation query.
//! - Age-indexed series cover ages `1..=100`; date series cover every day of
//!   their window, so both windows yield series of the same length.

use crate::config::ComparisonWindow;
use crate::model::window::{ensure_same_duration, WindowDurationMismatch};
use crate::model::AGE_CAP;
use crate::repo::death_repo::DeathRepository;
use crate::repo::population_repo::PopulationRepository;
use crate::repo::RepoError;
use crate::service::aggregate::{dense_by_age, Aggregator};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

pub mod svg;

pub use svg::{PlotError, SvgPlotter};

/// Age axis of every age-indexed chart.
pub const REPORT_AGES: RangeInclusive<i32> = 1..=AGE_CAP;

/// The four comparison charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    MortalityRateByAge,
    DeathsByDate,
    DeathsByAge,
    PopulationByAge,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        Self::MortalityRateByAge,
        Self::DeathsByDate,
        Self::DeathsByAge,
        Self::PopulationByAge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MortalityRateByAge => "mortality-rate-by-age",
            Self::DeathsByDate => "deaths-by-date",
            Self::DeathsByAge => "deaths-by-age",
            Self::PopulationByAge => "population-by-age",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::MortalityRateByAge => "Mortality rate by age",
            Self::DeathsByDate => "Deaths by date",
            Self::DeathsByAge => "Deaths by age",
            Self::PopulationByAge => "Population by age",
        }
    }
}

impl Display for ReportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown report `{value}`"))
    }
}

/// One plotted line.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub values: Vec<f64>,
}

/// Ready-to-render chart: every series has one value per `x` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub kind: ReportKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<f64>,
    pub series: Vec<Series>,
}

/// Chart rendering collaborator.
pub trait Plotter {
    /// Renders `chart` and returns where it was written.
    fn plot(&self, chart: &Chart) -> Result<PathBuf, PlotError>;
}

#[derive(Debug)]
pub enum ReportError {
    WindowDurationMismatch(WindowDurationMismatch),
    Repo(RepoError),
    Plot(PlotError),
}

impl Display for ReportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WindowDurationMismatch(err) => write!(f, "window duration mismatch: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Plot(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::WindowDurationMismatch(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Plot(err) => Some(err),
        }
    }
}

impl From<WindowDurationMismatch> for ReportError {
    fn from(value: WindowDurationMismatch) -> Self {
        Self::WindowDurationMismatch(value)
    }
}

impl From<RepoError> for ReportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<PlotError> for ReportError {
    fn from(value: PlotError) -> Self {
        Self::Plot(value)
    }
}

/// Flu-season vs pandemic comparison driver.
pub struct ReportPipeline<D: DeathRepository, P: PopulationRepository, T: Plotter> {
    flu: ComparisonWindow,
    pandemic: ComparisonWindow,
    aggregator: Aggregator<D, P>,
    plotter: T,
}

impl<D, P, T> ReportPipeline<D, P, T>
where
    D: DeathRepository,
    P: PopulationRepository,
    T: Plotter,
{
    pub fn new(
        flu: ComparisonWindow,
        pandemic: ComparisonWindow,
        aggregator: Aggregator<D, P>,
        plotter: T,
    ) -> Self {
        Self {
            flu,
            pandemic,
            aggregator,
            plotter,
        }
    }

    pub fn plotter(&self) -> &T {
        &self.plotter
    }

    /// Fails with `WindowDurationMismatch` unless both windows have equal length.
    pub fn check_windows(&self) -> Result<(), ReportError> {
        ensure_same_duration([&self.flu.window, &self.pandemic.window])?;
        Ok(())
    }

    /// Computes and plots one report.
    pub fn run(&self, kind: ReportKind) -> Result<PathBuf, ReportError> {
        self.check_windows()?;
        self.render(kind)
    }

    /// Computes and plots all four reports, in `ReportKind::ALL` order.
    pub fn run_all(&self) -> Result<Vec<PathBuf>, ReportError> {
        self.check_windows()?;
        ReportKind::ALL
            .into_iter()
            .map(|kind| self.render(kind))
            .collect()
    }

    /// Builds the chart of `kind` without rendering it.
    pub fn chart(&self, kind: ReportKind) -> Result<Chart, ReportError> {
        self.check_windows()?;
        self.build(kind)
    }

    fn render(&self, kind: ReportKind) -> Result<PathBuf, ReportError> {
        let started_at = Instant::now();
        info!("event=report module=report status=start report={kind}");
        let outcome = self
            .build(kind)
            .and_then(|chart| self.plotter.plot(&chart).map_err(ReportError::from));
        match &outcome {
            Ok(path) => info!(
                "event=report module=report status=ok report={kind} path={} duration_ms={}",
                path.display(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=report module=report status=error report={kind} duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        outcome
    }

    fn build(&self, kind: ReportKind) -> Result<Chart, ReportError> {
        let comparisons = [&self.flu, &self.pandemic];
        let mut series = Vec::with_capacity(comparisons.len());
        let (x, x_label, y_label) = match kind {
            ReportKind::MortalityRateByAge => {
                for comparison in comparisons {
                    let rates = self
                        .aggregator
                        .mortality_rate_for(&comparison.window, comparison.census_year)?;
                    series.push(Series {
                        label: comparison.window.legend(),
                        values: dense_by_age(&rates, REPORT_AGES),
                    });
                }
                (age_axis(), "age", "deaths / population")
            }
            ReportKind::DeathsByDate => {
                for comparison in comparisons {
                    let counts = self.aggregator.deaths_by_date(&comparison.window)?;
                    series.push(Series {
                        label: comparison.window.legend(),
                        values: counts.into_values().map(|count| count as f64).collect(),
                    });
                }
                let days = self.flu.window.dates().len();
                (
                    (0..days).map(|day| day as f64).collect(),
                    "days since window start",
                    "deaths",
                )
            }
            ReportKind::DeathsByAge => {
                for comparison in comparisons {
                    let counts = self.aggregator.deaths_by_age(&comparison.window)?;
                    series.push(Series {
                        label: comparison.window.legend(),
                        values: to_f64(dense_by_age(&counts, REPORT_AGES)),
                    });
                }
                (age_axis(), "age", "deaths")
            }
            ReportKind::PopulationByAge => {
                for comparison in comparisons {
                    let counts = self.aggregator.population_by_age(comparison.census_year)?;
                    series.push(Series {
                        label: comparison.census_year.to_string(),
                        values: to_f64(dense_by_age(&counts, REPORT_AGES)),
                    });
                }
                (age_axis(), "age", "population")
            }
        };

        Ok(Chart {
            kind,
            title: kind.title().to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            x,
            series,
        })
    }
}

fn age_axis() -> Vec<f64> {
    REPORT_AGES.map(f64::from).collect()
}

fn to_f64(values: Vec<u64>) -> Vec<f64> {
    values.into_iter().map(|value| value as f64).collect()
}
