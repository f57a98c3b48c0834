//! `mortality` command-line entry point.
//!
//! # Responsibility
//! - Map subcommands onto `mortality_core` operations.
//! - Own process concerns: config loading, logging bootstrap, exit codes.

use clap::{Parser, Subcommand};
use log::info;
use mortality_core::db::{open_db, reset_tables};
use mortality_core::{
    default_log_level, fetch_missing, import_sources, init_logging, Aggregator, HttpDownloader,
    PipelineConfig, ReportKind, ReportPipeline, SqliteDeathRepository,
    SqlitePopulationRepository, SvgPlotter,
};
use rusqlite::Connection;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "mortality", version, about = "Flu season vs pandemic mortality reports")]
struct Cli {
    /// JSON pipeline configuration; built-in defaults when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database schema and empty both tables.
    InitDb,
    /// Download every source file not present in the data directory.
    Download,
    /// Reload death records and population pyramids into the database.
    Import,
    /// Render one report, or `all` of them.
    Report {
        #[arg(value_parser = parse_target)]
        target: ReportTarget,
    },
    /// init-db, download, import, then every report.
    All,
}

#[derive(Debug, Clone, Copy)]
enum ReportTarget {
    All,
    One(ReportKind),
}

fn parse_target(value: &str) -> Result<ReportTarget, String> {
    if value == "all" {
        return Ok(ReportTarget::All);
    }
    value.parse().map(ReportTarget::One).map_err(|err| {
        let names: Vec<&str> = ReportKind::ALL.iter().map(|kind| kind.as_str()).collect();
        format!("{err}; expected all|{}", names.join("|"))
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    init_logging(level, &absolute(&config.data_dir.join("logs"))?)?;
    info!(
        "event=cli module=cli status=start version={} command={:?}",
        mortality_core::core_version(),
        cli.command
    );

    match cli.command {
        Command::InitDb => init_db(&config),
        Command::Download => download(&config),
        Command::Import => import(&config),
        Command::Report { target } => report(&config, target),
        Command::All => {
            init_db(&config)?;
            download(&config)?;
            import(&config)?;
            report(&config, ReportTarget::All)
        }
    }
}

fn absolute(path: &Path) -> CliResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

fn connect(config: &PipelineConfig) -> CliResult<Connection> {
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(open_db(&config.database_path)?)
}

fn init_db(config: &PipelineConfig) -> CliResult<()> {
    let mut conn = connect(config)?;
    reset_tables(&mut conn)?;
    println!("initialized {}", config.database_path.display());
    Ok(())
}

fn download(config: &PipelineConfig) -> CliResult<()> {
    let downloader = HttpDownloader::new()?;
    let summary = fetch_missing(&downloader, &config.sources, &config.data_dir)?;
    for path in &summary.downloaded {
        println!("downloaded {}", path.display());
    }
    for path in &summary.skipped {
        println!("already present {}", path.display());
    }
    Ok(())
}

fn import(config: &PipelineConfig) -> CliResult<()> {
    let conn = connect(config)?;
    let deaths = SqliteDeathRepository::new(&conn);
    let population = SqlitePopulationRepository::new(&conn);
    let summary = import_sources(
        &conn,
        &deaths,
        &population,
        &config.sources,
        &config.data_dir,
    )?;

    for ingest in &summary.death_files {
        println!("{ingest}");
    }
    for pyramid in &summary.pyramids {
        println!(
            "{}: {} population bins for {}",
            pyramid.file_name, pyramid.bins, pyramid.year
        );
    }
    println!(
        "stored {} deaths and {} population bins",
        summary.stored_deaths, summary.stored_bins
    );
    Ok(())
}

fn report(config: &PipelineConfig, target: ReportTarget) -> CliResult<()> {
    let conn = connect(config)?;
    let pipeline = ReportPipeline::new(
        config.flu.clone(),
        config.pandemic.clone(),
        Aggregator::new(
            SqliteDeathRepository::new(&conn),
            SqlitePopulationRepository::new(&conn),
        ),
        SvgPlotter::new(&config.output_dir),
    );

    let written = match target {
        ReportTarget::All => pipeline.run_all()?,
        ReportTarget::One(kind) => vec![pipeline.run(kind)?],
    };
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_target, Cli, Command, ReportTarget};
    use clap::Parser;
    use mortality_core::ReportKind;

    #[test]
    fn report_target_accepts_all_and_each_kind() {
        assert!(matches!(parse_target("all"), Ok(ReportTarget::All)));
        assert!(matches!(
            parse_target("deaths-by-date"),
            Ok(ReportTarget::One(ReportKind::DeathsByDate))
        ));
        let err = parse_target("deaths").unwrap_err();
        assert!(err.contains("mortality-rate-by-age"));
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "mortality",
            "report",
            "all",
            "--config",
            "pipeline.json",
            "--log-level",
            "warn",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Report {
                target: ReportTarget::All
            }
        ));
        assert_eq!(cli.config.unwrap().to_str(), Some("pipeline.json"));
        assert_eq!(cli.log_level.as_deref(), Some("warn"));
    }
}
