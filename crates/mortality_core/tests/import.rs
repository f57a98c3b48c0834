use mortality_core::db::open_db_in_memory;
use mortality_core::{
    import_sources, DeathRecord, DeathRepository, ImportError, PopulationBin,
    PopulationRepository, PyramidLayout, RepoError, RepoResult, SourceDescriptor, SourceKind,
    Sex, SqliteDeathRepository, SqlitePopulationRepository,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

fn registry_line(sex: &str, birth: &str, death: &str) -> String {
    format!(
        "{:<80}{}{}{:<65}{}{:<9}",
        "DURAND*PIERRE/", sex, birth, "13055MARSEILLE", death, "13055"
    )
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn deaths_source(file_name: &str) -> SourceDescriptor {
    SourceDescriptor {
        origin: format!("https://example.invalid/{file_name}"),
        file_name: file_name.to_string(),
        kind: SourceKind::Deaths,
    }
}

fn write_deaths(dir: &Path, file_name: &str, lines: &[String]) {
    fs::write(dir.join(file_name), lines.join("\n")).unwrap();
}

#[test]
fn reimport_of_unchanged_files_yields_identical_tables() {
    let dir = tempfile::tempdir().unwrap();
    write_deaths(
        dir.path(),
        "deces-2017.txt",
        &[
            registry_line("1", "19400101", "20170115"),
            registry_line("3", "19400101", "20170115"),
        ],
    );
    write_deaths(
        dir.path(),
        "deces-2020.txt",
        &[
            registry_line("2", "19350000", "20200401"),
            registry_line("1", "19500710", "20200402"),
        ],
    );
    let sources = [deaths_source("deces-2017.txt"), deaths_source("deces-2020.txt")];

    let conn = open_db_in_memory().unwrap();
    let deaths = SqliteDeathRepository::new(&conn);
    let population = SqlitePopulationRepository::new(&conn);

    let first = import_sources(&conn, &deaths, &population, &sources, dir.path()).unwrap();
    let stored = deaths.list().unwrap();
    let second = import_sources(&conn, &deaths, &population, &sources, dir.path()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.stored_deaths, 3);
    assert_eq!(first.stored_bins, 0);
    assert_eq!(first.death_files.len(), 2);
    assert_eq!(first.death_files[0].error_count(), 1);
    assert!(first.death_files.iter().all(|file| file.records.is_empty()));
    assert_eq!(deaths.list().unwrap(), stored);
    assert_eq!(DeathRepository::count(&deaths).unwrap(), 3);
}

#[test]
fn missing_pyramid_aborts_before_touching_storage() {
    let dir = tempfile::tempdir().unwrap();
    write_deaths(
        dir.path(),
        "deces-2020.txt",
        &[registry_line("2", "19350312", "20200401")],
    );

    let conn = open_db_in_memory().unwrap();
    let deaths = SqliteDeathRepository::new(&conn);
    let population = SqlitePopulationRepository::new(&conn);
    population
        .replace_all(&[PopulationBin {
            year: 2017,
            age: 40,
            count: 12,
        }])
        .unwrap();

    let sources = [
        deaths_source("deces-2020.txt"),
        SourceDescriptor {
            origin: "https://example.invalid/pyramide-2020.xlsx".to_string(),
            file_name: "pyramide-2020.xlsx".to_string(),
            kind: SourceKind::Pyramid {
                year: 2020,
                layout: PyramidLayout::INSEE,
            },
        },
    ];

    let err = import_sources(&conn, &deaths, &population, &sources, dir.path()).unwrap_err();

    assert!(matches!(err, ImportError::Workbook(_)));
    assert_eq!(DeathRepository::count(&deaths).unwrap(), 0);
    assert_eq!(population.list().unwrap().len(), 1);
}

#[test]
fn missing_death_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db_in_memory().unwrap();
    let deaths = SqliteDeathRepository::new(&conn);
    let population = SqlitePopulationRepository::new(&conn);

    let err = import_sources(
        &conn,
        &deaths,
        &population,
        &[deaths_source("deces-2017.txt")],
        dir.path(),
    )
    .unwrap_err();

    assert!(matches!(err, ImportError::Io { .. }));
    assert!(err.to_string().contains("deces-2017.txt"));
}

/// Population store whose reload always fails.
struct BrokenPopulation;

impl PopulationRepository for BrokenPopulation {
    fn replace_all(&self, _bins: &[PopulationBin]) -> RepoResult<usize> {
        Err(RepoError::InvalidData("disk full".to_string()))
    }

    fn count(&self) -> RepoResult<u64> {
        Ok(0)
    }

    fn list(&self) -> RepoResult<Vec<PopulationBin>> {
        Ok(Vec::new())
    }

    fn sum_by_age(&self, _year: i32) -> RepoResult<BTreeMap<i32, u64>> {
        Ok(BTreeMap::new())
    }
}

#[test]
fn failed_population_reload_rolls_back_deaths() {
    let dir = tempfile::tempdir().unwrap();
    write_deaths(
        dir.path(),
        "deces-2020.txt",
        &[registry_line("2", "19350312", "20200401")],
    );

    let conn = open_db_in_memory().unwrap();
    let deaths = SqliteDeathRepository::new(&conn);
    deaths
        .replace_all(&[DeathRecord::new(
            Sex::Male,
            day(1940, 1, 1),
            day(2017, 1, 15),
        )])
        .unwrap();

    let err = import_sources(
        &conn,
        &deaths,
        &BrokenPopulation,
        &[deaths_source("deces-2020.txt")],
        dir.path(),
    )
    .unwrap_err();

    assert!(matches!(err, ImportError::Repo(RepoError::InvalidData(_))));
    let kept = deaths.list().unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].death_date, day(2017, 1, 15));
    assert!(conn.is_autocommit());
}
