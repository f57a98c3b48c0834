//! Fixed-width death file ingestion.
//!
//! # Responsibility
//! - Extract sex, birth date and death date at fixed byte offsets.
//! - Accumulate parsed records and per-kind failure counts.
//!
//! # Invariants
//! - Offsets are part of the registry wire format and never shift.
//! - A failing line produces no record and never aborts the file.
//! - Birth dates default `00` month/day to `06`/`15`; death dates never default.

use crate::model::death::DeathRecord;
use crate::parse::field::{
    parse_date, parse_sex, ErrorKind, FieldError, BIRTH_DEFAULT_DAY, BIRTH_DEFAULT_MONTH,
};
use log::info;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::ops::Range;
use std::path::Path;
use std::time::Instant;

/// Byte offset of the sex digit.
pub const SEX_OFFSET: usize = 80;
/// Byte range of the birth date digits.
pub const BIRTH_DATE_COLUMNS: Range<usize> = 81..89;
/// Byte range of the death date digits.
pub const DEATH_DATE_COLUMNS: Range<usize> = 154..162;
/// Number of failing lines kept verbatim for the summary.
pub const MAX_ERROR_SAMPLES: usize = 10;

/// One failing line with its 1-based position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    pub line_number: usize,
    pub error: FieldError,
}

impl Display for LineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line_number, self.error)
    }
}

/// Outcome of ingesting one death file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordIngest {
    /// Display name of the ingested source.
    pub source: String,
    pub records: Vec<DeathRecord>,
    pub total_lines: usize,
    pub error_counts: BTreeMap<ErrorKind, usize>,
    /// First `MAX_ERROR_SAMPLES` failures in file order.
    pub samples: Vec<LineError>,
}

impl RecordIngest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Feeds one raw line into the accumulator.
    pub fn push_line(&mut self, line: &[u8]) {
        self.total_lines += 1;
        match parse_line(line) {
            Ok(record) => self.records.push(record),
            Err(error) => {
                *self.error_counts.entry(error.kind()).or_insert(0) += 1;
                if self.samples.len() < MAX_ERROR_SAMPLES {
                    self.samples.push(LineError {
                        line_number: self.total_lines,
                        error,
                    });
                }
            }
        }
    }

    pub fn error_count(&self) -> usize {
        self.error_counts.values().sum()
    }

    pub fn errors_of(&self, kind: ErrorKind) -> usize {
        self.error_counts.get(&kind).copied().unwrap_or(0)
    }

    /// Share of failing lines, in percent. `0.0` for an empty file.
    pub fn error_rate_percent(&self) -> f64 {
        if self.total_lines == 0 {
            return 0.0;
        }
        100.0 * self.error_count() as f64 / self.total_lines as f64
    }
}

impl Display for RecordIngest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Nb errors for {}: {} / {} ({:.5}%)",
            self.source,
            self.error_count(),
            self.total_lines,
            self.error_rate_percent()
        )?;
        for (kind, count) in &self.error_counts {
            writeln!(f, "  {count} errors of type {kind}")?;
        }
        for sample in &self.samples {
            writeln!(f, "  {sample}")?;
        }
        Ok(())
    }
}

/// Parses one fixed-width line into a record.
pub fn parse_line(line: &[u8]) -> Result<DeathRecord, FieldError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.len() < DEATH_DATE_COLUMNS.end {
        return Err(FieldError::LineTooShort {
            len: line.len(),
            required: DEATH_DATE_COLUMNS.end,
        });
    }

    let sex = parse_sex(&column(line, SEX_OFFSET..SEX_OFFSET + 1))?;
    let birth_date = parse_date(
        &column(line, BIRTH_DATE_COLUMNS),
        Some(BIRTH_DEFAULT_MONTH),
        Some(BIRTH_DEFAULT_DAY),
    )?;
    let death_date = parse_date(&column(line, DEATH_DATE_COLUMNS), None, None)?;
    Ok(DeathRecord::new(sex, birth_date, death_date))
}

/// Ingests an in-memory sequence of lines.
pub fn ingest_lines<I, L>(source: &str, lines: I) -> RecordIngest
where
    I: IntoIterator<Item = L>,
    L: AsRef<[u8]>,
{
    let mut ingest = RecordIngest::new(source);
    for line in lines {
        ingest.push_line(line.as_ref());
    }
    ingest
}

/// Streams lines from a reader; only I/O failures abort.
pub fn ingest_reader<R: BufRead>(source: &str, reader: R) -> io::Result<RecordIngest> {
    let started_at = Instant::now();
    let mut ingest = RecordIngest::new(source);
    for line in reader.split(b'\n') {
        ingest.push_line(&line?);
    }
    info!(
        "event=ingest_deaths module=ingest status=ok source={} total_lines={} records={} errors={} duration_ms={}",
        source,
        ingest.total_lines,
        ingest.records.len(),
        ingest.error_count(),
        started_at.elapsed().as_millis()
    );
    Ok(ingest)
}

/// Opens and ingests a death file from disk.
pub fn ingest_file(path: impl AsRef<Path>) -> io::Result<RecordIngest> {
    let path = path.as_ref();
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file = File::open(path)?;
    ingest_reader(&source, BufReader::new(file))
}

// Non-UTF-8 bytes become U+FFFD and then fail the digit checks.
fn column(line: &[u8], range: Range<usize>) -> Cow<'_, str> {
    String::from_utf8_lossy(&line[range])
}

#[cfg(test)]
mod tests {
    use super::{ingest_lines, parse_line, DEATH_DATE_COLUMNS, MAX_ERROR_SAMPLES};
    use crate::model::death::Sex;
    use crate::parse::field::ErrorKind;
    use chrono::NaiveDate;

    fn line(sex: &str, birth: &str, death: &str) -> String {
        format!("{:<80}{}{}{:<65}{}", "DOE*JANE/", sex, birth, "75056PARIS", death)
    }

    #[test]
    fn fixture_line_places_fields_at_registry_offsets() {
        let raw = line("1", "19400312", "20200401");
        assert_eq!(raw.len(), DEATH_DATE_COLUMNS.end);
        assert_eq!(&raw[80..81], "1");
        assert_eq!(&raw[154..162], "20200401");
    }

    #[test]
    fn parses_valid_line() {
        let record = parse_line(line("1", "19400312", "20200401").as_bytes()).unwrap();
        assert_eq!(record.sex, Sex::Male);
        assert_eq!(record.birth_date, NaiveDate::from_ymd_opt(1940, 3, 12).unwrap());
        assert_eq!(record.death_date, NaiveDate::from_ymd_opt(2020, 4, 1).unwrap());
        assert_eq!(record.age_at_death, 80);
    }

    #[test]
    fn birth_date_defaults_to_mid_year() {
        let record = parse_line(line("2", "19400000", "20200401").as_bytes()).unwrap();
        assert_eq!(record.birth_date, NaiveDate::from_ymd_opt(1940, 6, 15).unwrap());
    }

    #[test]
    fn death_date_never_defaults() {
        let err = parse_line(line("2", "19400312", "20200400").as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDay);
    }

    #[test]
    fn tolerates_trailing_carriage_return_and_extra_columns() {
        let mut raw = line("1", "19400312", "20200401");
        raw.push_str("99999\r");
        assert!(parse_line(raw.as_bytes()).is_ok());
    }

    #[test]
    fn short_line_is_counted() {
        let ingest = ingest_lines("short", ["too short"]);
        assert!(ingest.records.is_empty());
        assert_eq!(ingest.errors_of(ErrorKind::LineTooShort), 1);
    }

    #[test]
    fn non_utf8_bytes_in_names_are_ignored() {
        let mut raw = line("1", "19400312", "20200401").into_bytes();
        raw[3] = 0xE9;
        assert!(parse_line(&raw).is_ok());
    }

    #[test]
    fn keeps_only_first_samples() {
        let bad = line("9", "19400312", "20200401");
        let ingest = ingest_lines("bad", vec![bad; MAX_ERROR_SAMPLES + 5]);
        assert_eq!(ingest.error_count(), MAX_ERROR_SAMPLES + 5);
        assert_eq!(ingest.samples.len(), MAX_ERROR_SAMPLES);
        assert_eq!(ingest.samples[0].line_number, 1);
    }

    #[test]
    fn summary_reports_rate_with_five_decimals() {
        let lines = [
            line("1", "19400312", "20200401"),
            line("1", "19400312", "20200401"),
            line("9", "19400312", "20200401"),
        ];
        let ingest = ingest_lines("deces-2020.txt", lines);
        let summary = ingest.to_string();
        assert!(summary.starts_with("Nb errors for deces-2020.txt: 1 / 3 (33.33333%)"));
        assert!(summary.contains("1 errors of type invalid_sex_code"));
        assert!(summary.contains("line 3: bad sex value"));
    }

    #[test]
    fn empty_input_has_zero_rate() {
        let ingest = ingest_lines("empty", Vec::<&[u8]>::new());
        assert_eq!(ingest.total_lines, 0);
        assert_eq!(ingest.error_rate_percent(), 0.0);
    }
}
