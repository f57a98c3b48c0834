//! Sex code and `YYYYMMDD` date parsers for registry fields.
//!
//! # Invariants
//! - Year `0000` is always rejected, whatever defaults are given.
//! - Month/day `00` are only accepted when a default is provided.
//! - Calendar validation is delegated to `chrono`; impossible dates such as
//!   Feb 30 surface as `MalformedDate`.

use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::ParseIntError;

use crate::model::death::Sex;

/// Default month for birth dates recorded with month precision lost.
pub const BIRTH_DEFAULT_MONTH: &str = "06";
/// Default day for birth dates recorded with day precision lost.
pub const BIRTH_DEFAULT_DAY: &str = "15";

/// Category of a recoverable per-record failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    InvalidSexCode,
    InvalidYear,
    InvalidMonth,
    InvalidDay,
    MalformedDate,
    LineTooShort,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidSexCode => "invalid_sex_code",
            Self::InvalidYear => "invalid_year",
            Self::InvalidMonth => "invalid_month",
            Self::InvalidDay => "invalid_day",
            Self::MalformedDate => "malformed_date",
            Self::LineTooShort => "line_too_short",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying reason of a `MalformedDate` failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateComponentError {
    WrongLength(usize),
    NotNumeric {
        component: &'static str,
        value: String,
        source: Option<ParseIntError>,
    },
    NoSuchDate {
        year: i32,
        month: u32,
        day: u32,
    },
}

impl Display for DateComponentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongLength(len) => write!(f, "expected 8 digits, got {len} characters"),
            Self::NotNumeric {
                component, value, ..
            } => write!(f, "{component} `{value}` is not numeric"),
            Self::NoSuchDate { year, month, day } => {
                write!(f, "{year:04}-{month:02}-{day:02} is not a calendar date")
            }
        }
    }
}

impl Error for DateComponentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotNumeric {
                source: Some(err), ..
            } => Some(err),
            _ => None,
        }
    }
}

/// Recoverable field parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    InvalidSexCode(String),
    InvalidYear(String),
    InvalidMonth(String),
    InvalidDay(String),
    MalformedDate {
        raw: String,
        cause: DateComponentError,
    },
    LineTooShort {
        len: usize,
        required: usize,
    },
}

impl FieldError {
    /// Accumulator key for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSexCode(_) => ErrorKind::InvalidSexCode,
            Self::InvalidYear(_) => ErrorKind::InvalidYear,
            Self::InvalidMonth(_) => ErrorKind::InvalidMonth,
            Self::InvalidDay(_) => ErrorKind::InvalidDay,
            Self::MalformedDate { .. } => ErrorKind::MalformedDate,
            Self::LineTooShort { .. } => ErrorKind::LineTooShort,
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSexCode(value) => write!(f, "bad sex value: `{value}`"),
            Self::InvalidYear(raw) => write!(f, "bad year value in `{raw}`"),
            Self::InvalidMonth(raw) => write!(f, "bad month value in `{raw}`"),
            Self::InvalidDay(raw) => write!(f, "bad day value in `{raw}`"),
            Self::MalformedDate { raw, cause } => write!(f, "malformed date `{raw}`: {cause}"),
            Self::LineTooShort { len, required } => {
                write!(f, "line has {len} bytes, at least {required} required")
            }
        }
    }
}

impl Error for FieldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MalformedDate { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Parses the one-character registry sex code.
pub fn parse_sex(code: &str) -> Result<Sex, FieldError> {
    match code {
        "1" => Ok(Sex::Male),
        "2" => Ok(Sex::Female),
        other => Err(FieldError::InvalidSexCode(other.to_string())),
    }
}

/// Parses a `YYYYMMDD` field, substituting `00` month/day with the defaults.
pub fn parse_date(
    raw: &str,
    default_month: Option<&str>,
    default_day: Option<&str>,
) -> Result<NaiveDate, FieldError> {
    let malformed = |cause| FieldError::MalformedDate {
        raw: raw.to_string(),
        cause,
    };

    if raw.len() != 8 || !raw.is_char_boundary(4) || !raw.is_char_boundary(6) {
        return Err(malformed(DateComponentError::WrongLength(raw.chars().count())));
    }
    let (year, rest) = raw.split_at(4);
    let (mut month, mut day) = rest.split_at(2);

    if year == "0000" {
        return Err(FieldError::InvalidYear(raw.to_string()));
    }
    if month == "00" {
        month = default_month.ok_or_else(|| FieldError::InvalidMonth(raw.to_string()))?;
    }
    if day == "00" {
        day = default_day.ok_or_else(|| FieldError::InvalidDay(raw.to_string()))?;
    }

    let year = parse_component("year", year).map_err(malformed)?;
    let month = parse_component("month", month).map_err(malformed)?;
    let day = parse_component("day", day).map_err(malformed)?;

    let year = i32::try_from(year).map_err(|_| {
        malformed(DateComponentError::NotNumeric {
            component: "year",
            value: year.to_string(),
            source: None,
        })
    })?;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| malformed(DateComponentError::NoSuchDate { year, month, day }))
}

fn parse_component(component: &'static str, value: &str) -> Result<u32, DateComponentError> {
    // `u32::from_str` tolerates a leading `+`, registry digits never carry one.
    if !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(DateComponentError::NotNumeric {
            component,
            value: value.to_string(),
            source: value.parse::<u32>().err(),
        });
    }
    value
        .parse::<u32>()
        .map_err(|err| DateComponentError::NotNumeric {
            component,
            value: value.to_string(),
            source: Some(err),
        })
}

#[cfg(test)]
mod tests {
    use super::{parse_date, parse_sex, ErrorKind, FieldError, BIRTH_DEFAULT_DAY, BIRTH_DEFAULT_MONTH};
    use crate::model::death::Sex;
    use chrono::NaiveDate;
    use std::error::Error;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sex_codes() {
        assert_eq!(parse_sex("1").unwrap(), Sex::Male);
        assert_eq!(parse_sex("2").unwrap(), Sex::Female);
        assert_eq!(parse_sex("9").unwrap_err().kind(), ErrorKind::InvalidSexCode);
        assert_eq!(parse_sex(" ").unwrap_err().kind(), ErrorKind::InvalidSexCode);
    }

    #[test]
    fn exact_date() {
        assert_eq!(parse_date("19450601", None, None).unwrap(), day(1945, 6, 1));
    }

    #[test]
    fn zero_day_uses_default() {
        assert_eq!(
            parse_date("19450600", None, Some("15")).unwrap(),
            day(1945, 6, 15)
        );
        assert_eq!(
            parse_date("19450000", Some(BIRTH_DEFAULT_MONTH), Some(BIRTH_DEFAULT_DAY)).unwrap(),
            day(1945, 6, 15)
        );
    }

    #[test]
    fn zero_year_is_rejected_even_with_defaults() {
        let err = parse_date("00000101", Some("06"), Some("15")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidYear);
    }

    #[test]
    fn zero_month_without_default_is_rejected() {
        let err = parse_date("19450000", None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMonth);
    }

    #[test]
    fn zero_day_without_default_is_rejected() {
        let err = parse_date("19450100", None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDay);
    }

    #[test]
    fn non_numeric_component_is_malformed_with_cause() {
        let err = parse_date("2020AB01", None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDate);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("month"));
    }

    #[test]
    fn impossible_calendar_date_is_malformed() {
        let err = parse_date("20170230", None, None).unwrap_err();
        assert!(matches!(err, FieldError::MalformedDate { .. }));
        let err = parse_date("20171301", None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDate);
    }

    #[test]
    fn wrong_length_and_signs_are_malformed() {
        assert_eq!(
            parse_date("2017011", None, None).unwrap_err().kind(),
            ErrorKind::MalformedDate
        );
        assert_eq!(
            parse_date("2017+101", None, None).unwrap_err().kind(),
            ErrorKind::MalformedDate
        );
    }
}
