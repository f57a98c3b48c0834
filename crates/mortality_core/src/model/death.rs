//! Death record model.
//!
//! # Invariants
//! - `age_at_death = floor((death_date - birth_date).days / 365.25)`, capped
//!   at `AGE_CAP`. Death-before-birth records keep their negative age.

use crate::parse::age::age_at_death;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sex as encoded by the civil registry (`1` male, `2` female).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    /// Storage code (`M` / `F`).
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Self::Male),
            "F" => Some(Self::Female),
            _ => None,
        }
    }
}

/// One parsed entry of a mortality file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathRecord {
    pub sex: Sex,
    pub birth_date: NaiveDate,
    pub death_date: NaiveDate,
    /// Whole years, capped at 100. May be negative for inconsistent source rows.
    pub age_at_death: i32,
}

impl DeathRecord {
    /// Builds a record and derives its age from the two dates.
    pub fn new(sex: Sex, birth_date: NaiveDate, death_date: NaiveDate) -> Self {
        Self {
            sex,
            birth_date,
            death_date,
            age_at_death: age_at_death(birth_date, death_date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DeathRecord, Sex};
    use chrono::NaiveDate;

    #[test]
    fn new_derives_age_from_dates() {
        let record = DeathRecord::new(
            Sex::Female,
            NaiveDate::from_ymd_opt(1930, 6, 15).unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 25).unwrap(),
        );
        assert_eq!(record.age_at_death, 89);
    }

    #[test]
    fn sex_codes_roundtrip() {
        assert_eq!(Sex::from_code(Sex::Male.as_code()), Some(Sex::Male));
        assert_eq!(Sex::from_code(Sex::Female.as_code()), Some(Sex::Female));
        assert_eq!(Sex::from_code("X"), None);
    }
}
