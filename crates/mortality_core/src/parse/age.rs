//! Whole-year age derivation on the capped age axis.

use crate::model::AGE_CAP;
use chrono::NaiveDate;

/// Average year length used to turn a day span into years.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Age in whole years at `death`, capped at `AGE_CAP`.
///
/// A death date before the birth date yields a negative age; it is kept so
/// aggregation can report it as a data-quality signal.
pub fn age_at_death(birth: NaiveDate, death: NaiveDate) -> i32 {
    let days = (death - birth).num_days();
    let years = (days as f64 / DAYS_PER_YEAR).floor() as i32;
    cap_age(years)
}

/// Folds every age above `AGE_CAP` into the open-ended last bucket.
pub fn cap_age(age: i32) -> i32 {
    age.min(AGE_CAP)
}

#[cfg(test)]
mod tests {
    use super::{age_at_death, cap_age};
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn seventy_years_is_within_one_of_exact() {
        let age = age_at_death(day(1950, 1, 1), day(2020, 1, 1));
        assert!((69..=70).contains(&age), "unexpected age {age}");
    }

    #[test]
    fn ages_above_cap_are_folded() {
        assert_eq!(age_at_death(day(1900, 1, 1), day(2020, 1, 1)), 100);
        assert_eq!(cap_age(250), 100);
        assert_eq!(cap_age(100), 100);
    }

    #[test]
    fn same_day_is_zero() {
        assert_eq!(age_at_death(day(2020, 3, 20), day(2020, 3, 20)), 0);
    }

    #[test]
    fn death_before_birth_stays_negative() {
        assert!(age_at_death(day(2020, 1, 1), day(2019, 12, 1)) < 0);
    }
}
