//! Derived mortality views over stored records.
//!
//! # Responsibility
//! - Group deaths per age and per date inside a comparison window.
//! - Sum population per age for a census year.
//! - Combine both into mortality rates on the shared age axis.
//!
//! # Invariants
//! - Every call re-queries storage; nothing is cached.
//! - Rates are never NaN or infinite: unknown or zero population gives `0.0`.
//! - Negative ages are kept and reported as a data-quality warning.

use crate::model::window::DateWindow;
use crate::repo::death_repo::DeathRepository;
use crate::repo::population_repo::PopulationRepository;
use crate::repo::RepoResult;
use chrono::NaiveDate;
use log::warn;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Read-only aggregation service over death and population storage.
pub struct Aggregator<D: DeathRepository, P: PopulationRepository> {
    deaths: D,
    population: P,
}

impl<D: DeathRepository, P: PopulationRepository> Aggregator<D, P> {
    pub fn new(deaths: D, population: P) -> Self {
        Self { deaths, population }
    }

    /// Deaths inside `window` per age at death.
    pub fn deaths_by_age(&self, window: &DateWindow) -> RepoResult<BTreeMap<i32, u64>> {
        let counts = self.deaths.count_by_age(window)?;
        let negative: u64 = counts.range(..0).map(|(_, count)| count).sum();
        if negative > 0 {
            warn!(
                "event=data_quality module=aggregate status=warning check=negative_age window={} records={}",
                window.label, negative
            );
        }
        Ok(counts)
    }

    /// Deaths inside `window` per date, with every window date present.
    pub fn deaths_by_date(&self, window: &DateWindow) -> RepoResult<BTreeMap<NaiveDate, u64>> {
        let mut counts: BTreeMap<NaiveDate, u64> =
            window.dates().into_iter().map(|day| (day, 0)).collect();
        for (day, count) in self.deaths.count_by_date(window)? {
            *counts.entry(day).or_insert(0) += count;
        }
        Ok(counts)
    }

    /// Population of `year` per age, summing every bin of the same age.
    pub fn population_by_age(&self, year: i32) -> RepoResult<BTreeMap<i32, u64>> {
        let sums = self.population.sum_by_age(year)?;
        if sums.is_empty() {
            warn!(
                "event=data_quality module=aggregate status=warning check=missing_population year={}",
                year
            );
        }
        Ok(sums)
    }

    /// Mortality rates of `window` against the `census_year` pyramid.
    pub fn mortality_rate_for(
        &self,
        window: &DateWindow,
        census_year: i32,
    ) -> RepoResult<BTreeMap<i32, f64>> {
        let deaths = self.deaths_by_age(window)?;
        let population = self.population_by_age(census_year)?;
        Ok(mortality_rate_by_age(&deaths, &population))
    }
}

/// `deaths / population` for every age with deaths; `0.0` when population is
/// zero or unknown.
pub fn mortality_rate_by_age(
    deaths: &BTreeMap<i32, u64>,
    population: &BTreeMap<i32, u64>,
) -> BTreeMap<i32, f64> {
    deaths
        .iter()
        .map(|(age, count)| {
            let rate = match population.get(age) {
                Some(total) if *total > 0 => *count as f64 / *total as f64,
                _ => 0.0,
            };
            (*age, rate)
        })
        .collect()
}

/// Dense vector over `ages`, missing ages filled with the default value.
pub fn dense_by_age<T: Copy + Default>(
    values: &BTreeMap<i32, T>,
    ages: RangeInclusive<i32>,
) -> Vec<T> {
    ages.map(|age| values.get(&age).copied().unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{dense_by_age, mortality_rate_by_age};
    use std::collections::BTreeMap;

    #[test]
    fn rate_is_zero_without_population() {
        let deaths = BTreeMap::from([(1, 3), (50, 10), (100, 4)]);
        let population = BTreeMap::from([(1, 0), (50, 1000)]);
        let rates = mortality_rate_by_age(&deaths, &population);
        assert_eq!(rates[&1], 0.0);
        assert_eq!(rates[&50], 0.01);
        assert_eq!(rates[&100], 0.0);
        assert!(rates.values().all(|rate| rate.is_finite()));
    }

    #[test]
    fn rate_only_covers_ages_with_deaths() {
        let deaths = BTreeMap::from([(80, 2)]);
        let population = BTreeMap::from([(79, 10), (80, 8)]);
        let rates = mortality_rate_by_age(&deaths, &population);
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[&80], 0.25);
    }

    #[test]
    fn dense_fills_gaps_and_skips_out_of_range() {
        let values = BTreeMap::from([(-1, 7u64), (1, 2), (3, 5), (101, 9)]);
        assert_eq!(dense_by_age(&values, 1..=4), vec![2, 0, 5, 0]);
    }
}
