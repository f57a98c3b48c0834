//! Population bin repository contracts and SQLite implementation.

use super::{count_from_db, within_transaction, RepoResult};
use crate::model::population::PopulationBin;
use log::info;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;

/// Storage contract for population pyramid bins.
pub trait PopulationRepository {
    /// Truncates the table and loads `bins`; returns inserted row count.
    fn replace_all(&self, bins: &[PopulationBin]) -> RepoResult<usize>;
    fn count(&self) -> RepoResult<u64>;
    /// Stored bins in insertion order.
    fn list(&self) -> RepoResult<Vec<PopulationBin>>;
    /// Population of `year` summed per age.
    fn sum_by_age(&self, year: i32) -> RepoResult<BTreeMap<i32, u64>>;
}

/// SQLite-backed population repository.
pub struct SqlitePopulationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePopulationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PopulationRepository for SqlitePopulationRepository<'_> {
    fn replace_all(&self, bins: &[PopulationBin]) -> RepoResult<usize> {
        within_transaction(self.conn, |conn| {
            conn.execute("DELETE FROM population;", [])?;
            let mut insert =
                conn.prepare("INSERT INTO population (year, age, count) VALUES (?1, ?2, ?3);")?;
            for bin in bins {
                insert.execute(params![bin.year, bin.age, bin.count])?;
            }
            Ok(())
        })?;

        info!(
            "event=store_population module=repo status=ok rows={}",
            bins.len()
        );
        Ok(bins.len())
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM population;", [], |row| row.get(0))?;
        count_from_db(count, "population")
    }

    fn list(&self) -> RepoResult<Vec<PopulationBin>> {
        let mut stmt = self.conn.prepare(
            "SELECT year, age, count
             FROM population
             ORDER BY rowid ASC;",
        )?;
        let bins = stmt
            .query_map([], |row| {
                Ok(PopulationBin {
                    year: row.get(0)?,
                    age: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bins)
    }

    fn sum_by_age(&self, year: i32) -> RepoResult<BTreeMap<i32, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT age, SUM(count)
             FROM population
             WHERE year = ?1
             GROUP BY age;",
        )?;
        let mut rows = stmt.query([year])?;
        let mut sums = BTreeMap::new();
        while let Some(row) = rows.next()? {
            sums.insert(row.get::<_, i32>(0)?, count_from_db(row.get(1)?, "population")?);
        }
        Ok(sums)
    }
}
