//! Death record repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Window filters are inclusive on both ends (`BETWEEN`).
//! - Dates are stored as ISO `YYYY-MM-DD` text so range filters compare
//!   lexicographically.

use super::{count_from_db, within_transaction, RepoError, RepoResult};
use crate::model::death::{DeathRecord, Sex};
use crate::model::window::DateWindow;
use chrono::NaiveDate;
use log::info;
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;

/// Storage contract for death records.
pub trait DeathRepository {
    /// Truncates the table and loads `records`; returns inserted row count.
    fn replace_all(&self, records: &[DeathRecord]) -> RepoResult<usize>;
    fn count(&self) -> RepoResult<u64>;
    /// Stored records in insertion order.
    fn list(&self) -> RepoResult<Vec<DeathRecord>>;
    /// Deaths inside `window`, grouped by age at death.
    fn count_by_age(&self, window: &DateWindow) -> RepoResult<BTreeMap<i32, u64>>;
    /// Deaths inside `window`, grouped by death date. Dates without deaths are absent.
    fn count_by_date(&self, window: &DateWindow) -> RepoResult<BTreeMap<NaiveDate, u64>>;
}

/// SQLite-backed death repository.
pub struct SqliteDeathRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDeathRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl DeathRepository for SqliteDeathRepository<'_> {
    fn replace_all(&self, records: &[DeathRecord]) -> RepoResult<usize> {
        within_transaction(self.conn, |conn| {
            conn.execute("DELETE FROM deaths;", [])?;
            let mut insert = conn.prepare(
                "INSERT INTO deaths (sex, birth_date, death_date, age)
                 VALUES (?1, ?2, ?3, ?4);",
            )?;
            for record in records {
                insert.execute(params![
                    record.sex.as_code(),
                    record.birth_date,
                    record.death_date,
                    record.age_at_death,
                ])?;
            }
            Ok(())
        })?;

        info!(
            "event=store_deaths module=repo status=ok rows={}",
            records.len()
        );
        Ok(records.len())
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM deaths;", [], |row| row.get(0))?;
        count_from_db(count, "deaths")
    }

    fn list(&self) -> RepoResult<Vec<DeathRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT sex, birth_date, death_date, age
             FROM deaths
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_death_row(row)?);
        }
        Ok(records)
    }

    fn count_by_age(&self, window: &DateWindow) -> RepoResult<BTreeMap<i32, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT age, COUNT(*)
             FROM deaths
             WHERE death_date BETWEEN ?1 AND ?2
             GROUP BY age;",
        )?;
        let mut rows = stmt.query(params![window.start, window.end])?;
        let mut counts = BTreeMap::new();
        while let Some(row) = rows.next()? {
            counts.insert(row.get::<_, i32>(0)?, count_from_db(row.get(1)?, "deaths")?);
        }
        Ok(counts)
    }

    fn count_by_date(&self, window: &DateWindow) -> RepoResult<BTreeMap<NaiveDate, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT death_date, COUNT(*)
             FROM deaths
             WHERE death_date BETWEEN ?1 AND ?2
             GROUP BY death_date;",
        )?;
        let mut rows = stmt.query(params![window.start, window.end])?;
        let mut counts = BTreeMap::new();
        while let Some(row) = rows.next()? {
            counts.insert(
                row.get::<_, NaiveDate>(0)?,
                count_from_db(row.get(1)?, "deaths")?,
            );
        }
        Ok(counts)
    }
}

fn parse_death_row(row: &Row<'_>) -> RepoResult<DeathRecord> {
    let sex_code: String = row.get("sex")?;
    let sex = Sex::from_code(&sex_code).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid sex `{sex_code}` in deaths.sex"))
    })?;
    Ok(DeathRecord {
        sex,
        birth_date: row.get("birth_date")?,
        death_date: row.get("death_date")?,
        age_at_death: row.get("age")?,
    })
}
