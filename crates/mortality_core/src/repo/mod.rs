//! Repository layer: typed rows in, grouped counts out.
//!
//! # Responsibility
//! - Define the storage contracts used by import and aggregation.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `replace_all` truncates and reloads a table atomically: in its own
//!   transaction, or inside the caller's when one is already open.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod death_repo;
pub mod population_repo;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn count_from_db(value: i64, column: &str) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative count `{value}` in {column}")))
}

/// Runs `body` in a new transaction, or in the caller's open one.
///
/// Inside an outer transaction nothing is committed here; the caller decides.
pub(crate) fn within_transaction<T>(
    conn: &Connection,
    body: impl FnOnce(&Connection) -> RepoResult<T>,
) -> RepoResult<T> {
    if !conn.is_autocommit() {
        return body(conn);
    }
    let tx = conn.unchecked_transaction()?;
    let value = body(&*tx)?;
    tx.commit()?;
    Ok(value)
}
