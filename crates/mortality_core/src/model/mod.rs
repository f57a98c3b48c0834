//! Domain model for death records, population bins and comparison windows.
//!
//! # Responsibility
//! - Define the typed rows exchanged between ingestion, storage and reports.
//! - Keep the shared age axis convention (0..=100, 100 meaning "100 and above")
//!   in one place.
//!
//! # Invariants
//! - `DeathRecord::age_at_death` is always derived from its two dates.
//! - `PopulationBin::age` never exceeds `AGE_CAP`.

pub mod death;
pub mod population;
pub mod window;

/// Upper bound of the shared age axis; the last bucket is open-ended.
pub const AGE_CAP: i32 = 100;
