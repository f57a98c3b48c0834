//! Fixed-width field parsing and age derivation.
//!
//! # Responsibility
//! - Convert raw registry substrings into typed values.
//! - Derive whole-year ages on the shared capped age axis.
//!
//! # Invariants
//! - Parsers are pure; every failure maps to exactly one `ErrorKind`.

pub mod age;
pub mod field;
