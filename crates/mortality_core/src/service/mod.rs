//! Core use-case services.
//!
//! # Responsibility
//! - Derive the comparison views from stored rows (`aggregate`).
//! - Run the clear-and-reload import of every configured source (`import`).
//!
//! # Invariants
//! - Services only reach storage through repository contracts.

pub mod aggregate;
pub mod import;
