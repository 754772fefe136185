//! # Storage Module
//!
//! Persistence for the whole system state: one JSON document on disk,
//! loaded at process start, mutated in memory, and written back after
//! every command. No database, no write-ahead log — the state of a
//! single-writer ledger fits in a file, and a file you can read with
//! `jq` beats a binary store you can't.
//!
//! The document is schema-versioned with an explicit migration step per
//! version bump; see [`document`].

pub mod document;

pub use document::{StateDocument, StorageError, CURRENT_SCHEMA_VERSION};
