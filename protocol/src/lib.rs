// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # EBB Protocol — Core Library
//!
//! This is the beating heart of EBB: a reversible payment ledger for the
//! world where people fat-finger addresses, fall for phishing, and
//! occasionally need an adult in the room.
//!
//! A transfer on EBB is not instantly final. It enters a pending window
//! during which the sender can cancel, the recipient can confirm early,
//! and a guardian panel can freeze it for review and later return or
//! release the funds. When the window closes, a deployment policy decides
//! whether unconfirmed transfers complete or bounce. Every settled set of
//! transactions is committed into a hash-linked, Merkle-rooted block so
//! history can't be quietly rewritten.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of a
//! reversible ledger:
//!
//! - **crypto** — Hashing, Ed25519 keys, handshake secrets, key-at-rest
//!   encryption. Don't roll your own.
//! - **transaction** — The five-state lifecycle machine and everything
//!   that builds, validates, and disputes transactions.
//! - **ledger** — Account balances, the delta table, and the block chain.
//!   If it touches money, it lives here and it has tests. Plural.
//! - **wallet** — The thin façade binding a key identity to ledger
//!   operations.
//! - **storage** — The versioned single-document persistence layer.
//! - **contacts** — The address book, because humans don't speak hex.
//! - **config** — Protocol constants and network parameters.
//!
//! ## Design Philosophy
//!
//! 1. Correctness over performance (but we're still fast).
//! 2. Business failures are `Err` values, never panics.
//! 3. Balances are maintained incrementally and must always reconcile —
//!    replaying history to find out what you own is an admission of defeat.
//! 4. One writer per ledger. Concurrency is a wrapper, not a property
//!    smeared through the core.

pub mod config;
pub mod contacts;
pub mod crypto;
pub mod ledger;
pub mod storage;
pub mod transaction;
pub mod wallet;
