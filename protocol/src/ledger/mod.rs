//! # Ledger Module
//!
//! The account book and the audit trail. This module owns every balance
//! on the system and the append-only chain of blocks that makes history
//! tamper-evident.
//!
//! ## Architecture
//!
//! ```text
//! account.rs — per-address four-bucket balances
//! state.rs   — LedgerState: accounts + indexes + chain + the delta table
//! block.rs   — hash-linked, Merkle-committed blocks and their validation
//! shared.rs  — SharedLedger, the single-writer concurrency wrapper
//! ```
//!
//! Invariants this module defends:
//!
//! - every bucket of every account is non-negative, always
//! - for each PENDING transaction, exactly its amount sits in the
//!   sender's `pending_outgoing` and the recipient's `pending_incoming`
//! - total system supply only changes through [`LedgerState::mint`]
//! - blocks are immutable once appended, and each one links to its
//!   predecessor by hash

pub mod account;
pub mod block;
pub mod shared;
pub mod state;

pub use account::{Account, AccountBalance};
pub use block::{Block, BlockHeader, BlockRule};
pub use shared::SharedLedger;
pub use state::{LedgerError, LedgerState};
