//! # Transaction Module
//!
//! Construction, signing, lifecycle, and validation for reversible
//! transfers. Every value movement on the ledger is represented as a
//! [`Transaction`] walking a fixed state graph.
//!
//! ## Architecture
//!
//! ```text
//! types.rs        — TransactionState, Handshake, Amount
//! builder.rs      — fluent TransactionBuilder producing signed PENDING records
//! lifecycle.rs    — the state machine: confirm / cancel / freeze / recover /
//!                   approve_frozen / process_expired, all pure functions
//! verification.rs — accumulate-all structural checks + signature verification
//! dispute.rs      — guardian votes and quorum for frozen transactions
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Build** — [`TransactionBuilder`] validates, stamps, and signs a
//!    PENDING record (version 1).
//! 2. **Submit** — the ledger locks the funds into the pending buckets
//!    ([`crate::ledger::LedgerState::add_pending_transaction`]).
//! 3. **Transition** — a lifecycle operation returns a new record with
//!    `version + 1`; the ledger applies the matching balance delta.
//! 4. **Terminal** — FINALIZED / CANCELLED / RECOVERED records never
//!    change again.

pub mod builder;
pub mod dispute;
pub mod lifecycle;
pub mod types;
pub mod verification;

pub use builder::{Transaction, TransactionBuilder};
pub use dispute::{Dispute, GuardianDecision, GuardianVote};
pub use lifecycle::{
    approve_frozen, cancel, confirm, freeze, process_expired, recover, TransactionError,
};
pub use types::{Amount, Handshake, TransactionState};
pub use verification::{validate_structure, verify_signature, ValidationIssue};
