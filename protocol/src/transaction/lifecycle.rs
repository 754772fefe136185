//! The transaction state machine.
//!
//! Every lifecycle operation is a pure function: it takes the current
//! [`Transaction`] by reference and, when the transition is legal, returns
//! a **new** record with `version + 1` and a fresh `updated_at`. The input
//! is never mutated — callers propagate the returned value into the
//! ledger via [`crate::ledger::LedgerState::apply_state_change`], which
//! needs both the old and new records to compute the balance delta.
//!
//! Business-rule violations (wrong actor, illegal transition, expiry,
//! handshake failures) are ordinary `Err` values. Nothing here panics.

use thiserror::Error;

use super::builder::Transaction;
use super::types::TransactionState;
use crate::config::now_millis;
use crate::crypto::handshake::{ack_id, handshake_id};
use crate::crypto::keys::Address;

/// Expected business-rule violations raised by transaction operations.
///
/// Every variant is a user-facing outcome, not a bug: callers surface the
/// message and carry on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    /// The requested transition does not exist in the state graph.
    #[error("illegal state transition from {from} to {to}")]
    IllegalTransition {
        /// State the transaction was in.
        from: TransactionState,
        /// State the caller asked for.
        to: TransactionState,
    },

    /// Only the recipient can confirm a transaction.
    #[error("only the recipient can confirm this transaction")]
    NotRecipient,

    /// Only the sender can cancel a transaction.
    #[error("only the sender can cancel this transaction")]
    NotSender,

    /// The grace window has already passed.
    #[error("transaction has expired")]
    Expired,

    /// The grace window has not passed yet.
    #[error("transaction has not expired yet")]
    NotYetExpired,

    /// A handshake transaction was confirmed without the one-time secret.
    #[error("one-time secret required for handshake confirmation")]
    MissingSecret,

    /// The supplied one-time secret does not match the handshake id.
    #[error("one-time secret does not match")]
    SecretMismatch,

    /// Transfer amount must be positive.
    #[error("amount must be positive")]
    ZeroAmount,

    /// Sender and recipient must differ.
    #[error("sender and recipient cannot be the same")]
    SelfTransfer,

    /// The requested grace period falls outside the configured bounds.
    #[error("grace period {requested_ms}ms outside [{min_ms}ms, {max_ms}ms]")]
    InvalidGracePeriod {
        /// Grace period the sender asked for, in milliseconds.
        requested_ms: u64,
        /// Configured minimum.
        min_ms: u64,
        /// Configured maximum.
        max_ms: u64,
    },

    /// The memo exceeds the protocol limit.
    #[error("memo of {len} bytes exceeds the {max}-byte limit")]
    MemoTooLong {
        /// Actual memo length.
        len: usize,
        /// Allowed maximum.
        max: usize,
    },
}

/// Produces the successor record for a legal transition.
///
/// The single choke point for the state graph: every operation below
/// funnels through here, so version bumping and `updated_at` stamping
/// cannot drift between operations.
fn transition(
    tx: &Transaction,
    to: TransactionState,
) -> Result<Transaction, TransactionError> {
    if !tx.state.can_transition_to(to) {
        return Err(TransactionError::IllegalTransition {
            from: tx.state,
            to,
        });
    }

    let mut next = tx.clone();
    next.state = to;
    next.version += 1;
    next.updated_at = now_millis();
    Ok(next)
}

/// Confirms a transaction as the recipient: `PENDING | FROZEN -> FINALIZED`.
///
/// Guard order matters and is observable: actor check first, then expiry,
/// then the handshake, then the state graph. When a handshake is present
/// the one-time secret must be supplied and match; on success the
/// acknowledgment hash is recorded on the new record.
pub fn confirm(
    tx: &Transaction,
    as_recipient: &Address,
    secret: Option<&str>,
) -> Result<Transaction, TransactionError> {
    if tx.recipient != *as_recipient {
        return Err(TransactionError::NotRecipient);
    }
    if now_millis() > tx.expires_at {
        return Err(TransactionError::Expired);
    }

    if let Some(ref handshake) = tx.handshake {
        let secret = secret.ok_or(TransactionError::MissingSecret)?;
        if handshake.handshake_id != handshake_id(secret) {
            return Err(TransactionError::SecretMismatch);
        }

        let mut next = transition(tx, TransactionState::Finalized)?;
        if let Some(ref mut hs) = next.handshake {
            hs.ack_id = Some(ack_id(secret, as_recipient));
        }
        tracing::info!(tx_id = %next.id, "handshake transaction confirmed");
        return Ok(next);
    }

    let next = transition(tx, TransactionState::Finalized)?;
    tracing::info!(tx_id = %next.id, "transaction confirmed");
    Ok(next)
}

/// Cancels a transaction as the sender: `PENDING -> CANCELLED`.
pub fn cancel(tx: &Transaction, as_sender: &Address) -> Result<Transaction, TransactionError> {
    if tx.sender != *as_sender {
        return Err(TransactionError::NotSender);
    }
    if tx.state != TransactionState::Pending {
        return Err(TransactionError::IllegalTransition {
            from: tx.state,
            to: TransactionState::Cancelled,
        });
    }

    let next = transition(tx, TransactionState::Cancelled)?;
    tracing::info!(tx_id = %next.id, "transaction cancelled by sender");
    Ok(next)
}

/// Flags a transaction for guardian review: `PENDING -> FROZEN`.
///
/// The reason is informational — it goes to the log and to whatever
/// dispute record the caller keeps, never onto the transaction itself.
pub fn freeze(tx: &Transaction, reason: &str) -> Result<Transaction, TransactionError> {
    if tx.state != TransactionState::Pending {
        return Err(TransactionError::IllegalTransition {
            from: tx.state,
            to: TransactionState::Frozen,
        });
    }

    let next = transition(tx, TransactionState::Frozen)?;
    tracing::warn!(tx_id = %next.id, reason, "transaction frozen for review");
    Ok(next)
}

/// Guardian decision: return the funds to the sender.
/// `FROZEN -> RECOVERED`.
pub fn recover(tx: &Transaction) -> Result<Transaction, TransactionError> {
    if tx.state != TransactionState::Frozen {
        return Err(TransactionError::IllegalTransition {
            from: tx.state,
            to: TransactionState::Recovered,
        });
    }

    let next = transition(tx, TransactionState::Recovered)?;
    tracing::info!(tx_id = %next.id, "frozen transaction recovered to sender");
    Ok(next)
}

/// Guardian decision: let the transfer complete.
/// `FROZEN -> FINALIZED`.
pub fn approve_frozen(tx: &Transaction) -> Result<Transaction, TransactionError> {
    if tx.state != TransactionState::Frozen {
        return Err(TransactionError::IllegalTransition {
            from: tx.state,
            to: TransactionState::Finalized,
        });
    }

    let next = transition(tx, TransactionState::Finalized)?;
    tracing::info!(tx_id = %next.id, "frozen transaction approved");
    Ok(next)
}

/// Settles a transaction whose grace window has passed.
///
/// `PENDING -> FINALIZED` when `auto_finalize`, `PENDING -> CANCELLED`
/// otherwise. The flag is a deployment policy, not a property of the
/// transaction. Fails with [`TransactionError::NotYetExpired`] while the
/// window is still open — expiry is driven by a caller-side sweep, and a
/// sweep that runs early must not settle anything.
pub fn process_expired(
    tx: &Transaction,
    auto_finalize: bool,
) -> Result<Transaction, TransactionError> {
    if tx.state != TransactionState::Pending {
        return Err(TransactionError::IllegalTransition {
            from: tx.state,
            to: if auto_finalize {
                TransactionState::Finalized
            } else {
                TransactionState::Cancelled
            },
        });
    }
    if now_millis() <= tx.expires_at {
        return Err(TransactionError::NotYetExpired);
    }

    let to = if auto_finalize {
        TransactionState::Finalized
    } else {
        TransactionState::Cancelled
    };
    let next = transition(tx, to)?;
    tracing::info!(tx_id = %next.id, outcome = %to, "expired transaction settled");
    Ok(next)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
