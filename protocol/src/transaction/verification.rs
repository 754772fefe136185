//! Transaction verification: structural checks and signature validation.
//!
//! [`validate_structure`] is the gate for transactions arriving from
//! outside the process (deserialized state files, imports, anything not
//! built by our own [`TransactionBuilder`]). It accumulates **every**
//! violated rule instead of stopping at the first — a half-diagnosed
//! record helps nobody, least of all the person debugging it.
//!
//! Signature verification is separate because the ledger treats
//! signatures as opaque: only callers that actually hold the sender's
//! verifying key can check one.
//!
//! [`TransactionBuilder`]: super::builder::TransactionBuilder

use ed25519_dalek::VerifyingKey;
use thiserror::Error;

use super::builder::Transaction;
use crate::crypto::keys::verify_with_key;

/// A single structural rule violation.
///
/// Carries no dynamic data — each variant *is* the rule name, which is
/// what test suites and error reports match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("transaction id is required")]
    MissingId,

    #[error("amount must be positive")]
    NonPositiveAmount,

    #[error("sender and recipient cannot be the same")]
    SelfTransfer,

    #[error("signature is required")]
    MissingSignature,

    #[error("expiry must be after creation time")]
    ExpiryBeforeCreation,

    #[error("version must be at least 1")]
    VersionBelowOne,
}

/// Checks a transaction's structural invariants, returning every violated
/// rule. An empty result means the record is structurally sound (which
/// says nothing about balances or signatures — those are separate
/// questions).
pub fn validate_structure(tx: &Transaction) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if tx.id.is_empty() {
        issues.push(ValidationIssue::MissingId);
    }
    if tx.amount.is_zero() {
        issues.push(ValidationIssue::NonPositiveAmount);
    }
    if tx.sender == tx.recipient {
        issues.push(ValidationIssue::SelfTransfer);
    }
    // The all-zero signature is the builder's pre-signing placeholder; a
    // record that still carries it was never signed.
    if tx.signature.as_bytes() == &[0u8; 64] {
        issues.push(ValidationIssue::MissingSignature);
    }
    if tx.expires_at <= tx.created_at {
        issues.push(ValidationIssue::ExpiryBeforeCreation);
    }
    if tx.version < 1 {
        issues.push(ValidationIssue::VersionBelowOne);
    }

    issues
}

/// Verifies the sender's signature against the transaction's signable
/// payload, using an explicitly supplied verifying key.
///
/// The signature was produced over the version-1 PENDING record, so this
/// only holds for a transaction that hasn't transitioned yet; historical
/// verification requires reconstructing the original payload.
pub fn verify_signature(tx: &Transaction, sender_key: &VerifyingKey) -> bool {
    verify_with_key(sender_key, &tx.signable_bytes(), &tx.signature)
}
