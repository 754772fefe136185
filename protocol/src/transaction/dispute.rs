//! Guardian dispute files for frozen transactions.
//!
//! Freezing a transaction opens a [`Dispute`]: a per-transaction vote
//! ledger where guardians record their decision. The state machine itself
//! knows nothing about quorums — it only has the `FROZEN -> FINALIZED`
//! and `FROZEN -> RECOVERED` edges. The quorum lives here, as a
//! precondition gate the ledger consults before driving either edge
//! (see [`crate::ledger::LedgerState::resolve_dispute`]).
//!
//! One vote per guardian; re-voting replaces the earlier vote, so a
//! guardian who changes their mind during review doesn't double-count.
//! `PendingReview` is a recorded opinion ("need more information") that
//! can never satisfy a quorum.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::config::now_millis;
use crate::crypto::keys::Address;

/// Errors raised by dispute-file operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DisputeError {
    /// The dispute has already been resolved; no further votes accepted.
    #[error("dispute already resolved")]
    AlreadyResolved,
}

/// A guardian's decision on a frozen transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardianDecision {
    /// Let the transfer complete (drive `FROZEN -> FINALIZED`).
    Approve,
    /// Return the funds to the sender (drive `FROZEN -> RECOVERED`).
    Recover,
    /// Not ready to rule; counts toward neither outcome.
    PendingReview,
}

impl fmt::Display for GuardianDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => write!(f, "APPROVE"),
            Self::Recover => write!(f, "RECOVER"),
            Self::PendingReview => write!(f, "PENDING_REVIEW"),
        }
    }
}

/// A single guardian's vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianVote {
    /// The guardian's address.
    pub guardian: Address,
    /// The decision cast.
    pub decision: GuardianDecision,
    /// The guardian's stated reasoning.
    pub reason: String,
    /// When the vote was cast, Unix milliseconds.
    pub timestamp: u64,
}

/// The vote ledger for one frozen transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    /// Unique dispute identifier (UUID v4).
    pub id: String,
    /// The frozen transaction under review.
    pub transaction_id: String,
    /// Why the transaction was frozen.
    pub reason: String,
    /// Votes cast so far, at most one per guardian.
    pub votes: Vec<GuardianVote>,
    /// When the dispute was opened, Unix milliseconds.
    pub opened_at: u64,
    /// When the dispute was resolved, if it has been.
    pub resolved_at: Option<u64>,
}

impl Dispute {
    /// Opens a dispute for a freshly frozen transaction.
    pub fn open(transaction_id: &str, reason: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            transaction_id: transaction_id.to_string(),
            reason: reason.to_string(),
            votes: Vec::new(),
            opened_at: now_millis(),
            resolved_at: None,
        }
    }

    /// Records a guardian's vote. A guardian voting again replaces their
    /// earlier vote.
    ///
    /// # Errors
    ///
    /// [`DisputeError::AlreadyResolved`] once the dispute is closed —
    /// resolved disputes are history, not ballots.
    pub fn record_vote(&mut self, vote: GuardianVote) -> Result<(), DisputeError> {
        if self.resolved_at.is_some() {
            return Err(DisputeError::AlreadyResolved);
        }

        self.votes.retain(|v| v.guardian != vote.guardian);
        tracing::debug!(
            dispute_id = %self.id,
            guardian = %vote.guardian,
            decision = %vote.decision,
            "guardian vote recorded"
        );
        self.votes.push(vote);
        Ok(())
    }

    /// Returns the quorum outcome, if any decision has reached
    /// `required_votes`. `PendingReview` votes never contribute.
    pub fn decision(&self, required_votes: u32) -> Option<GuardianDecision> {
        for candidate in [GuardianDecision::Approve, GuardianDecision::Recover] {
            let count = self
                .votes
                .iter()
                .filter(|v| v.decision == candidate)
                .count() as u32;
            if count >= required_votes {
                return Some(candidate);
            }
        }
        None
    }

    /// Returns `true` if the dispute has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    /// Closes the dispute. Called by the ledger once the resolved
    /// transition has been applied.
    pub(crate) fn mark_resolved(&mut self) {
        self.resolved_at = Some(now_millis());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Keypair;

    fn vote(guardian: &Address, decision: GuardianDecision) -> GuardianVote {
        GuardianVote {
            guardian: *guardian,
            decision,
            reason: "reviewed the evidence".into(),
            timestamp: now_millis(),
        }
    }

    #[test]
    fn new_dispute_is_open_and_empty() {
        let d = Dispute::open("tx-1", "suspected fraud");
        assert!(d.votes.is_empty());
        assert!(!d.is_resolved());
        assert_eq!(d.decision(1), None);
    }

    #[test]
    fn quorum_of_one() {
        let mut d = Dispute::open("tx-1", "review");
        let g = Keypair::generate().address();
        d.record_vote(vote(&g, GuardianDecision::Recover)).unwrap();
        assert_eq!(d.decision(1), Some(GuardianDecision::Recover));
    }

    #[test]
    fn quorum_requires_threshold() {
        let mut d = Dispute::open("tx-1", "review");
        let g1 = Keypair::generate().address();
        let g2 = Keypair::generate().address();

        d.record_vote(vote(&g1, GuardianDecision::Approve)).unwrap();
        assert_eq!(d.decision(2), None);

        d.record_vote(vote(&g2, GuardianDecision::Approve)).unwrap();
        assert_eq!(d.decision(2), Some(GuardianDecision::Approve));
    }

    #[test]
    fn split_votes_do_not_resolve() {
        let mut d = Dispute::open("tx-1", "review");
        let g1 = Keypair::generate().address();
        let g2 = Keypair::generate().address();

        d.record_vote(vote(&g1, GuardianDecision::Approve)).unwrap();
        d.record_vote(vote(&g2, GuardianDecision::Recover)).unwrap();
        assert_eq!(d.decision(2), None);
    }

    #[test]
    fn pending_review_never_counts() {
        let mut d = Dispute::open("tx-1", "review");
        let g = Keypair::generate().address();
        d.record_vote(vote(&g, GuardianDecision::PendingReview))
            .unwrap();
        assert_eq!(d.decision(1), None);
    }

    #[test]
    fn revote_replaces_earlier_vote() {
        let mut d = Dispute::open("tx-1", "review");
        let g = Keypair::generate().address();

        d.record_vote(vote(&g, GuardianDecision::Approve)).unwrap();
        d.record_vote(vote(&g, GuardianDecision::Recover)).unwrap();

        assert_eq!(d.votes.len(), 1);
        assert_eq!(d.decision(1), Some(GuardianDecision::Recover));
    }

    #[test]
    fn resolved_dispute_rejects_votes() {
        let mut d = Dispute::open("tx-1", "review");
        d.mark_resolved();

        let g = Keypair::generate().address();
        assert_eq!(
            d.record_vote(vote(&g, GuardianDecision::Approve)),
            Err(DisputeError::AlreadyResolved)
        );
    }

    #[test]
    fn dispute_serde_roundtrip() {
        let mut d = Dispute::open("tx-1", "review");
        let g = Keypair::generate().address();
        d.record_vote(vote(&g, GuardianDecision::Approve)).unwrap();

        let json = serde_json::to_string(&d).unwrap();
        let recovered: Dispute = serde_json::from_str(&json).unwrap();
        assert_eq!(d, recovered);
    }
}
