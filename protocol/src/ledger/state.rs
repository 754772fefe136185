//! # Ledger State
//!
//! The aggregate the whole system revolves around: the block chain, the
//! account map, the pending-transaction index, and the all-time
//! transaction index, mutated together under single-writer discipline.
//!
//! ## The delta table
//!
//! [`LedgerState::apply_state_change`] is the crux. Given the OLD and NEW
//! records of a transition, it applies exactly the implied balance delta:
//!
//! ```text
//! PENDING -> FINALIZED   sender.pending_outgoing -= amount
//!                        recipient.pending_incoming -= amount
//!                        recipient.available += amount
//! PENDING -> CANCELLED   sender.pending_outgoing -= amount
//!                        sender.available += amount
//!                        recipient.pending_incoming -= amount
//! PENDING -> FROZEN      (no balance change; funds stay locked)
//! FROZEN  -> FINALIZED   same as PENDING -> FINALIZED
//! FROZEN  -> RECOVERED   same as PENDING -> CANCELLED
//! anything else          no-op on balances, index still updated
//! ```
//!
//! Balances are maintained incrementally — never derived by replaying
//! history — and always reconcile to `total = available +
//! pending_incoming`, with system-wide supply conserved by everything
//! except [`LedgerState::mint`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use super::account::{Account, AccountBalance};
use super::block::{Block, BlockRule};
use crate::config::now_millis;
use crate::crypto::hash::Hash;
use crate::crypto::keys::Address;
use crate::transaction::dispute::{Dispute, DisputeError, GuardianDecision, GuardianVote};
use crate::transaction::lifecycle::{self, TransactionError};
use crate::transaction::types::{Amount, TransactionState};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Expected business-rule violations raised by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A transaction with this id is already indexed.
    #[error("transaction {id} already exists")]
    DuplicateTransaction {
        /// The offending transaction id.
        id: String,
    },

    /// The sender's available balance can't cover the transfer.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// What the sender has.
        available: Amount,
        /// What the transfer needs.
        requested: Amount,
    },

    /// No transaction with this id is known to the ledger.
    #[error("transaction {id} not found")]
    TransactionNotFound {
        /// The id that was looked up.
        id: String,
    },

    /// The candidate block violated one or more chain rules.
    #[error("block rejected: {violations:?}")]
    BlockRejected {
        /// Every rule the block broke.
        violations: Vec<BlockRule>,
    },

    /// No dispute is open for this transaction.
    #[error("no dispute open for transaction {transaction_id}")]
    DisputeNotFound {
        /// The transaction id that was looked up.
        transaction_id: String,
    },

    /// Not enough matching guardian votes to resolve the dispute.
    #[error("guardian quorum not reached: {votes_needed} matching votes required")]
    QuorumNotReached {
        /// The configured threshold.
        votes_needed: u32,
    },

    /// A state-machine operation refused the transition.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// A dispute-file operation refused.
    #[error(transparent)]
    Dispute(#[from] DisputeError),
}

// ---------------------------------------------------------------------------
// LedgerState
// ---------------------------------------------------------------------------

/// The complete, self-consistent ledger aggregate.
///
/// Owns the chain, every account, and both transaction indexes. All
/// mutation goes through the methods below; the fields are public for
/// serialization and read access, and because this crate trusts its
/// embedder to respect the single-writer contract documented in
/// [`super::shared`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerState {
    /// The hash-linked chain. Index 0 is genesis; never empty.
    pub blocks: Vec<Block>,
    /// Account entries keyed by address.
    pub accounts: HashMap<Address, Account>,
    /// Transactions not yet in a terminal state nor committed to a block.
    pub pending_transactions: HashMap<String, Transaction>,
    /// All transactions ever accepted, terminal ones included.
    pub transactions: HashMap<String, Transaction>,
    /// Open and resolved guardian disputes, keyed by transaction id.
    pub disputes: HashMap<String, Dispute>,
}

/// Debits `amount` from a bucket that is guaranteed (by the delta-table
/// invariants) to hold at least that much. If the guarantee is ever
/// broken we clamp to zero and scream, rather than wrap or panic.
fn drain_bucket(bucket: &mut Amount, amount: &Amount, what: &'static str) {
    match bucket.checked_sub(amount) {
        Some(remaining) => *bucket = remaining,
        None => {
            tracing::error!(bucket = what, "balance bucket underflow clamped to zero");
            *bucket = Amount::zero();
        }
    }
}

impl LedgerState {
    /// Fresh ledger with a genesis block, no accounts, no transactions.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::genesis()],
            accounts: HashMap::new(),
            pending_transactions: HashMap::new(),
            transactions: HashMap::new(),
            disputes: HashMap::new(),
        }
    }

    // -- accounts ----------------------------------------------------------

    /// Returns the account for `address`, creating a zeroed entry on
    /// first reference. Idempotent.
    pub fn get_or_create_account(&mut self, address: &Address) -> &mut Account {
        self.accounts
            .entry(*address)
            .or_insert_with(|| Account::new(*address))
    }

    /// Adds funds to an account: `pending` routes to `pending_incoming`,
    /// otherwise to `available`.
    pub fn credit(&mut self, address: &Address, amount: &Amount, pending: bool) {
        let account = self.get_or_create_account(address);
        if pending {
            account.balance.pending_incoming += amount;
        } else {
            account.balance.available += amount;
        }
        account.balance.recompute_total();
        account.touch();
    }

    /// Removes funds from an account's available balance.
    ///
    /// `pending` moves the amount into `pending_outgoing` (locking it)
    /// instead of destroying it. Returns `false` without mutating when
    /// `available < amount`.
    pub fn debit(&mut self, address: &Address, amount: &Amount, pending: bool) -> bool {
        let account = self.get_or_create_account(address);
        if account.balance.available < *amount {
            return false;
        }

        drain_bucket(&mut account.balance.available, amount, "available");
        if pending {
            account.balance.pending_outgoing += amount;
        }
        account.balance.recompute_total();
        account.touch();
        true
    }

    /// Credits available funds out of thin air.
    ///
    /// Test and bootstrap only: the single operation that increases total
    /// system supply. Everything else conserves it.
    pub fn mint(&mut self, address: &Address, amount: &Amount) {
        tracing::info!(%address, %amount, "minting funds");
        self.credit(address, amount, false);
    }

    // -- transaction intake ------------------------------------------------

    /// Accepts a PENDING transaction: locks the funds on both sides and
    /// indexes the record.
    ///
    /// Atomic: any failure leaves the ledger untouched. The duplicate
    /// check runs against the all-time index, so a settled id can never
    /// be resubmitted either.
    pub fn add_pending_transaction(&mut self, tx: Transaction) -> Result<(), LedgerError> {
        if self.transactions.contains_key(&tx.id) {
            return Err(LedgerError::DuplicateTransaction { id: tx.id.clone() });
        }

        let available = self.get_or_create_account(&tx.sender).balance.available.clone();
        if available < tx.amount {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: tx.amount.clone(),
            });
        }

        // Balance check passed; from here everything succeeds.
        let amount = tx.amount.clone();
        self.debit(&tx.sender, &amount, true);
        self.credit(&tx.recipient, &amount, true);

        self.get_or_create_account(&tx.sender).transaction_count += 1;

        tracing::info!(
            tx_id = %tx.id,
            sender = %tx.sender,
            recipient = %tx.recipient,
            amount = %tx.amount,
            "pending transaction accepted"
        );

        self.pending_transactions.insert(tx.id.clone(), tx.clone());
        self.transactions.insert(tx.id.clone(), tx);
        Ok(())
    }

    /// Applies the balance delta implied by an accepted state transition
    /// and replaces the indexed record.
    ///
    /// Callers obtain `new_tx` from the state machine, which already
    /// enforced the legality of the edge — this method just does the
    /// bookkeeping, and treats any unrecognized (old, new) pair as a
    /// balance no-op that still updates the index.
    pub fn apply_state_change(&mut self, old_tx: &Transaction, new_tx: Transaction) {
        let amount = old_tx.amount.clone();
        use TransactionState::*;

        match (old_tx.state, new_tx.state) {
            (Pending, Finalized) | (Frozen, Finalized) => {
                let sender = self.get_or_create_account(&old_tx.sender);
                drain_bucket(
                    &mut sender.balance.pending_outgoing,
                    &amount,
                    "sender.pending_outgoing",
                );
                sender.balance.recompute_total();
                sender.touch();

                let recipient = self.get_or_create_account(&old_tx.recipient);
                drain_bucket(
                    &mut recipient.balance.pending_incoming,
                    &amount,
                    "recipient.pending_incoming",
                );
                recipient.balance.available += &amount;
                recipient.balance.recompute_total();
                recipient.touch();
            }
            (Pending, Cancelled) | (Frozen, Recovered) => {
                let sender = self.get_or_create_account(&old_tx.sender);
                drain_bucket(
                    &mut sender.balance.pending_outgoing,
                    &amount,
                    "sender.pending_outgoing",
                );
                sender.balance.available += &amount;
                sender.balance.recompute_total();
                sender.touch();

                let recipient = self.get_or_create_account(&old_tx.recipient);
                drain_bucket(
                    &mut recipient.balance.pending_incoming,
                    &amount,
                    "recipient.pending_incoming",
                );
                recipient.balance.recompute_total();
                recipient.touch();
            }
            (Pending, Frozen) => {
                // Funds stay locked; nothing moves.
            }
            (from, to) => {
                tracing::debug!(%from, %to, tx_id = %new_tx.id, "transition with no balance effect");
            }
        }

        let id = new_tx.id.clone();
        if new_tx.state.is_terminal() {
            self.pending_transactions.remove(&id);
        } else if let Some(entry) = self.pending_transactions.get_mut(&id) {
            // Keep the in-flight index current (a frozen record must not
            // linger here as its stale PENDING predecessor, or the expiry
            // sweep would settle funds that are under guardian review).
            *entry = new_tx.clone();
        }
        self.transactions.insert(id, new_tx);
    }

    // -- disputes ----------------------------------------------------------

    /// Freezes a pending transaction for guardian review and opens the
    /// dispute file. Returns the frozen record.
    pub fn freeze_transaction(
        &mut self,
        tx_id: &str,
        reason: &str,
    ) -> Result<Transaction, LedgerError> {
        let tx = self
            .transactions
            .get(tx_id)
            .cloned()
            .ok_or_else(|| LedgerError::TransactionNotFound { id: tx_id.into() })?;

        let frozen = lifecycle::freeze(&tx, reason)?;
        self.apply_state_change(&tx, frozen.clone());
        self.disputes
            .insert(tx_id.to_string(), Dispute::open(tx_id, reason));
        Ok(frozen)
    }

    /// Records a guardian's vote on a frozen transaction's dispute.
    pub fn record_guardian_vote(
        &mut self,
        tx_id: &str,
        vote: GuardianVote,
    ) -> Result<(), LedgerError> {
        let dispute = self
            .disputes
            .get_mut(tx_id)
            .ok_or_else(|| LedgerError::DisputeNotFound {
                transaction_id: tx_id.into(),
            })?;
        dispute.record_vote(vote)?;
        Ok(())
    }

    /// Resolves a frozen transaction once guardian quorum is reached.
    ///
    /// The quorum is a precondition gate in front of the state machine:
    /// without `required_votes` matching Approve or Recover votes this
    /// fails with [`LedgerError::QuorumNotReached`] and nothing changes.
    /// With quorum, the plain `FROZEN -> FINALIZED` or `FROZEN ->
    /// RECOVERED` transition is driven and its balance delta applied.
    pub fn resolve_dispute(
        &mut self,
        tx_id: &str,
        required_votes: u32,
    ) -> Result<Transaction, LedgerError> {
        let dispute = self
            .disputes
            .get(tx_id)
            .ok_or_else(|| LedgerError::DisputeNotFound {
                transaction_id: tx_id.into(),
            })?;
        if dispute.is_resolved() {
            return Err(DisputeError::AlreadyResolved.into());
        }
        let decision = dispute
            .decision(required_votes)
            .ok_or(LedgerError::QuorumNotReached {
                votes_needed: required_votes,
            })?;

        let tx = self
            .transactions
            .get(tx_id)
            .cloned()
            .ok_or_else(|| LedgerError::TransactionNotFound { id: tx_id.into() })?;

        let resolved = match decision {
            GuardianDecision::Approve => lifecycle::approve_frozen(&tx)?,
            GuardianDecision::Recover => lifecycle::recover(&tx)?,
            // decision() never yields PendingReview.
            GuardianDecision::PendingReview => {
                return Err(LedgerError::QuorumNotReached {
                    votes_needed: required_votes,
                })
            }
        };

        self.apply_state_change(&tx, resolved.clone());
        if let Some(dispute) = self.disputes.get_mut(tx_id) {
            dispute.mark_resolved();
        }
        tracing::info!(tx_id, decision = %decision, "dispute resolved");
        Ok(resolved)
    }

    /// Returns the dispute file for a transaction, if one was opened.
    pub fn dispute(&self, tx_id: &str) -> Option<&Dispute> {
        self.disputes.get(tx_id)
    }

    // -- expiry ------------------------------------------------------------

    /// Pending transactions whose grace window has passed.
    pub fn expired_pending(&self) -> Vec<Transaction> {
        let now = now_millis();
        self.pending_transactions
            .values()
            .filter(|tx| tx.is_expired(now))
            .cloned()
            .collect()
    }

    /// Settles every expired pending transaction according to the
    /// deployment policy and returns the new records.
    ///
    /// Drives [`lifecycle::process_expired`] per transaction; the caller
    /// owns the periodic tick (there is no scheduler in the core).
    pub fn sweep_expired(&mut self, auto_finalize: bool) -> Vec<Transaction> {
        let mut settled = Vec::new();
        for tx in self.expired_pending() {
            match lifecycle::process_expired(&tx, auto_finalize) {
                Ok(new_tx) => {
                    self.apply_state_change(&tx, new_tx.clone());
                    settled.push(new_tx);
                }
                Err(err) => {
                    // A frozen or raced transaction is not ours to settle.
                    tracing::debug!(tx_id = %tx.id, %err, "skipped during expiry sweep");
                }
            }
        }
        if !settled.is_empty() {
            tracing::info!(count = settled.len(), auto_finalize, "expiry sweep settled transactions");
        }
        settled
    }

    // -- blocks ------------------------------------------------------------

    /// Builds a block from `transactions`, validates it against the chain
    /// tip, and appends it.
    ///
    /// On success the included transactions leave the pending index (they
    /// remain in the all-time index). On failure the errors are returned
    /// and the state is untouched.
    pub fn append_block(&mut self, transactions: Vec<Transaction>) -> Result<Block, LedgerError> {
        if self.blocks.is_empty() {
            // A chain without genesis only happens with hand-corrupted
            // state; re-seed rather than build on nothing.
            self.blocks.push(Block::genesis());
        }
        let previous = self.blocks[self.blocks.len() - 1].clone();

        let block = Block::build(&previous, transactions);
        let violations = block.validate(&previous);
        if !violations.is_empty() {
            return Err(LedgerError::BlockRejected { violations });
        }

        for tx in &block.transactions {
            self.transactions.insert(tx.id.clone(), tx.clone());
            self.pending_transactions.remove(&tx.id);
        }

        tracing::info!(
            index = block.index(),
            tx_count = block.tx_count(),
            hash = %block.hash,
            "block appended"
        );
        self.blocks.push(block.clone());
        Ok(block)
    }

    // -- queries -----------------------------------------------------------

    /// Balance breakdown for an address; zeroed if never seen.
    pub fn balance(&self, address: &Address) -> AccountBalance {
        self.accounts
            .get(address)
            .map(|a| a.balance.clone())
            .unwrap_or_default()
    }

    /// The account entry for an address, if one exists.
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Chain height: the tip's index. Genesis-only is height 0.
    pub fn block_height(&self) -> u64 {
        self.blocks.len().saturating_sub(1) as u64
    }

    /// Block by height.
    pub fn block_by_index(&self, index: u64) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    /// Block by header hash.
    pub fn block_by_hash(&self, hash: &Hash) -> Option<&Block> {
        self.blocks.iter().find(|b| b.hash == *hash)
    }

    /// Transaction by id, whatever its state.
    pub fn transaction(&self, tx_id: &str) -> Option<&Transaction> {
        self.transactions.get(tx_id)
    }

    /// In-flight transactions where `address` is a party.
    pub fn pending_transactions_for(&self, address: &Address) -> Vec<&Transaction> {
        self.pending_transactions
            .values()
            .filter(|tx| tx.sender == *address || tx.recipient == *address)
            .collect()
    }

    /// Every transaction where `address` is a party, newest first.
    pub fn transactions_for(&self, address: &Address) -> Vec<&Transaction> {
        let mut txs: Vec<&Transaction> = self
            .transactions
            .values()
            .filter(|tx| tx.sender == *address || tx.recipient == *address)
            .collect();
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        txs
    }

    /// Sum of every account's funds across all three real buckets.
    ///
    /// Conserved by every operation except [`LedgerState::mint`] — the
    /// reconciliation tests lean on this.
    pub fn total_supply(&self) -> Amount {
        let mut supply = Amount::zero();
        for account in self.accounts.values() {
            supply += &account.balance.available;
            supply += &account.balance.pending_outgoing;
            supply += &account.balance.pending_incoming;
        }
        supply
    }
}

impl Default for LedgerState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
