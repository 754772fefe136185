//! Per-address balance accounting.
//!
//! Every address has four buckets. `available` is spendable now.
//! `pending_outgoing` holds funds locked by transfers this account sent
//! that haven't settled; `pending_incoming` mirrors that on the receiving
//! side. `total` is the derived headline number: `available +
//! pending_incoming` — what the account will hold if everything in
//! flight lands.
//!
//! The buckets are maintained incrementally by the ledger's delta logic,
//! never recomputed from history. All four are non-negative at all times.

use serde::{Deserialize, Serialize};

use crate::config::now_millis;
use crate::crypto::keys::Address;
use crate::transaction::types::Amount;

/// The four-bucket balance breakdown for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AccountBalance {
    /// Spendable right now.
    pub available: Amount,
    /// Locked by in-flight transfers this account sent.
    pub pending_outgoing: Amount,
    /// In-flight transfers addressed to this account.
    pub pending_incoming: Amount,
    /// `available + pending_incoming`, kept in sync by
    /// [`AccountBalance::recompute_total`].
    pub total: Amount,
}

impl AccountBalance {
    /// Recomputes the derived `total`. Call after any bucket mutation —
    /// the ledger does, religiously.
    pub fn recompute_total(&mut self) {
        self.total = &self.available + &self.pending_incoming;
    }
}

/// Ledger entry for a single address.
///
/// Created lazily on first reference, never deleted. Mutated only by the
/// ledger's credit/debit/delta operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The address this entry belongs to.
    pub address: Address,
    /// Balance breakdown.
    pub balance: AccountBalance,
    /// Number of transactions this account has originated.
    pub transaction_count: u64,
    /// Timestamp of the last balance-affecting operation, Unix ms.
    pub last_activity: u64,
}

impl Account {
    /// Zero-initialized account for a fresh address.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            balance: AccountBalance::default(),
            transaction_count: 0,
            last_activity: now_millis(),
        }
    }

    /// Stamps the activity clock. Bundled with every mutation.
    pub fn touch(&mut self) {
        self.last_activity = now_millis();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Keypair;

    #[test]
    fn fresh_account_is_zeroed() {
        let account = Account::new(Keypair::generate().address());
        assert!(account.balance.available.is_zero());
        assert!(account.balance.pending_outgoing.is_zero());
        assert!(account.balance.pending_incoming.is_zero());
        assert!(account.balance.total.is_zero());
        assert_eq!(account.transaction_count, 0);
    }

    #[test]
    fn total_tracks_available_plus_pending_incoming() {
        let mut balance = AccountBalance::default();
        balance.available = Amount::from(700u64);
        balance.pending_incoming = Amount::from(300u64);
        balance.pending_outgoing = Amount::from(9_999u64); // not part of total
        balance.recompute_total();
        assert_eq!(balance.total, Amount::from(1_000u64));
    }

    #[test]
    fn account_serde_roundtrip() {
        let mut account = Account::new(Keypair::generate().address());
        account.balance.available = Amount::from(42u64);
        account.balance.recompute_total();

        let json = serde_json::to_string(&account).unwrap();
        let recovered: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(account, recovered);
    }
}
