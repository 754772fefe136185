//! # Block Structure
//!
//! A block is the unit of the audit trail: an ordered list of
//! transactions committed under a Merkle root, hash-linked to its
//! predecessor. EBB has no consensus — blocks exist so that history is
//! tamper-evident, not so that strangers can agree on it.
//!
//! ## Block layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  BlockHeader                                │
//! │  ├── index: u64          (genesis = 0)      │
//! │  ├── timestamp: u64      (unix millis)      │
//! │  ├── previous_hash: Hash (zeros for genesis)│
//! │  ├── merkle_root: Hash   (over tx hashes)   │
//! │  └── nonce: u64          (reserved, unused) │
//! ├─────────────────────────────────────────────┤
//! │  transactions: Vec<Transaction>             │
//! ├─────────────────────────────────────────────┤
//! │  hash: Hash              (of the header)    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The Merkle leaves are per-transaction content hashes, which exclude
//! signatures — so a block commitment can be checked against the same
//! payload a signature verifier sees.
//!
//! Validation reports **every** violated rule, not just the first.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::now_millis;
use crate::crypto::hash::{hash_structured, merkle_root, sha256, Hash};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// BlockRule
// ---------------------------------------------------------------------------

/// A block-validation rule violation. Each variant names its rule — the
/// error report for a broken block is the list of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BlockRule {
    #[error("block index must be previous index + 1")]
    IndexNotSequential,

    #[error("previous hash does not match the previous block")]
    PreviousHashMismatch,

    #[error("block timestamp must not be before the previous block")]
    TimestampBeforePrevious,

    #[error("merkle root does not match the transactions")]
    MerkleRootMismatch,

    #[error("block hash does not match the header")]
    HeaderHashMismatch,
}

// ---------------------------------------------------------------------------
// BlockHeader / Block
// ---------------------------------------------------------------------------

/// Block metadata and chain linkage. The block hash covers exactly these
/// fields, in this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height, 0-indexed. Genesis is 0.
    pub index: u64,
    /// Production time, Unix milliseconds. Never before the predecessor's
    /// (equal is fine — same-millisecond blocks happen).
    pub timestamp: u64,
    /// Hash of the previous block. [`Hash::ZERO`] for genesis.
    pub previous_hash: Hash,
    /// Merkle root over the content hashes of `transactions`.
    pub merkle_root: Hash,
    /// Reserved for a future proof-of-work field. Always 0 today.
    pub nonce: u64,
}

/// A full block: header, transactions, and the header hash.
///
/// Immutable once appended to a chain — there is no API to modify one,
/// and validation catches anyone reaching around the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Metadata and chain linkage.
    pub header: BlockHeader,
    /// Ordered transactions committed by this block.
    pub transactions: Vec<Transaction>,
    /// SHA-256 of the canonical header serialization.
    pub hash: Hash,
}

/// Canonical header hash: SHA-256 over the header's canonical JSON.
/// Header serialization is infallible — the header is plain integers and
/// hashes — so the fallback arm is unreachable in practice.
fn header_hash(header: &BlockHeader) -> Hash {
    hash_structured(header).unwrap_or_else(|_| sha256(b""))
}

impl Block {
    /// Constructs the genesis block: index 0, zeroed previous hash, and
    /// the Merkle root of an empty transaction set.
    pub fn genesis() -> Self {
        let header = BlockHeader {
            index: 0,
            timestamp: now_millis(),
            previous_hash: Hash::ZERO,
            merkle_root: merkle_root(&[]),
            nonce: 0,
        };
        let hash = header_hash(&header);
        Self {
            header,
            transactions: Vec::new(),
            hash,
        }
    }

    /// Builds a block extending `previous` with the given transactions.
    pub fn build(previous: &Block, transactions: Vec<Transaction>) -> Self {
        let leaves: Vec<Hash> = transactions.iter().map(|tx| tx.content_hash()).collect();
        let header = BlockHeader {
            index: previous.header.index + 1,
            timestamp: now_millis(),
            previous_hash: previous.hash,
            merkle_root: merkle_root(&leaves),
            nonce: 0,
        };
        let hash = header_hash(&header);
        Self {
            header,
            transactions,
            hash,
        }
    }

    /// Recomputes the header hash from current field values.
    pub fn compute_hash(&self) -> Hash {
        header_hash(&self.header)
    }

    /// Validates this block against its predecessor, returning **every**
    /// violated rule. An empty result means the block is valid.
    pub fn validate(&self, previous: &Block) -> Vec<BlockRule> {
        let mut violations = Vec::new();

        if self.header.index != previous.header.index + 1 {
            violations.push(BlockRule::IndexNotSequential);
        }
        if self.header.previous_hash != previous.hash {
            violations.push(BlockRule::PreviousHashMismatch);
        }
        if self.header.timestamp < previous.header.timestamp {
            violations.push(BlockRule::TimestampBeforePrevious);
        }

        let leaves: Vec<Hash> = self.transactions.iter().map(|tx| tx.content_hash()).collect();
        if self.header.merkle_root != merkle_root(&leaves) {
            violations.push(BlockRule::MerkleRootMismatch);
        }
        if self.hash != self.compute_hash() {
            violations.push(BlockRule::HeaderHashMismatch);
        }

        violations
    }

    /// The block height.
    pub fn index(&self) -> u64 {
        self.header.index
    }

    /// Number of transactions committed by this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::crypto::keys::Keypair;
    use crate::transaction::types::Amount;
    use crate::transaction::TransactionBuilder;

    fn make_tx(amount: u64) -> Transaction {
        let signer = Keypair::generate();
        let recipient = Keypair::generate().address();
        TransactionBuilder::new(recipient, Amount::from(amount))
            .build(&signer, &NetworkConfig::default())
            .unwrap()
            .0
    }

    #[test]
    fn genesis_block_properties() {
        let genesis = Block::genesis();
        assert_eq!(genesis.index(), 0);
        assert_eq!(genesis.header.previous_hash, Hash::ZERO);
        assert_eq!(genesis.header.merkle_root, merkle_root(&[]));
        assert_eq!(genesis.header.nonce, 0);
        assert!(genesis.transactions.is_empty());
        assert_eq!(genesis.hash, genesis.compute_hash());
    }

    #[test]
    fn empty_block_merkle_root_matches_empty_merkle() {
        // The committed form of "no transactions" is the Merkle root of
        // the empty sequence, stable across builds.
        let genesis = Block::genesis();
        assert_eq!(genesis.header.merkle_root, sha256(b""));
    }

    #[test]
    fn build_links_to_parent() {
        let genesis = Block::genesis();
        let block = Block::build(&genesis, vec![make_tx(10)]);

        assert_eq!(block.index(), 1);
        assert_eq!(block.header.previous_hash, genesis.hash);
        assert_eq!(block.tx_count(), 1);
        assert!(block.validate(&genesis).is_empty());
    }

    #[test]
    fn chain_of_three_validates() {
        let b0 = Block::genesis();
        let b1 = Block::build(&b0, vec![make_tx(1)]);
        let b2 = Block::build(&b1, vec![make_tx(2), make_tx(3)]);

        assert!(b1.validate(&b0).is_empty());
        assert!(b2.validate(&b1).is_empty());
        assert_eq!(b2.index(), 2);
    }

    #[test]
    fn tampered_index_names_the_rule() {
        let genesis = Block::genesis();
        let mut block = Block::build(&genesis, vec![]);
        block.header.index = 5;
        block.hash = block.compute_hash(); // keep the hash consistent

        let violations = block.validate(&genesis);
        assert!(violations.contains(&BlockRule::IndexNotSequential));
        assert!(!violations.contains(&BlockRule::HeaderHashMismatch));
    }

    #[test]
    fn tampered_previous_hash_detected() {
        let genesis = Block::genesis();
        let mut block = Block::build(&genesis, vec![]);
        block.header.previous_hash = sha256(b"somewhere else");
        block.hash = block.compute_hash();

        assert!(block
            .validate(&genesis)
            .contains(&BlockRule::PreviousHashMismatch));
    }

    #[test]
    fn tampered_timestamp_detected() {
        let genesis = Block::genesis();
        let mut block = Block::build(&genesis, vec![]);
        block.header.timestamp = genesis.header.timestamp - 1;
        block.hash = block.compute_hash();

        assert!(block
            .validate(&genesis)
            .contains(&BlockRule::TimestampBeforePrevious));
    }

    #[test]
    fn equal_timestamp_allowed() {
        // Same-millisecond blocks are legal: the rule is >=, not >.
        let genesis = Block::genesis();
        let mut block = Block::build(&genesis, vec![]);
        block.header.timestamp = genesis.header.timestamp;
        block.hash = block.compute_hash();

        assert!(!block
            .validate(&genesis)
            .contains(&BlockRule::TimestampBeforePrevious));
    }

    #[test]
    fn tampered_merkle_root_detected() {
        let genesis = Block::genesis();
        let mut block = Block::build(&genesis, vec![make_tx(7)]);
        block.header.merkle_root = sha256(b"forged");
        block.hash = block.compute_hash();

        assert!(block
            .validate(&genesis)
            .contains(&BlockRule::MerkleRootMismatch));
    }

    #[test]
    fn tampered_hash_detected() {
        let genesis = Block::genesis();
        let mut block = Block::build(&genesis, vec![]);
        block.hash = sha256(b"not the header");

        assert!(block
            .validate(&genesis)
            .contains(&BlockRule::HeaderHashMismatch));
    }

    #[test]
    fn swapped_transaction_breaks_merkle_root() {
        let genesis = Block::genesis();
        let mut block = Block::build(&genesis, vec![make_tx(7)]);
        block.transactions = vec![make_tx(8)];

        assert!(block
            .validate(&genesis)
            .contains(&BlockRule::MerkleRootMismatch));
    }

    #[test]
    fn all_violations_accumulate() {
        let genesis = Block::genesis();
        let mut block = Block::build(&genesis, vec![make_tx(7)]);
        block.header.index = 9;
        block.header.previous_hash = Hash::ZERO;
        block.header.merkle_root = sha256(b"wrong");
        // hash now stale too

        let violations = block.validate(&genesis);
        assert!(violations.len() >= 4, "got: {:?}", violations);
    }

    #[test]
    fn block_serde_roundtrip() {
        let genesis = Block::genesis();
        let block = Block::build(&genesis, vec![make_tx(42)]);
        let json = serde_json::to_string(&block).unwrap();
        let recovered: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(block, recovered);
        assert!(recovered.validate(&genesis).is_empty());
    }
}
