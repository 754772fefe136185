//! # Hashing Utilities
//!
//! Content hashing and Merkle roots for EBB. One hash function, used
//! everywhere: SHA-256. Boring, interoperable, 128-bit collision
//! resistance — exactly what a ledger needs and nothing it doesn't.
//!
//! ## Canonical structured hashing
//!
//! [`hash_structured`] hashes a serde-serializable record by serializing
//! it to JSON first. Determinism relies on two properties we control:
//! struct fields serialize in declaration order, and [`Amount`] values
//! serialize as decimal strings (never as digit arrays or floats). The
//! result is stable across processes and platforms, which is what makes
//! signatures and Merkle commitments meaningful.
//!
//! ## Merkle tie-break
//!
//! [`merkle_root`] duplicates an odd leaf with itself **at every level
//! of the tree, including the top**. This is not Bitcoin's
//! duplicate-only-within-a-level subtlety — the same rule applies
//! uniformly all the way up, and changing it would silently invalidate
//! every previously committed block. Don't.
//!
//! [`Amount`]: crate::transaction::types::Amount

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

// ---------------------------------------------------------------------------
// Hash
// ---------------------------------------------------------------------------

/// A 256-bit content hash.
///
/// Serializes as a 64-character lowercase hex string — the on-disk and
/// display representation throughout the protocol. Internally a fixed
/// array so equality and map keys stay cheap.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    /// The all-zero sentinel. Used as the genesis block's previous hash.
    pub const ZERO: Hash = Hash([0u8; 32]);

    /// Wraps raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded representation. 64 characters for 32 bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..16])
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(|_| D::Error::custom("expected 64 hex characters"))
    }
}

// ---------------------------------------------------------------------------
// Hash Computation
// ---------------------------------------------------------------------------

/// Computes the SHA-256 hash of raw bytes.
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash(out)
}

/// Hashes a structured record by canonical JSON serialization.
///
/// Field order follows struct declaration order, so the same type always
/// produces the same byte stream regardless of how the value was built.
/// Serialization of our own types is infallible in practice; a failure
/// here indicates a type that can't be represented in JSON, which is a
/// programming error, so we surface it rather than hiding it.
pub fn hash_structured<T: Serialize>(value: &T) -> Result<Hash, serde_json::Error> {
    let bytes = serde_json::to_vec(value)?;
    Ok(sha256(&bytes))
}

/// Computes the Merkle root over an ordered list of hashes.
///
/// - Empty input → SHA-256 of the empty string (the committed form of
///   "no transactions", distinct from the zero sentinel).
/// - Single hash → that hash, unchanged.
/// - Otherwise, adjacent pairs are combined as
///   `SHA-256(hex(left) || hex(right))` and the process recurses. An odd
///   trailing hash is paired with itself — at every level, including the
///   final one.
///
/// Pure function: identical input always yields an identical root, and
/// the root is order-sensitive.
pub fn merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return sha256(b"");
    }
    if hashes.len() == 1 {
        return hashes[0];
    }

    let mut level: Vec<Hash> = hashes.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity((level.len() + 1) / 2);
        for chunk in level.chunks(2) {
            let left = chunk[0];
            let right = if chunk.len() == 2 { chunk[1] } else { chunk[0] };
            let mut preimage = String::with_capacity(128);
            preimage.push_str(&left.to_hex());
            preimage.push_str(&right.to_hex());
            next.push(sha256(preimage.as_bytes()));
        }
        level = next;
    }
    level[0]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // SHA-256 of the empty string — the canonical test vector everyone
        // should have memorized by now.
        let hash = sha256(b"");
        assert_eq!(
            hash.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_deterministic() {
        assert_eq!(sha256(b"ebb"), sha256(b"ebb"));
        assert_ne!(sha256(b"ebb"), sha256(b"Ebb")); // case sensitive!
    }

    #[test]
    fn hash_hex_roundtrip() {
        let h = sha256(b"roundtrip");
        let recovered = Hash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, recovered);
    }

    #[test]
    fn hash_rejects_bad_hex() {
        assert!(Hash::from_hex("deadbeef").is_err());
        assert!(Hash::from_hex("not hex at all").is_err());
    }

    #[test]
    fn hash_serde_is_hex_string() {
        let h = sha256(b"serde");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.to_hex()));
        let recovered: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, recovered);
    }

    #[test]
    fn hash_structured_deterministic() {
        #[derive(Serialize)]
        struct Record {
            a: u64,
            b: String,
        }
        let r1 = Record {
            a: 7,
            b: "x".into(),
        };
        let r2 = Record {
            a: 7,
            b: "x".into(),
        };
        assert_eq!(
            hash_structured(&r1).unwrap(),
            hash_structured(&r2).unwrap()
        );
    }

    #[test]
    fn merkle_empty_is_hash_of_empty_string() {
        assert_eq!(merkle_root(&[]), sha256(b""));
    }

    #[test]
    fn merkle_single_leaf_is_identity() {
        let leaf = sha256(b"only child");
        assert_eq!(merkle_root(&[leaf]), leaf);
    }

    #[test]
    fn merkle_two_leaves() {
        let left = sha256(b"left");
        let right = sha256(b"right");
        let expected = sha256(format!("{}{}", left.to_hex(), right.to_hex()).as_bytes());
        assert_eq!(merkle_root(&[left, right]), expected);
    }

    #[test]
    fn merkle_odd_leaf_duplicated() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        let c = sha256(b"c");

        // Level 1: (a,b) and (c,c); level 2: the pair of those.
        let ab = sha256(format!("{}{}", a.to_hex(), b.to_hex()).as_bytes());
        let cc = sha256(format!("{}{}", c.to_hex(), c.to_hex()).as_bytes());
        let expected = sha256(format!("{}{}", ab.to_hex(), cc.to_hex()).as_bytes());

        assert_eq!(merkle_root(&[a, b, c]), expected);
    }

    #[test]
    fn merkle_deterministic() {
        let leaves: Vec<Hash> = (0u8..8).map(|i| sha256(&[i])).collect();
        assert_eq!(merkle_root(&leaves), merkle_root(&leaves));
    }

    #[test]
    fn merkle_order_sensitive() {
        // Everyone must agree on transaction ordering — swapping leaves
        // must change the root.
        let a = sha256(b"first");
        let b = sha256(b"second");
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }

    #[test]
    fn zero_sentinel_is_all_zeros() {
        assert_eq!(Hash::ZERO.as_bytes(), &[0u8; 32]);
        assert_eq!(Hash::ZERO.to_hex(), "0".repeat(64));
    }
}
