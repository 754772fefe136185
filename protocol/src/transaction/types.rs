//! Core type definitions for EBB transactions.
//!
//! These types form the vocabulary of every transfer on the ledger: the
//! five-state lifecycle, the optional handshake record, and the
//! arbitrary-precision [`Amount`].

use num_bigint::BigUint;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use crate::crypto::hash::Hash;

// ---------------------------------------------------------------------------
// TransactionState
// ---------------------------------------------------------------------------

/// Lifecycle state of a transaction in the reversible-transfer model.
///
/// The legal transitions form a fixed graph:
///
/// ```text
/// PENDING -> FINALIZED   (recipient confirms, or expiry auto-finalizes)
/// PENDING -> CANCELLED   (sender cancels, or expiry auto-returns)
/// PENDING -> FROZEN      (flagged for guardian review)
/// FROZEN  -> FINALIZED   (guardians approve completion)
/// FROZEN  -> RECOVERED   (guardians return funds to sender)
/// ```
///
/// `FINALIZED`, `CANCELLED`, and `RECOVERED` are terminal: no outgoing
/// edges, ever. Everything that enforces this calls
/// [`TransactionState::can_transition_to`] — there is exactly one copy of
/// the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    /// Created but not yet confirmed by the recipient. Funds are locked
    /// in the pending buckets on both sides.
    Pending,
    /// Completed; funds delivered to the recipient.
    Finalized,
    /// Cancelled by the sender before confirmation; funds returned.
    Cancelled,
    /// Held for guardian review; funds stay locked.
    Frozen,
    /// Guardians returned the funds to the sender.
    Recovered,
}

impl TransactionState {
    /// Returns `true` if `to` is a legal next state from `self`.
    pub fn can_transition_to(self, to: TransactionState) -> bool {
        use TransactionState::*;
        matches!(
            (self, to),
            (Pending, Finalized) | (Pending, Cancelled) | (Pending, Frozen)
                | (Frozen, Finalized)
                | (Frozen, Recovered)
        )
    }

    /// Returns `true` if no further transitions are permitted.
    pub fn is_terminal(self) -> bool {
        use TransactionState::*;
        matches!(self, Finalized | Cancelled | Recovered)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Finalized => write!(f, "FINALIZED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Frozen => write!(f, "FROZEN"),
            Self::Recovered => write!(f, "RECOVERED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// One-time-key confirmation artifact attached to a transaction.
///
/// `handshake_id` is the hash of a secret the sender conveys out of band;
/// `ack_id` is set when the recipient proves possession at confirmation
/// time. The secret itself is never persisted anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    /// `SHA-256("handshake:" + secret)`.
    pub handshake_id: Hash,
    /// `SHA-256("ack:" + secret + ":" + recipient)`; `None` until the
    /// recipient confirms.
    pub ack_id: Option<Hash>,
    /// Unix-millisecond timestamp after which the handshake is stale.
    pub expires_at: u64,
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A monetary amount in the smallest indivisible unit.
///
/// Arbitrary precision, non-negative, and never anywhere near a floating
/// type. Serializes as a decimal string so values round-trip exactly
/// through JSON regardless of magnitude.
///
/// Arithmetic is deliberately minimal: addition (cannot overflow) and
/// checked subtraction (the ledger guards every debit with a balance
/// check first, and `checked_sub` turns any bookkeeping bug into a loud
/// `None` instead of a silent wrap).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Amount(BigUint);

impl Amount {
    /// The zero amount.
    pub fn zero() -> Self {
        Self(BigUint::default())
    }

    /// Returns `true` if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == BigUint::default()
    }

    /// Parses a decimal string.
    pub fn parse(s: &str) -> Result<Self, num_bigint::ParseBigIntError> {
        Ok(Self(BigUint::from_str(s)?))
    }

    /// Subtraction that refuses to go negative.
    ///
    /// Returns `None` if `other > self`. Callers in the ledger treat
    /// `None` as an invariant violation, not a business outcome.
    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if other.0 > self.0 {
            None
        } else {
            Some(Amount(&self.0 - &other.0))
        }
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl Add<&Amount> for &Amount {
    type Output = Amount;

    fn add(self, rhs: &Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl AddAssign<&Amount> for Amount {
    fn add_assign(&mut self, rhs: &Amount) {
        self.0 += &rhs.0;
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_str_radix(10))
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0.to_str_radix(10))
    }
}

impl FromStr for Amount {
    type Err = num_bigint::ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_str_radix(10))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Amount::parse(&s).map_err(|_| D::Error::custom("expected a decimal integer string"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display() {
        assert_eq!(TransactionState::Pending.to_string(), "PENDING");
        assert_eq!(TransactionState::Recovered.to_string(), "RECOVERED");
    }

    #[test]
    fn legal_transitions() {
        use TransactionState::*;
        assert!(Pending.can_transition_to(Finalized));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Frozen));
        assert!(Frozen.can_transition_to(Finalized));
        assert!(Frozen.can_transition_to(Recovered));
    }

    #[test]
    fn illegal_transitions() {
        use TransactionState::*;
        assert!(!Cancelled.can_transition_to(Finalized));
        assert!(!Frozen.can_transition_to(Cancelled));
        assert!(!Finalized.can_transition_to(Pending));
        assert!(!Recovered.can_transition_to(Finalized));
        assert!(!Pending.can_transition_to(Recovered));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn terminal_states() {
        use TransactionState::*;
        assert!(Finalized.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(Recovered.is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!Frozen.is_terminal());
    }

    #[test]
    fn state_serde_uses_screaming_case() {
        let json = serde_json::to_string(&TransactionState::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
        let recovered: TransactionState = serde_json::from_str("\"FROZEN\"").unwrap();
        assert_eq!(recovered, TransactionState::Frozen);
    }

    #[test]
    fn amount_serializes_as_decimal_string() {
        let amount = Amount::from(1_000_000u64);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"1000000\"");
    }

    #[test]
    fn amount_roundtrips_beyond_u64() {
        // 2^64 is not an upper bound here. Exact accounting means exact
        // at any magnitude.
        let huge = "340282366920938463463374607431768211456"; // 2^128
        let amount = Amount::parse(huge).unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        let recovered: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(amount, recovered);
        assert_eq!(recovered.to_string(), huge);
    }

    #[test]
    fn amount_rejects_non_decimal() {
        assert!(Amount::parse("12.5").is_err());
        assert!(Amount::parse("-3").is_err());
        assert!(Amount::parse("0x10").is_err());
        assert!(Amount::parse("").is_err());
    }

    #[test]
    fn amount_arithmetic() {
        let mut a = Amount::from(100u64);
        a += &Amount::from(50u64);
        assert_eq!(a, Amount::from(150u64));

        let sum = &a + &Amount::from(1u64);
        assert_eq!(sum, Amount::from(151u64));
    }

    #[test]
    fn checked_sub_refuses_negative() {
        let a = Amount::from(10u64);
        let b = Amount::from(20u64);
        assert_eq!(a.checked_sub(&b), None);
        assert_eq!(b.checked_sub(&a), Some(Amount::from(10u64)));
    }

    #[test]
    fn amount_ordering() {
        assert!(Amount::from(1u64) < Amount::from(2u64));
        assert!(Amount::zero().is_zero());
        assert!(!Amount::from(1u64).is_zero());
    }

    #[test]
    fn handshake_serde_roundtrip() {
        let hs = Handshake {
            handshake_id: crate::crypto::sha256(b"handshake:secret"),
            ack_id: None,
            expires_at: 1_700_000_000_000,
        };
        let json = serde_json::to_string(&hs).unwrap();
        let recovered: Handshake = serde_json::from_str(&json).unwrap();
        assert_eq!(hs, recovered);
    }
}
