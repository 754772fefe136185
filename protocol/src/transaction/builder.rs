//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] enforces a disciplined construction flow:
//! set the fields, call `.build()` with the sender's keypair, and get
//! back a signed PENDING [`Transaction`] — plus, when a handshake was
//! requested, the freshly generated one-time secret that the caller must
//! deliver out of band (and that nothing in this crate will ever store).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lifecycle::TransactionError;
use super::types::{Amount, Handshake, TransactionState};
use crate::config::{now_millis, NetworkConfig, MAX_MEMO_LENGTH};
use crate::crypto::handshake::{handshake_id, OneTimeSecret};
use crate::crypto::hash::{sha256, Hash};
use crate::crypto::keys::{Address, Keypair, Signature};

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A reversible transfer between two addresses.
///
/// Immutable once constructed: state transitions produce a *new*
/// `Transaction` with `version + 1` (see [`super::lifecycle`]), never a
/// field edit. The ledger keeps the old value only long enough to compute
/// the balance delta of the transition.
///
/// # Canonical form
///
/// The signing and content-hash domain is the canonical JSON of every
/// field except `signature`, in the declaration order below. Excluding
/// the signature is what makes verification possible — you can't sign
/// your own signature. Amounts serialize as decimal strings, so the
/// canonical bytes are identical across processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier (UUID v4).
    pub id: String,
    /// Sender's address.
    pub sender: Address,
    /// Recipient's address. Always differs from `sender`.
    pub recipient: Address,
    /// Transfer amount in the smallest unit. Always positive.
    pub amount: Amount,
    /// Free-form memo. Empty string when the sender didn't set one.
    pub memo: String,
    /// Current lifecycle state.
    pub state: TransactionState,
    /// Creation timestamp, Unix milliseconds.
    pub created_at: u64,
    /// End of the grace window. Strictly after `created_at`.
    pub expires_at: u64,
    /// Timestamp of the last accepted state transition.
    pub updated_at: u64,
    /// Optimistic-concurrency marker: starts at 1, +1 per accepted
    /// transition.
    pub version: u32,
    /// One-time-key confirmation artifact, when the sender requested one.
    pub handshake: Option<Handshake>,
    /// Sender's Ed25519 signature over [`Transaction::signable_bytes`].
    pub signature: Signature,
}

/// Borrowed view of a transaction with the signature stripped — the
/// canonical signing and hashing domain.
///
/// Field order mirrors [`Transaction`] exactly; if you add a field there,
/// add it here or signatures will silently cover less than they claim.
#[derive(Serialize)]
struct SignablePayload<'a> {
    id: &'a str,
    sender: &'a Address,
    recipient: &'a Address,
    amount: &'a Amount,
    memo: &'a str,
    state: TransactionState,
    created_at: u64,
    expires_at: u64,
    updated_at: u64,
    version: u32,
    handshake: &'a Option<Handshake>,
}

impl Transaction {
    /// Returns the canonical byte representation used for signing and
    /// content hashing. Everything except the signature.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let payload = SignablePayload {
            id: &self.id,
            sender: &self.sender,
            recipient: &self.recipient,
            amount: &self.amount,
            memo: &self.memo,
            state: self.state,
            created_at: self.created_at,
            expires_at: self.expires_at,
            updated_at: self.updated_at,
            version: self.version,
            handshake: &self.handshake,
        };
        serde_json::to_vec(&payload).unwrap_or_default()
    }

    /// Content hash over all fields except the signature.
    ///
    /// This is both the Merkle leaf for block inclusion and the payload a
    /// verifier checks the signature against. Note it covers the *current*
    /// state and version, so each lifecycle step has a distinct hash.
    pub fn content_hash(&self) -> Hash {
        sha256(&self.signable_bytes())
    }

    /// Returns `true` if the transaction is still pending.
    pub fn is_pending(&self) -> bool {
        self.state == TransactionState::Pending
    }

    /// Returns `true` if the grace window has passed and the transaction
    /// is still pending.
    pub fn is_expired(&self, now: u64) -> bool {
        self.state == TransactionState::Pending && now > self.expires_at
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for signed PENDING transactions.
///
/// # Usage
///
/// ```rust,no_run
/// use ebb_protocol::config::NetworkConfig;
/// use ebb_protocol::crypto::Keypair;
/// use ebb_protocol::transaction::{Amount, TransactionBuilder};
///
/// let alice = Keypair::generate();
/// let bob = Keypair::generate();
/// let config = NetworkConfig::default();
///
/// let (tx, secret) = TransactionBuilder::new(bob.address(), Amount::from(100u64))
///     .memo("lunch")
///     .with_handshake()
///     .build(&alice, &config)
///     .unwrap();
/// // `secret` must now be delivered to Bob out of band. It is gone once
/// // dropped — the transaction only carries its hash.
/// ```
pub struct TransactionBuilder {
    recipient: Address,
    amount: Amount,
    memo: String,
    grace_period_ms: Option<u64>,
    use_handshake: bool,
    created_at: Option<u64>,
}

impl TransactionBuilder {
    /// Creates a builder for a transfer to `recipient`.
    ///
    /// The sender is taken from the keypair passed to [`build`], so a
    /// transaction can never claim an identity its signature doesn't back.
    ///
    /// [`build`]: TransactionBuilder::build
    pub fn new(recipient: Address, amount: Amount) -> Self {
        Self {
            recipient,
            amount,
            memo: String::new(),
            grace_period_ms: None,
            use_handshake: false,
            created_at: None,
        }
    }

    /// Sets the memo text.
    pub fn memo(mut self, memo: &str) -> Self {
        self.memo = memo.to_string();
        self
    }

    /// Sets an explicit grace period in milliseconds. When omitted, the
    /// configured default applies.
    pub fn grace_period_ms(mut self, ms: u64) -> Self {
        self.grace_period_ms = Some(ms);
        self
    }

    /// Requests handshake confirmation: the recipient will need the
    /// one-time secret returned by [`build`] to confirm.
    ///
    /// [`build`]: TransactionBuilder::build
    pub fn with_handshake(mut self) -> Self {
        self.use_handshake = true;
        self
    }

    /// Sets the creation timestamp explicitly (Unix milliseconds).
    ///
    /// If not called, `build()` uses the current time. Mainly for tests
    /// that need to construct already-expired transactions.
    pub fn created_at(mut self, timestamp: u64) -> Self {
        self.created_at = Some(timestamp);
        self
    }

    /// Validates, signs, and produces the PENDING transaction.
    ///
    /// Returns the transaction and, when a handshake was requested, the
    /// one-time secret. The secret exists nowhere else; losing it means
    /// the transaction can only be cancelled or expire.
    ///
    /// # Errors
    ///
    /// - [`TransactionError::InvalidGracePeriod`] — requested period
    ///   outside the configured bounds.
    /// - [`TransactionError::ZeroAmount`] — amount is zero.
    /// - [`TransactionError::SelfTransfer`] — recipient equals the
    ///   signer's address.
    /// - [`TransactionError::MemoTooLong`] — memo exceeds the limit.
    pub fn build(
        self,
        signer: &Keypair,
        config: &NetworkConfig,
    ) -> Result<(Transaction, Option<OneTimeSecret>), TransactionError> {
        let sender = signer.address();

        if self.amount.is_zero() {
            return Err(TransactionError::ZeroAmount);
        }
        if sender == self.recipient {
            return Err(TransactionError::SelfTransfer);
        }
        if self.memo.len() > MAX_MEMO_LENGTH {
            return Err(TransactionError::MemoTooLong {
                len: self.memo.len(),
                max: MAX_MEMO_LENGTH,
            });
        }

        let grace = self
            .grace_period_ms
            .unwrap_or(config.default_grace_period_ms);
        if grace < config.min_grace_period_ms || grace > config.max_grace_period_ms {
            return Err(TransactionError::InvalidGracePeriod {
                requested_ms: grace,
                min_ms: config.min_grace_period_ms,
                max_ms: config.max_grace_period_ms,
            });
        }

        let now = self.created_at.unwrap_or_else(now_millis);

        let (handshake, secret) = if self.use_handshake {
            let secret = OneTimeSecret::generate();
            let handshake = Handshake {
                handshake_id: handshake_id(secret.expose()),
                ack_id: None,
                expires_at: now + config.handshake_expiry_ms,
            };
            (Some(handshake), Some(secret))
        } else {
            (None, None)
        };

        let mut tx = Transaction {
            id: Uuid::new_v4().to_string(),
            sender,
            recipient: self.recipient,
            amount: self.amount,
            memo: self.memo,
            state: TransactionState::Pending,
            created_at: now,
            expires_at: now + grace,
            updated_at: now,
            version: 1,
            handshake,
            // Placeholder until the real signature is computed below; the
            // signable bytes never include this field.
            signature: Signature::from_bytes([0u8; 64]),
        };
        tx.signature = signer.sign(&tx.signable_bytes());

        tracing::debug!(
            tx_id = %tx.id,
            sender = %tx.sender,
            recipient = %tx.recipient,
            amount = %tx.amount,
            handshake = tx.handshake.is_some(),
            "transaction created"
        );

        Ok((tx, secret))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
