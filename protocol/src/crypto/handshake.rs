//! # Handshake Secrets
//!
//! Optional second factor for confirming a transfer: the sender generates
//! a one-time secret and conveys it to the recipient out of band. The
//! transaction records only `SHA-256("handshake:" + secret)` — never the
//! secret itself — so possession of the ledger proves nothing.
//!
//! On confirmation, the recipient presents the secret; the ledger checks
//! it against the stored handshake id and records an acknowledgment hash
//! that also binds the recipient's address. The domain prefixes
//! (`handshake:` / `ack:`) keep the two derivations from ever colliding.
//!
//! Delivery of the secret is explicitly NOT this module's problem — see
//! [`crate::wallet::SecretChannel`].

use rand::RngCore;
use std::fmt;

use super::hash::{sha256, Hash};
use super::keys::Address;
use crate::config::ONE_TIME_SECRET_LENGTH;

/// A freshly generated one-time handshake secret.
///
/// Lives exactly as long as it takes to hand it to the out-of-band
/// delivery channel. Debug output is redacted so the secret can't leak
/// through logs by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct OneTimeSecret(String);

impl OneTimeSecret {
    /// Generates a fresh secret: 32 hex characters from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; ONE_TIME_SECRET_LENGTH / 2];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// The secret as a string, for out-of-band delivery.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OneTimeSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OneTimeSecret(****)")
    }
}

/// Derives the handshake id recorded on the transaction:
/// `SHA-256("handshake:" + secret)`.
pub fn handshake_id(secret: &str) -> Hash {
    sha256(format!("handshake:{}", secret).as_bytes())
}

/// Derives the acknowledgment id recorded on confirmation:
/// `SHA-256("ack:" + secret + ":" + recipient_hex)`.
///
/// Binding the recipient address means an ack can't be replayed against
/// a different transaction to a different party.
pub fn ack_id(secret: &str, recipient: &Address) -> Hash {
    sha256(format!("ack:{}:{}", secret, recipient.to_hex()).as_bytes())
}

/// Checks a completed handshake: both the handshake id and the ack id
/// must match the derivations for the given secret and recipient.
pub fn verify_handshake(
    stored_handshake_id: &Hash,
    stored_ack_id: &Hash,
    secret: &str,
    recipient: &Address,
) -> bool {
    *stored_handshake_id == handshake_id(secret) && *stored_ack_id == ack_id(secret, recipient)
}
