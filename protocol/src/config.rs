//! # Protocol Configuration & Constants
//!
//! Every magic number in EBB lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! The grace-period bounds are the DNA of the reversibility model: they
//! decide how long a payment can be pulled back. Changing them after
//! people start relying on the window is somewhere between "difficult"
//! and "career-ending", so choose wisely during devnet.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Grace Period
// ---------------------------------------------------------------------------

/// Minimum grace period: 3 minutes. Anything shorter and the "reversible"
/// in reversible payments is marketing, not a guarantee.
pub const MIN_GRACE_PERIOD_MS: u64 = 3 * 60 * 1000;

/// Maximum grace period: 24 hours. Funds locked longer than a day stop
/// being a safety window and start being a hostage situation.
pub const MAX_GRACE_PERIOD_MS: u64 = 24 * 60 * 60 * 1000;

/// Default grace period: 1 hour. Long enough to notice a typo in the
/// recipient address, short enough that merchants still get paid today.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 60 * 60 * 1000;

/// Handshake expiry: 5 minutes. The one-time secret is delivered out of
/// band; if the recipient can't produce it within 5 minutes of the window
/// opening, the handshake is considered stale.
pub const HANDSHAKE_EXPIRY_MS: u64 = 5 * 60 * 1000;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 — the only sane choice for signatures in 2024+.
/// Deterministic, side-channel-resistant when implemented correctly
/// (which ed25519-dalek is).
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Ed25519 secret keys are 32 bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Public (verifying) key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes. If yours isn't, something
/// has gone terribly wrong.
pub const SIGNATURE_LENGTH: usize = 64;

/// The hash function for transaction content, addresses, and Merkle trees.
/// SHA-256: boring, interoperable, and exactly as collision-resistant as
/// the ledger needs.
pub const PRIMARY_HASH_FUNCTION: &str = "SHA-256";

/// Hash output length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// AES-256-GCM for key-at-rest encryption. 256-bit keys, 96-bit nonces,
/// 128-bit authentication tags. The holy trinity of authenticated encryption.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce length in bytes. 96 bits is the standard and the only
/// length you should use. 12 bytes. Not 16. Not 8. Twelve.
pub const AES_NONCE_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const AES_TAG_LENGTH: usize = 16;

/// scrypt cost parameter as log2(N). N = 16384 — memory-hard enough that
/// GPU farms pay real money per password guess, cheap enough that a
/// laptop unlocks a wallet in well under a second.
pub const SCRYPT_LOG_N: u8 = 14;

/// scrypt block size parameter.
pub const SCRYPT_R: u32 = 8;

/// scrypt parallelization parameter.
pub const SCRYPT_P: u32 = 1;

/// Length of the random salt fed to scrypt, in bytes.
pub const SCRYPT_SALT_LENGTH: usize = 16;

/// One-time handshake secrets are 32 hex characters (128 bits of entropy).
pub const ONE_TIME_SECRET_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Transaction Limits
// ---------------------------------------------------------------------------

/// Maximum memo field length in bytes. Enough for a short message,
/// not enough for your novel.
pub const MAX_MEMO_LENGTH: usize = 512;

// ---------------------------------------------------------------------------
// Governance
// ---------------------------------------------------------------------------

/// Guardian votes required before a frozen transaction may be resolved.
/// Single-operator deployments (the CLI) override this down to 1.
pub const DEFAULT_REQUIRED_GUARDIAN_VOTES: u32 = 3;

// ---------------------------------------------------------------------------
// NetworkConfig
// ---------------------------------------------------------------------------

/// Errors raised by [`NetworkConfig::validate`].
///
/// These indicate a broken deployment, not a business outcome — callers
/// are allowed to abort on them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The minimum grace period exceeds the maximum.
    #[error("inverted grace period bounds: min {min_ms}ms > max {max_ms}ms")]
    InvertedGraceBounds {
        /// Configured minimum, in milliseconds.
        min_ms: u64,
        /// Configured maximum, in milliseconds.
        max_ms: u64,
    },

    /// The default grace period falls outside the [min, max] window.
    #[error("default grace period {default_ms}ms outside [{min_ms}ms, {max_ms}ms]")]
    DefaultOutOfBounds {
        /// Configured default, in milliseconds.
        default_ms: u64,
        /// Configured minimum, in milliseconds.
        min_ms: u64,
        /// Configured maximum, in milliseconds.
        max_ms: u64,
    },

    /// The handshake expiry is zero, which would make every handshake
    /// dead on arrival.
    #[error("handshake expiry must be non-zero")]
    ZeroHandshakeExpiry,

    /// The guardian quorum is zero, which would let anyone resolve a
    /// frozen transaction with no votes at all.
    #[error("required guardian votes must be at least 1")]
    ZeroGuardianQuorum,
}

/// Tunable network parameters.
///
/// Process-wide deployment choices, constructed once at startup and passed
/// by reference into the operations that need them. There is deliberately
/// no global: configuration travels explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Minimum accepted grace period in milliseconds.
    pub min_grace_period_ms: u64,
    /// Maximum accepted grace period in milliseconds.
    pub max_grace_period_ms: u64,
    /// Grace period used when the sender doesn't specify one.
    pub default_grace_period_ms: u64,
    /// How long a handshake secret remains usable, in milliseconds.
    pub handshake_expiry_ms: u64,
    /// Guardian votes required to resolve a frozen transaction.
    pub required_guardian_votes: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            min_grace_period_ms: MIN_GRACE_PERIOD_MS,
            max_grace_period_ms: MAX_GRACE_PERIOD_MS,
            default_grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            handshake_expiry_ms: HANDSHAKE_EXPIRY_MS,
            required_guardian_votes: DEFAULT_REQUIRED_GUARDIAN_VOTES,
        }
    }
}

impl NetworkConfig {
    /// Checks the configuration for internal consistency.
    ///
    /// Call this once after constructing a non-default config. A failure
    /// here means the deployment is broken, not that a user did something
    /// wrong — the surrounding binary should refuse to start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_grace_period_ms > self.max_grace_period_ms {
            return Err(ConfigError::InvertedGraceBounds {
                min_ms: self.min_grace_period_ms,
                max_ms: self.max_grace_period_ms,
            });
        }
        if self.default_grace_period_ms < self.min_grace_period_ms
            || self.default_grace_period_ms > self.max_grace_period_ms
        {
            return Err(ConfigError::DefaultOutOfBounds {
                default_ms: self.default_grace_period_ms,
                min_ms: self.min_grace_period_ms,
                max_ms: self.max_grace_period_ms,
            });
        }
        if self.handshake_expiry_ms == 0 {
            return Err(ConfigError::ZeroHandshakeExpiry);
        }
        if self.required_guardian_votes == 0 {
            return Err(ConfigError::ZeroGuardianQuorum);
        }
        Ok(())
    }
}

/// Current Unix time in milliseconds.
///
/// The single clock source for the whole crate. Business time (expiry,
/// activity stamps) always flows through here so tests can reason about
/// it with explicit timestamps instead of sleeping.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}
