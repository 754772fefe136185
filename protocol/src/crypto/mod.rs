//! # Cryptographic Primitives for EBB
//!
//! This module is the foundation of everything security-related in the
//! ledger. Every signing operation, every hash, every encrypted key blob
//! flows through here.
//!
//! We deliberately chose boring, well-audited cryptography:
//!
//! - **Ed25519** for signatures — fast, deterministic, and nobody has broken it.
//! - **SHA-256** for content hashing — the lingua franca of ledgers.
//! - **AES-256-GCM + scrypt** for key-at-rest encryption — authenticated,
//!   and memory-hard against password guessing.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. Everything here is a thin, type-safe wrapper around audited
//! implementations. If you're tempted to optimize these functions, please
//! reconsider. Then reconsider again. Then go read about timing attacks
//! and come back when you've lost the urge.

pub mod encryption;
pub mod handshake;
pub mod hash;
pub mod keys;

// Re-export the things people actually need so they don't have to memorize
// our module hierarchy. Life's too short for five levels of `use` statements.
pub use encryption::{decrypt_secret_key, encrypt_secret_key, EncryptedKey};
pub use handshake::{ack_id, handshake_id, OneTimeSecret};
pub use hash::{hash_structured, merkle_root, sha256, Hash};
pub use keys::{Address, Keypair, Signature};
