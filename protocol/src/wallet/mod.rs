//! # Wallet Module
//!
//! The user-facing façade: a key identity plus the ledger operations that
//! identity is allowed to perform. The wallet is deliberately thin — it
//! enforces "only the sender cancels, only the recipient confirms" by
//! construction (it always passes its own address as the acting party)
//! and leaves every invariant to the state machine and the ledger.
//!
//! ## One-time secrets
//!
//! A handshake send generates a one-time secret that the recipient will
//! need to confirm. This layer NEVER retains it: the secret is handed to
//! the [`SecretChannel`] collaborator (if one is wired up) and dropped.
//! Delivering it to the recipient is explicitly somebody else's job — a
//! real deployment plugs in a secure out-of-band channel here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{now_millis, NetworkConfig};
use crate::crypto::encryption::{decrypt_secret_key, encrypt_secret_key, EncryptedKey, EncryptionError};
use crate::crypto::handshake::OneTimeSecret;
use crate::crypto::keys::{Address, KeyError, Keypair};
use crate::ledger::{AccountBalance, LedgerError, LedgerState};
use crate::transaction::lifecycle;
use crate::transaction::types::Amount;
use crate::transaction::{Transaction, TransactionBuilder};

/// Current wallet-export schema version.
pub const WALLET_EXPORT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by wallet import/export.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The export was produced by a newer (or unknown) schema.
    #[error("unsupported wallet export version {version}")]
    UnsupportedExportVersion {
        /// The version found in the export.
        version: u32,
    },

    /// The export carries an encrypted key but no password was supplied.
    #[error("password required to decrypt this wallet")]
    PasswordRequired,

    /// Key material could not be decrypted.
    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    /// Key material was malformed.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The decrypted key does not derive the address the export claims.
    #[error("secret key does not match the exported address")]
    AddressMismatch,
}

// ---------------------------------------------------------------------------
// SecretChannel
// ---------------------------------------------------------------------------

/// Out-of-band delivery for one-time handshake secrets.
///
/// The core generates the secret and forgets it; whatever implements this
/// trait owns getting it to the recipient securely. There is no default
/// in-band mechanism, on purpose — shipping the secret next to the
/// transaction would make the handshake theater.
pub trait SecretChannel {
    /// Delivers the one-time secret for a freshly created transaction.
    fn deliver(&self, transaction_id: &str, secret: &OneTimeSecret);
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// A key identity bound to ledger operations.
#[derive(Debug, Clone)]
pub struct Wallet {
    keypair: Keypair,
    /// Optional display name.
    pub name: Option<String>,
    /// When this wallet was created, Unix milliseconds.
    pub created_at: u64,
}

/// Options for [`Wallet::send`].
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Memo to attach.
    pub memo: Option<String>,
    /// Grace period override; the configured default applies when unset.
    pub grace_period_ms: Option<u64>,
    /// Require the recipient to present a one-time secret to confirm.
    pub use_handshake: bool,
}

/// Whether a history entry was sent or received by this wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Sent,
    Received,
}

/// A transaction annotated from this wallet's point of view.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// The transaction record.
    pub transaction: Transaction,
    /// Sent or received, relative to this wallet.
    pub direction: Direction,
    /// The other party.
    pub counterparty: Address,
}

impl Wallet {
    /// Creates a wallet with a freshly generated keypair.
    pub fn create(name: Option<String>) -> Self {
        let wallet = Self {
            keypair: Keypair::generate(),
            name,
            created_at: now_millis(),
        };
        tracing::info!(address = %wallet.address(), "wallet created");
        wallet
    }

    /// Wraps an existing keypair.
    pub fn from_keypair(keypair: Keypair, name: Option<String>, created_at: u64) -> Self {
        Self {
            keypair,
            name,
            created_at,
        }
    }

    /// This wallet's ledger address.
    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    /// The underlying keypair. Needed by the storage layer to persist
    /// key material; everyone else should not touch this.
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    // -- queries -----------------------------------------------------------

    /// Balance breakdown for this wallet.
    pub fn balance(&self, ledger: &LedgerState) -> AccountBalance {
        ledger.balance(&self.address())
    }

    /// Returns `true` if the available balance covers `amount`.
    pub fn has_sufficient_balance(&self, ledger: &LedgerState, amount: &Amount) -> bool {
        self.balance(ledger).available >= *amount
    }

    /// In-flight transactions involving this wallet.
    pub fn pending(&self, ledger: &LedgerState) -> Vec<HistoryEntry> {
        let address = self.address();
        ledger
            .pending_transactions_for(&address)
            .into_iter()
            .map(|tx| self.annotate(tx.clone()))
            .collect()
    }

    /// Full transaction history for this wallet, newest first.
    pub fn history(&self, ledger: &LedgerState) -> Vec<HistoryEntry> {
        let address = self.address();
        ledger
            .transactions_for(&address)
            .into_iter()
            .map(|tx| self.annotate(tx.clone()))
            .collect()
    }

    fn annotate(&self, transaction: Transaction) -> HistoryEntry {
        let mine = self.address();
        let (direction, counterparty) = if transaction.sender == mine {
            (Direction::Sent, transaction.recipient)
        } else {
            (Direction::Received, transaction.sender)
        };
        HistoryEntry {
            transaction,
            direction,
            counterparty,
        }
    }

    // -- operations --------------------------------------------------------

    /// Sends funds to `recipient` through the pending window.
    ///
    /// Fails fast on the local balance check before building anything —
    /// no point signing a transaction the ledger is guaranteed to refuse.
    /// When the options request a handshake, the one-time secret goes to
    /// `secret_channel` and is then dropped; it is never part of the
    /// return value.
    pub fn send(
        &self,
        ledger: &mut LedgerState,
        recipient: Address,
        amount: Amount,
        options: SendOptions,
        config: &NetworkConfig,
        secret_channel: Option<&dyn SecretChannel>,
    ) -> Result<Transaction, LedgerError> {
        if !self.has_sufficient_balance(ledger, &amount) {
            return Err(LedgerError::InsufficientBalance {
                available: self.balance(ledger).available,
                requested: amount,
            });
        }

        let mut builder = TransactionBuilder::new(recipient, amount);
        if let Some(ref memo) = options.memo {
            builder = builder.memo(memo);
        }
        if let Some(ms) = options.grace_period_ms {
            builder = builder.grace_period_ms(ms);
        }
        if options.use_handshake {
            builder = builder.with_handshake();
        }

        let (tx, secret) = builder.build(&self.keypair, config)?;

        ledger.add_pending_transaction(tx.clone())?;

        if let Some(secret) = secret {
            if let Some(channel) = secret_channel {
                channel.deliver(&tx.id, &secret);
            } else {
                tracing::warn!(
                    tx_id = %tx.id,
                    "handshake secret generated with no delivery channel; \
                     the recipient will not be able to confirm"
                );
            }
            // `secret` drops here. It exists nowhere else.
        }

        Ok(tx)
    }

    /// Confirms a transaction addressed to this wallet.
    pub fn confirm_received(
        &self,
        ledger: &mut LedgerState,
        tx_id: &str,
        secret: Option<&str>,
    ) -> Result<Transaction, LedgerError> {
        let tx = ledger
            .transaction(tx_id)
            .cloned()
            .ok_or_else(|| LedgerError::TransactionNotFound { id: tx_id.into() })?;

        let confirmed = lifecycle::confirm(&tx, &self.address(), secret)?;
        ledger.apply_state_change(&tx, confirmed.clone());
        Ok(confirmed)
    }

    /// Cancels a transaction this wallet sent, while it is still pending.
    pub fn cancel_sent(
        &self,
        ledger: &mut LedgerState,
        tx_id: &str,
    ) -> Result<Transaction, LedgerError> {
        let tx = ledger
            .transaction(tx_id)
            .cloned()
            .ok_or_else(|| LedgerError::TransactionNotFound { id: tx_id.into() })?;

        let cancelled = lifecycle::cancel(&tx, &self.address())?;
        ledger.apply_state_change(&tx, cancelled.clone());
        Ok(cancelled)
    }

    // -- export / import ---------------------------------------------------

    /// Exports this wallet for backup, optionally encrypting the secret
    /// key under a password.
    pub fn export(&self, password: Option<&str>) -> Result<WalletExport, WalletError> {
        let secret = self.keypair.secret_key_bytes();
        let secret_key = match password {
            Some(password) => {
                StoredSecretKey::Encrypted(encrypt_secret_key(&secret, password)?)
            }
            None => StoredSecretKey::Plain {
                hex: hex::encode(secret),
            },
        };

        Ok(WalletExport {
            version: WALLET_EXPORT_VERSION,
            name: self.name.clone(),
            address: self.address(),
            secret_key,
            created_at: self.created_at,
        })
    }

    /// Reconstructs a wallet from an export.
    ///
    /// Rejects unknown versions outright, requires the password for
    /// encrypted exports, and cross-checks that the recovered key really
    /// derives the exported address — a mismatch means the export was
    /// assembled from mismatched pieces.
    pub fn import(export: &WalletExport, password: Option<&str>) -> Result<Self, WalletError> {
        if export.version != WALLET_EXPORT_VERSION {
            return Err(WalletError::UnsupportedExportVersion {
                version: export.version,
            });
        }

        let keypair = match &export.secret_key {
            StoredSecretKey::Plain { hex } => Keypair::from_hex(hex)?,
            StoredSecretKey::Encrypted(encrypted) => {
                let password = password.ok_or(WalletError::PasswordRequired)?;
                let bytes = decrypt_secret_key(encrypted, password)?;
                let arr: [u8; 32] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| KeyError::InvalidSecretKey)?;
                Keypair::from_secret_key_bytes(&arr)
            }
        };

        if keypair.address() != export.address {
            return Err(WalletError::AddressMismatch);
        }

        Ok(Self::from_keypair(
            keypair,
            export.name.clone(),
            export.created_at,
        ))
    }
}

// ---------------------------------------------------------------------------
// WalletExport
// ---------------------------------------------------------------------------

/// Secret key material as stored at rest: plaintext hex or a
/// password-encrypted blob. Tagged so the persisted document is
/// self-describing — no duck typing on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredSecretKey {
    /// Unencrypted hex. Fine for devnets, a felony waiting to happen
    /// anywhere else.
    Plain {
        /// 64 hex characters of Ed25519 seed.
        hex: String,
    },
    /// scrypt + AES-256-GCM encrypted key material.
    Encrypted(EncryptedKey),
}

/// Versioned wallet backup format. This is the unit the storage layer
/// persists per wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletExport {
    /// Export schema version.
    pub version: u32,
    /// Display name, if any.
    pub name: Option<String>,
    /// The wallet's address, for display and cross-checking.
    pub address: Address,
    /// The secret key, plain or encrypted.
    pub secret_key: StoredSecretKey,
    /// Original creation timestamp, Unix milliseconds.
    pub created_at: u64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
