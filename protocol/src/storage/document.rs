//! The persisted state document.
//!
//! A single JSON file holding everything that must survive a restart:
//! wallet key material (optionally password-encrypted), the active-wallet
//! index, the full ledger (blocks verbatim, accounts, both transaction
//! maps, disputes), and the address book. Amounts travel as decimal
//! strings and hashes as hex — the serde implementations on the core
//! types guarantee exact round-trips with no floating-point intermediary
//! anywhere.
//!
//! ## Schema versioning
//!
//! The document carries an explicit `schema_version`. Loading an older
//! document walks it forward one migration step per version before
//! deserializing; loading a *newer* document fails with
//! [`StorageError::UnsupportedVersion`] rather than guessing. There is
//! exactly one place to add a migration: the match in [`migrate`]. Ad hoc
//! field patching elsewhere is how state files die.
//!
//! ## Atomicity
//!
//! Saves write to a sibling temp file and rename into place, so a crash
//! mid-write leaves the previous document intact. The file is chmod 0600
//! on Unix — it can contain plaintext key material.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::contacts::AddressBook;
use crate::ledger::LedgerState;
use crate::wallet::WalletExport;

/// The schema version this build reads and writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Errors raised while loading or saving the state document.
///
/// A parse or version failure means the persisted state is corrupt or
/// from the future — a broken environment, not a business outcome. The
/// surrounding binary should report it and refuse to run, not limp on
/// with a fresh ledger over someone's funds.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem trouble.
    #[error("state file i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The file exists but is not a valid document.
    #[error("state file is corrupt: {0}")]
    Parse(#[from] serde_json::Error),

    /// The file has no readable `schema_version` field.
    #[error("state file has no schema_version")]
    MissingSchemaVersion,

    /// The file was written by a newer build.
    #[error("unsupported state schema version {version} (this build reads up to {CURRENT_SCHEMA_VERSION})")]
    UnsupportedVersion {
        /// The version found in the file.
        version: u32,
    },
}

/// Everything the process persists, as one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDocument {
    /// Document schema version.
    pub schema_version: u32,
    /// Every known wallet, key material included.
    pub wallets: Vec<WalletExport>,
    /// Index into `wallets` of the currently active one.
    pub active_wallet: Option<usize>,
    /// The full ledger aggregate.
    pub ledger: LedgerState,
    /// Named contacts.
    pub contacts: AddressBook,
}

impl StateDocument {
    /// A brand-new document: genesis ledger, no wallets, no contacts.
    pub fn fresh() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            wallets: Vec::new(),
            active_wallet: None,
            ledger: LedgerState::new(),
            contacts: AddressBook::new(),
        }
    }

    /// Loads the document from `path`, or returns a fresh one if the file
    /// doesn't exist yet.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no state file; starting fresh");
            return Ok(Self::fresh());
        }

        let raw = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let document = migrate(value)?;
        tracing::debug!(
            path = %path.display(),
            wallets = document.wallets.len(),
            height = document.ledger.block_height(),
            "state loaded"
        );
        Ok(document)
    }

    /// Writes the document to `path` atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &json)?;

        // The document can carry plaintext secret keys.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp_path, path)?;
        tracing::debug!(path = %path.display(), bytes = json.len(), "state saved");
        Ok(())
    }
}

impl Default for StateDocument {
    fn default() -> Self {
        Self::fresh()
    }
}

/// Walks a raw document forward to the current schema, one version step
/// at a time, then deserializes it.
///
/// To introduce schema version N+1: bump [`CURRENT_SCHEMA_VERSION`],
/// write a `migrate_vN_to_vN1(value) -> value` function, and add its arm
/// here. Each step rewrites the JSON value and bumps `schema_version`, so
/// a v1 file loaded by a v3 build passes through both steps in order.
fn migrate(value: serde_json::Value) -> Result<StateDocument, StorageError> {
    let version = value
        .get("schema_version")
        .and_then(|v| v.as_u64())
        .ok_or(StorageError::MissingSchemaVersion)? as u32;

    match version {
        CURRENT_SCHEMA_VERSION => Ok(serde_json::from_value(value)?),
        newer if newer > CURRENT_SCHEMA_VERSION => {
            Err(StorageError::UnsupportedVersion { version: newer })
        }
        // No released schema below v1 exists; anything else is corrupt.
        _ => Err(StorageError::UnsupportedVersion { version }),
    }
}
