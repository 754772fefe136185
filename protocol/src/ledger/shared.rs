//! Concurrency wrapper for multi-threaded embeddings.
//!
//! The core ledger is synchronous and single-writer by design: operations
//! like [`LedgerState::add_pending_transaction`] and
//! [`LedgerState::apply_state_change`] are check-then-act sequences over
//! several maps and must be atomic relative to each other. There are no
//! suspension points and no external calls inside the critical sections —
//! hashing and signing are local and fast — so a plain reader-writer lock
//! is the whole concurrency story.
//!
//! The contract:
//!
//! - exactly one writer per ledger instance; writers exclude everything
//! - reads may run concurrently with each other, never with a writer,
//!   so no caller can observe a half-applied balance update
//! - no lock is held across anything that blocks

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

use super::state::LedgerState;

/// A [`LedgerState`] behind an `Arc<RwLock>`, cheap to clone and hand to
/// threads.
#[derive(Clone, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<LedgerState>>,
}

impl SharedLedger {
    /// Wraps a ledger for shared use.
    pub fn new(ledger: LedgerState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Acquires shared read access. Any number of readers may hold this
    /// concurrently.
    pub fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.inner.read()
    }

    /// Acquires exclusive write access. Hold it for the whole
    /// check-then-act sequence of a mutation, not per inner call.
    pub fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.inner.write()
    }

    /// Consumes the wrapper and returns the ledger, if this is the last
    /// handle.
    pub fn try_unwrap(self) -> Result<LedgerState, Self> {
        Arc::try_unwrap(self.inner)
            .map(|lock| lock.into_inner())
            .map_err(|inner| Self { inner })
    }
}
