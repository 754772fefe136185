//! # Address Book
//!
//! Named contacts, so humans can say "pay bob" instead of pasting 64 hex
//! characters and hoping. Purely a convenience layer: the ledger itself
//! only ever sees [`Address`] values, and every address that enters the
//! book has already survived [`Address::from_hex`] validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::now_millis;
use crate::crypto::keys::Address;

/// Errors raised by address-book operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContactError {
    /// A contact with this name already exists.
    #[error("a contact named '{0}' already exists")]
    DuplicateName(String),

    /// No contact with this name exists.
    #[error("no contact named '{0}'")]
    UnknownContact(String),
}

/// A single named contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Display name, unique within the book.
    pub name: String,
    /// The contact's ledger address.
    pub address: Address,
    /// Optional note ("landlord", "do not pay twice", ...).
    pub memo: Option<String>,
    /// When the contact was added, Unix milliseconds.
    pub created_at: u64,
}

/// The address book: an ordered list of contacts with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBook {
    contacts: Vec<Contact>,
}

impl AddressBook {
    /// An empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a contact. Names are unique; addresses are not — the same
    /// counterparty may legitimately appear under several names.
    pub fn add(
        &mut self,
        name: &str,
        address: Address,
        memo: Option<String>,
    ) -> Result<(), ContactError> {
        if self.contacts.iter().any(|c| c.name == name) {
            return Err(ContactError::DuplicateName(name.to_string()));
        }
        self.contacts.push(Contact {
            name: name.to_string(),
            address,
            memo,
            created_at: now_millis(),
        });
        Ok(())
    }

    /// Removes and returns the contact with the given name.
    pub fn remove(&mut self, name: &str) -> Result<Contact, ContactError> {
        let position = self
            .contacts
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| ContactError::UnknownContact(name.to_string()))?;
        Ok(self.contacts.remove(position))
    }

    /// Looks a contact up by name.
    pub fn find_by_name(&self, name: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.name == name)
    }

    /// Returns the first contact registered under an address, if any.
    pub fn find_by_address(&self, address: &Address) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.address == *address)
    }

    /// All contacts, in insertion order.
    pub fn all(&self) -> &[Contact] {
        &self.contacts
    }

    /// Number of contacts.
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Returns `true` if the book is empty.
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}
