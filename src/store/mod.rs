//! Credential stores.
//!
//! This module provides:
//! - The `CredentialStore` trait shared by every store
//! - `KeePassCredentialStore`, the file-backed encrypted store (`keepass`)
//! - `InMemoryCredentialStore` for ephemeral scopes (`memory`)
//! - Main key types and side-file storage (`main_key`)
//! - Needs-save state tracking (`state`)

pub mod keepass;
pub mod main_key;
pub mod memory;
pub mod state;

use crate::credentials::{CredentialAttributes, Credentials};

pub use keepass::KeePassCredentialStore;
pub use main_key::{EncryptionSpec, EncryptionType, MainKey, MainKeyFileStorage, MainKeyStorage};
pub use memory::InMemoryCredentialStore;
pub use state::SaveState;

/// Get/set access to stored credentials.
pub trait CredentialStore: Send + Sync {
    /// Look up the credentials for `attributes`.
    fn get(&self, attributes: &CredentialAttributes) -> Option<Credentials>;

    /// Store `credentials`, or remove the entry when given `None` or
    /// credentials with neither a user name nor a password.
    fn set(&self, attributes: &CredentialAttributes, credentials: Option<Credentials>);

    fn remove(&self, attributes: &CredentialAttributes) {
        self.set(attributes, None);
    }

    /// Force the next save to write even if nothing changed.
    fn mark_dirty(&self);
}
