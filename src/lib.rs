pub mod cli;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod errors;
pub mod logging;
pub mod store;
pub mod vault;

#[cfg(feature = "keyring-store")]
pub mod keyring;

pub use credentials::{generate_service_name, CredentialAttributes, Credentials};
pub use errors::{CredStoreError, Result};
pub use store::{
    CredentialStore, EncryptionSpec, EncryptionType, InMemoryCredentialStore,
    KeePassCredentialStore, MainKey, MainKeyFileStorage, MainKeyStorage,
};
