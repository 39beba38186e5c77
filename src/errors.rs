use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in the credential store.
#[derive(Debug, Error)]
pub enum CredStoreError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Main key errors ---
    #[error("{}", incorrect_main_password_message(.file_missing))]
    IncorrectMainPassword {
        /// `true` when the vault exists but its main key file is gone.
        file_missing: bool,
    },

    #[error("Main key error: {0}")]
    MainKeyError(String),

    // --- Database file errors ---
    #[error("Credential database not found at {}", .0.display())]
    VaultNotFound(PathBuf),

    #[error("Not a credential database: {0}")]
    InvalidVaultFormat(String),

    #[error("Integrity check failed; the credential database was modified or corrupted")]
    HmacMismatch,

    #[error("HMAC error: {0}")]
    HmacError(String),

    #[error("No credentials stored for '{0}'")]
    CredentialNotFound(String),

    // --- Environment ---
    #[error("Keyring error: {0}")]
    KeyringError(String),

    #[error("Config file error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

fn incorrect_main_password_message(file_missing: &bool) -> &'static str {
    if *file_missing {
        "Main password file is missing; the credential database cannot be opened"
    } else {
        "Main password is incorrect; the credential database cannot be decrypted"
    }
}

impl CredStoreError {
    /// Returns `true` for the errors that mean "the vault exists but the
    /// credentials in it are unavailable", which need user action.
    pub fn is_incorrect_main_password(&self) -> bool {
        matches!(self, Self::IncorrectMainPassword { .. })
    }
}

/// Convenience type alias for credential store results.
pub type Result<T> = std::result::Result<T, CredStoreError>;
