//! OS keyring integration for main key file protection.
//!
//! With `EncryptionType::Keyring`, the main key file is sealed with a
//! random 32-byte wrapping key that lives in the operating system's
//! credential store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring / KDE Wallet)
//!
//! The wrapping key is stored base64-encoded as the entry's password.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::errors::{CredStoreError, Result};

/// Service name used in the OS keyring.
const SERVICE_NAME: &str = "credstore";

/// Length of the wrapping key in bytes.
const WRAPPING_KEY_LEN: usize = 32;

/// Build a keyring entry key from a main key file path.
fn entry_key(key_file: &str) -> String {
    format!("main-key:{key_file}")
}

fn entry(key_file: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(SERVICE_NAME, &entry_key(key_file))
        .map_err(|e| CredStoreError::KeyringError(format!("failed to create keyring entry: {e}")))
}

/// Fetch the wrapping key for `key_file`.
///
/// Returns `None` if no key is stored (rather than an error).
pub fn get_wrapping_key(key_file: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
    match entry(key_file)?.get_password() {
        Ok(encoded) => {
            let encoded = Zeroizing::new(encoded);
            let bytes = BASE64.decode(encoded.as_bytes()).map_err(|e| {
                CredStoreError::KeyringError(format!("stored wrapping key is not base64: {e}"))
            })?;
            Ok(Some(Zeroizing::new(bytes)))
        }
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(CredStoreError::KeyringError(format!(
            "failed to read from keyring: {e}"
        ))),
    }
}

/// Fetch the wrapping key for `key_file`, creating one if absent.
pub fn get_or_create_wrapping_key(key_file: &str) -> Result<Zeroizing<Vec<u8>>> {
    if let Some(existing) = get_wrapping_key(key_file)? {
        return Ok(existing);
    }

    let mut key = Zeroizing::new(vec![0u8; WRAPPING_KEY_LEN]);
    rand::rng().fill_bytes(&mut key);

    let encoded = Zeroizing::new(BASE64.encode(key.as_slice()));
    entry(key_file)?.set_password(&encoded).map_err(|e| {
        CredStoreError::KeyringError(format!("failed to store wrapping key in keyring: {e}"))
    })?;

    Ok(key)
}

/// Delete the wrapping key for `key_file`.
pub fn delete_wrapping_key(key_file: &str) -> Result<()> {
    match entry(key_file)?.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(CredStoreError::KeyringError(format!(
            "failed to delete from keyring: {e}"
        ))),
    }
}
