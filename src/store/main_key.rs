//! Main key and its side-file storage.
//!
//! The main key unlocks the vault but is stored apart from it, in a
//! small TOML file:
//!
//! ```toml
//! encryption = "built_in"
//! is_auto_generated = true
//! value = "<base64 of the protected key bytes>"
//! ```
//!
//! `encryption` says how `value` is protected at rest.  Storage is a pure
//! byte-blob layer: it never derives vault keys, it only loads and saves
//! `MainKey`s.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::{STANDARD as BASE64, STANDARD_NO_PAD as BASE64_NO_PAD};
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{decrypt, encrypt, hkdf_derive, VaultKey};
use crate::errors::{CredStoreError, Result};
use crate::vault::format::write_atomic;

/// Number of random bytes in a generated main key (before base64).
pub const MAIN_KEY_RANDOM_LEN: usize = 512;

/// Seed for the built-in key-file protection key.
///
/// Anyone with this crate can derive it; `BuiltIn` only keeps the key
/// file from being readable at a glance.
const BUILT_IN_SEED: &[u8] = b"credstore built-in main key protection seed v1";

const BUILT_IN_INFO: &[u8] = b"credstore-main-key-file";

// ---------------------------------------------------------------------------
// EncryptionSpec
// ---------------------------------------------------------------------------

/// How the main key is protected inside its file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionType {
    /// AES-256-GCM under a key compiled into the crate (obfuscation only).
    #[default]
    BuiltIn,
    /// AES-256-GCM under a random key kept in the OS keyring.
    Keyring,
}

impl std::fmt::Display for EncryptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BuiltIn => f.write_str("built_in"),
            Self::Keyring => f.write_str("keyring"),
        }
    }
}

impl std::str::FromStr for EncryptionType {
    type Err = CredStoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "built_in" | "built-in" => Ok(Self::BuiltIn),
            "keyring" => Ok(Self::Keyring),
            other => Err(CredStoreError::ConfigError(format!(
                "unknown main key encryption '{other}', expected: built_in, keyring"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncryptionSpec {
    pub encryption_type: EncryptionType,
}

impl EncryptionSpec {
    pub fn new(encryption_type: EncryptionType) -> Self {
        Self { encryption_type }
    }
}

// ---------------------------------------------------------------------------
// MainKey
// ---------------------------------------------------------------------------

/// Raw main key bytes plus where they came from.
///
/// The bytes are wiped by `derive_vault_key` and again on drop.
pub struct MainKey {
    value: Vec<u8>,
    is_auto_generated: bool,
    encryption_spec: EncryptionSpec,
}

impl MainKey {
    pub fn new(value: Vec<u8>, is_auto_generated: bool, encryption_spec: EncryptionSpec) -> Self {
        Self {
            value,
            is_auto_generated,
            encryption_spec,
        }
    }

    /// A fresh random key: 512 bytes from the OS RNG, base64 without
    /// padding.  The ASCII of the encoding is the key value.
    pub fn generate(encryption_spec: EncryptionSpec) -> Self {
        let mut random = Zeroizing::new(vec![0u8; MAIN_KEY_RANDOM_LEN]);
        rand::rng().fill_bytes(&mut random);
        let value = BASE64_NO_PAD.encode(random.as_slice()).into_bytes();
        Self::new(value, true, encryption_spec)
    }

    /// A key chosen by the user.
    pub fn from_password(password: &str, encryption_spec: EncryptionSpec) -> Self {
        Self::new(password.as_bytes().to_vec(), false, encryption_spec)
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn is_auto_generated(&self) -> bool {
        self.is_auto_generated
    }

    pub fn encryption_spec(&self) -> EncryptionSpec {
        self.encryption_spec
    }

    /// `true` once the bytes have been wiped.
    pub fn is_cleared(&self) -> bool {
        self.value.iter().all(|b| *b == 0)
    }

    /// Build the vault key and wipe the raw bytes in the same step.
    pub fn derive_vault_key(&mut self) -> VaultKey {
        VaultKey::from_secret(self.value.as_mut_slice())
    }
}

impl Drop for MainKey {
    fn drop(&mut self) {
        self.value.as_mut_slice().zeroize();
    }
}

impl std::fmt::Debug for MainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainKey")
            .field("len", &self.value.len())
            .field("is_auto_generated", &self.is_auto_generated)
            .field("encryption_spec", &self.encryption_spec)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Persists the main key independently of the vault file.
pub trait MainKeyStorage: Send + Sync {
    /// The stored key, or `None` if none has been provisioned yet.
    fn load(&self) -> Result<Option<MainKey>>;

    /// Store `key`, or delete the stored key when given `None`.
    fn save(&self, key: Option<&MainKey>) -> Result<()>;

    /// Where the key lives, for display.
    fn path(&self) -> &Path;
}

#[derive(Debug, Serialize, Deserialize)]
struct MainKeyFile {
    encryption: EncryptionType,
    is_auto_generated: bool,
    value: String,
}

/// File-backed `MainKeyStorage`.
#[derive(Debug, Clone)]
pub struct MainKeyFileStorage {
    path: PathBuf,
}

impl MainKeyFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_file(&self) -> Result<Option<MainKeyFile>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => Zeroizing::new(c),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: MainKeyFile = toml::from_str(&contents).map_err(|e| {
            CredStoreError::MainKeyError(format!("cannot parse {}: {e}", self.path.display()))
        })?;
        Ok(Some(file))
    }

    fn protection_key(&self, encryption: EncryptionType, create: bool) -> Result<Zeroizing<Vec<u8>>> {
        match encryption {
            EncryptionType::BuiltIn => {
                Ok(Zeroizing::new(hkdf_derive(BUILT_IN_SEED, BUILT_IN_INFO)?.to_vec()))
            }
            EncryptionType::Keyring => keyring_wrapping_key(&self.path, create),
        }
    }
}

impl MainKeyStorage for MainKeyFileStorage {
    fn load(&self) -> Result<Option<MainKey>> {
        let Some(file) = self.read_file()? else {
            debug!(path = %self.path.display(), "no main key file");
            return Ok(None);
        };

        let sealed = BASE64
            .decode(file.value.as_bytes())
            .map_err(|e| CredStoreError::MainKeyError(format!("invalid base64 value: {e}")))?;
        let key = self.protection_key(file.encryption, false)?;
        let value = decrypt(&key, &sealed).map_err(|_| {
            CredStoreError::MainKeyError(format!(
                "cannot unprotect main key in {}",
                self.path.display()
            ))
        })?;

        Ok(Some(MainKey::new(
            value,
            file.is_auto_generated,
            EncryptionSpec::new(file.encryption),
        )))
    }

    fn save(&self, key: Option<&MainKey>) -> Result<()> {
        let Some(main_key) = key else {
            return self.delete();
        };
        if main_key.value().is_empty() || main_key.is_cleared() {
            return Err(CredStoreError::MainKeyError(
                "refusing to store an empty or already consumed main key".into(),
            ));
        }

        let encryption = main_key.encryption_spec().encryption_type;
        let protection = self.protection_key(encryption, true)?;
        let sealed = encrypt(&protection, main_key.value())?;

        let file = MainKeyFile {
            encryption,
            is_auto_generated: main_key.is_auto_generated(),
            value: BASE64.encode(sealed),
        };
        let contents = toml::to_string(&file)
            .map_err(|e| CredStoreError::SerializationError(format!("main key file: {e}")))?;
        write_atomic(&self.path, contents.as_bytes())?;

        debug!(path = %self.path.display(), %encryption, "saved main key");
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl MainKeyFileStorage {
    fn delete(&self) -> Result<()> {
        // Drop the keyring wrapping key too, if this file used one.
        match self.read_file() {
            Ok(Some(file)) if file.encryption == EncryptionType::Keyring => {
                if let Err(e) = delete_keyring_wrapping_key(&self.path) {
                    warn!(error = %e, "could not remove main key wrapping key from keyring");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "main key file unreadable, deleting anyway"),
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "deleted main key");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(feature = "keyring-store")]
fn keyring_wrapping_key(path: &Path, create: bool) -> Result<Zeroizing<Vec<u8>>> {
    let id = path.to_string_lossy();
    if create {
        crate::keyring::get_or_create_wrapping_key(&id)
    } else {
        crate::keyring::get_wrapping_key(&id)?.ok_or_else(|| {
            CredStoreError::MainKeyError("main key wrapping key missing from OS keyring".into())
        })
    }
}

#[cfg(not(feature = "keyring-store"))]
fn keyring_wrapping_key(_path: &Path, _create: bool) -> Result<Zeroizing<Vec<u8>>> {
    Err(CredStoreError::MainKeyError(
        "keyring protection requires the `keyring-store` feature".into(),
    ))
}

#[cfg(feature = "keyring-store")]
fn delete_keyring_wrapping_key(path: &Path) -> Result<()> {
    crate::keyring::delete_wrapping_key(&path.to_string_lossy())
}

#[cfg(not(feature = "keyring-store"))]
fn delete_keyring_wrapping_key(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn generated_key_is_unpadded_base64_of_512_bytes() {
        let key = MainKey::generate(EncryptionSpec::default());
        assert!(key.is_auto_generated());
        // 512 bytes -> ceil(512 * 4 / 3) = 683 chars without padding.
        assert_eq!(key.value().len(), 683);
        assert!(!key.value().contains(&b'='));
        let decoded = BASE64_NO_PAD.decode(key.value()).unwrap();
        assert_eq!(decoded.len(), MAIN_KEY_RANDOM_LEN);
    }

    #[test]
    fn generated_keys_differ() {
        let a = MainKey::generate(EncryptionSpec::default());
        let b = MainKey::generate(EncryptionSpec::default());
        assert_ne!(a.value(), b.value());
    }

    #[test]
    fn derive_vault_key_clears_main_key() {
        let mut key = MainKey::from_password("pw-for-test", EncryptionSpec::default());
        let _vault_key = key.derive_vault_key();
        assert!(key.is_cleared());
        assert_eq!(key.value().len(), "pw-for-test".len());
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = MainKeyFileStorage::new(dir.path().join("c.pwd"));
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = MainKeyFileStorage::new(dir.path().join("c.pwd"));

        let key = MainKey::generate(EncryptionSpec::default());
        storage.save(Some(&key)).unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.value(), key.value());
        assert!(loaded.is_auto_generated());
        assert_eq!(loaded.encryption_spec(), EncryptionSpec::default());
    }

    #[test]
    fn key_file_does_not_contain_raw_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.pwd");
        let storage = MainKeyFileStorage::new(&path);

        storage
            .save(Some(&MainKey::from_password(
                "very-recognisable-password",
                EncryptionSpec::default(),
            )))
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("encryption = \"built_in\""));
        assert!(contents.contains("is_auto_generated = false"));
        assert!(!contents.contains("very-recognisable-password"));
    }

    #[test]
    fn save_none_deletes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.pwd");
        let storage = MainKeyFileStorage::new(&path);

        storage
            .save(Some(&MainKey::generate(EncryptionSpec::default())))
            .unwrap();
        assert!(path.exists());

        storage.save(None).unwrap();
        assert!(!path.exists());

        // Deleting again is fine.
        storage.save(None).unwrap();
    }

    #[test]
    fn consumed_key_is_not_stored() {
        let dir = TempDir::new().unwrap();
        let storage = MainKeyFileStorage::new(dir.path().join("c.pwd"));

        let mut key = MainKey::from_password("pw", EncryptionSpec::default());
        let _ = key.derive_vault_key();
        assert!(storage.save(Some(&key)).is_err());
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.pwd");
        fs::write(&path, "not = [valid").unwrap();
        assert!(MainKeyFileStorage::new(&path).load().is_err());
    }

    #[test]
    fn encryption_type_parses() {
        assert_eq!(
            "built_in".parse::<EncryptionType>().unwrap(),
            EncryptionType::BuiltIn
        );
        assert_eq!(
            "keyring".parse::<EncryptionType>().unwrap(),
            EncryptionType::Keyring
        );
        assert!("pgp".parse::<EncryptionType>().is_err());
    }
}
