//! Vault key handling.
//!
//! The raw main key is never used as a cipher key.  It is first folded
//! into a 32-byte composite `VaultKey` (SHA-256), and the raw bytes are
//! wiped in the same step.  When the codec needs to encrypt or decrypt,
//! the composite key is stretched with Argon2id and split with
//! HKDF-SHA256 into independent cipher and HMAC sub-keys.

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{CredStoreError, Result};

/// Length of derived keys (256 bits).
pub const KEY_LEN: usize = 32;

/// HKDF context for the vault payload cipher key.
const CIPHER_INFO: &[u8] = b"credstore-vault-cipher";

/// HKDF context for the vault integrity key.
const HMAC_INFO: &[u8] = b"credstore-vault-hmac";

/// Composite key the vault codec is keyed with.
///
/// Holds `SHA-256(main key bytes)`; zeroed on drop.
#[derive(Clone)]
pub struct VaultKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl VaultKey {
    /// Hash `secret` into a vault key and overwrite `secret` with zeros.
    ///
    /// Every path that turns main-key material into a vault key goes
    /// through here, so the raw bytes never outlive this call.
    pub fn from_secret(secret: &mut [u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(&*secret);
        secret.zeroize();

        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        bytes.copy_from_slice(&hasher.finalize());
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey(..)")
    }
}

/// The two keys the codec derives from a stretched vault key.
pub struct SubKeys {
    pub cipher: Zeroizing<[u8; KEY_LEN]>,
    pub hmac: Zeroizing<[u8; KEY_LEN]>,
}

/// Split a stretched key into cipher and HMAC keys.
pub fn derive_sub_keys(stretched: &[u8]) -> Result<SubKeys> {
    Ok(SubKeys {
        cipher: hkdf_derive(stretched, CIPHER_INFO)?,
        hmac: hkdf_derive(stretched, HMAC_INFO)?,
    })
}

/// Derive a fixed-purpose key from `ikm` with HKDF-SHA256 expand.
///
/// The extract step runs with a zero salt; inputs here are either
/// Argon2id output or fixed seeds, never low-entropy passwords.
pub fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(info, okm.as_mut_slice())
        .map_err(|e| CredStoreError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}
