//! Key stretching using Argon2id.
//!
//! The vault codec never uses the composite vault key directly.  It is
//! stretched with Argon2id and a per-file salt, and the parameters are
//! recorded in the container header so a vault written with one set of
//! settings can still be opened after the settings change.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::errors::{CredStoreError, Result};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the stretched key in bytes (256 bits).
const KEY_LEN: usize = 32;

/// Minimum safe memory cost in KiB (8 MB).
pub const MIN_MEMORY_KIB: u32 = 8_192;

/// Largest memory cost accepted, in KiB (4 GiB).
pub const MAX_MEMORY_KIB: u32 = 4 * 1024 * 1024;

/// Largest iteration count accepted.
pub const MAX_ITERATIONS: u32 = 64;

/// Largest parallelism degree accepted.
pub const MAX_PARALLELISM: u32 = 64;

/// Argon2id parameters.
///
/// Serialized verbatim into the vault header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// The cheapest parameters still accepted by `stretch_key`.
    pub fn minimum() -> Self {
        Self {
            memory_kib: MIN_MEMORY_KIB,
            iterations: 1,
            parallelism: 1,
        }
    }

    /// Reject parameters weak enough to make the KDF pointless, or large
    /// enough to exhaust memory or stall the process.
    ///
    /// Header params are read before the file is authenticated, so this
    /// also bounds what a damaged file can make us allocate.
    pub fn validate(&self) -> Result<()> {
        if self.memory_kib > MAX_MEMORY_KIB {
            return Err(CredStoreError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at most {MAX_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if self.iterations > MAX_ITERATIONS {
            return Err(CredStoreError::KeyDerivationFailed(format!(
                "Argon2 iterations must be at most {MAX_ITERATIONS} (got {})",
                self.iterations
            )));
        }
        if self.parallelism > MAX_PARALLELISM {
            return Err(CredStoreError::KeyDerivationFailed(format!(
                "Argon2 parallelism must be at most {MAX_PARALLELISM} (got {})",
                self.parallelism
            )));
        }
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(CredStoreError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if self.iterations < 1 {
            return Err(CredStoreError::KeyDerivationFailed(
                "Argon2 iterations must be at least 1".into(),
            ));
        }
        if self.parallelism < 1 {
            return Err(CredStoreError::KeyDerivationFailed(
                "Argon2 parallelism must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Stretch `input` into a 32-byte key with Argon2id.
///
/// The same input + salt + params always produce the same key.
pub fn stretch_key(
    input: &[u8],
    salt: &[u8],
    argon2_params: &Argon2Params,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    argon2_params.validate()?;

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| CredStoreError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(input, salt, key.as_mut_slice())
        .map_err(|e| CredStoreError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
