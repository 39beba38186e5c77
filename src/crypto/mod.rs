//! Cryptographic primitives for the credential store.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Argon2id key stretching (`kdf`)
//! - Vault key construction and HKDF sub-key derivation (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

pub use encryption::{decrypt, decrypt_with_aad, encrypt, encrypt_with_aad};
pub use kdf::{generate_salt, stretch_key, Argon2Params};
pub use keys::{derive_sub_keys, hkdf_derive, VaultKey};
