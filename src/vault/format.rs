//! Encrypted container format for the vault database.
//!
//! A vault file has this layout:
//!
//! ```text
//! [CSDB: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][nonce | ciphertext][HMAC-SHA256: 32 bytes]
//! ```
//!
//! - **Magic** (`CSDB`): identifies the file as a credential database.
//! - **Version**: format version (currently `1`).
//! - **Header length**: little-endian u32 telling us where the header
//!   JSON ends and the encrypted body begins.
//! - **Header JSON**: serialized `VaultHeader` (salt, KDF params).
//! - **Body**: AES-256-GCM over the database tree JSON, with the header
//!   bytes bound in as associated data.
//! - **HMAC-SHA256**: 32-byte tag over header + body, checked before any
//!   decryption is attempted.
//!
//! Keys: the `VaultKey` is stretched with Argon2id using the header's
//! salt and params, then split into cipher and HMAC keys with HKDF.
//! A fresh salt is generated on every write.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use super::database::{DatabasePayload, KeePassDatabase};
use crate::crypto::keys::SubKeys;
use crate::crypto::{
    decrypt_with_aad, derive_sub_keys, encrypt_with_aad, generate_salt, stretch_key, Argon2Params,
    VaultKey,
};
use crate::errors::{CredStoreError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every vault file.
const MAGIC: &[u8; 4] = b"CSDB";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Size of the HMAC tag appended to the file (SHA-256 = 32 bytes).
const HMAC_LEN: usize = 32;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

// ---------------------------------------------------------------------------
// VaultHeader
// ---------------------------------------------------------------------------

/// Metadata stored in clear at the beginning of a vault file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultHeader {
    /// Format version.
    pub version: u8,

    /// The salt used for Argon2id key stretching (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// When the database was first created.
    pub created_at: DateTime<Utc>,

    /// Argon2 params the body was written with.
    pub argon2_params: Argon2Params,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Encrypt `db` under `key` and write it to `path` atomically.
///
/// Clears the database's dirty flag once the file is in place.
pub fn save_database(
    path: &Path,
    db: &mut KeePassDatabase,
    key: &VaultKey,
    argon2_params: &Argon2Params,
) -> Result<()> {
    let header = VaultHeader {
        version: CURRENT_VERSION,
        salt: generate_salt().to_vec(),
        created_at: db.created_at(),
        argon2_params: *argon2_params,
    };
    let header_bytes = serde_json::to_vec(&header)
        .map_err(|e| CredStoreError::SerializationError(format!("header: {e}")))?;

    let payload = Zeroizing::new(
        serde_json::to_vec(&db.to_payload())
            .map_err(|e| CredStoreError::SerializationError(format!("database: {e}")))?,
    );

    let keys = sub_keys(key, &header)?;
    let body = encrypt_with_aad(keys.cipher.as_slice(), &payload, &header_bytes)?;
    let hmac_tag = compute_hmac(keys.hmac.as_slice(), &header_bytes, &body)?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        CredStoreError::SerializationError(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;
    let mut buf = Vec::with_capacity(PREFIX_LEN + header_bytes.len() + body.len() + HMAC_LEN);
    buf.extend_from_slice(MAGIC);
    buf.push(CURRENT_VERSION);
    buf.extend_from_slice(&header_len.to_le_bytes());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(&body);
    buf.extend_from_slice(&hmac_tag);

    write_atomic(path, &buf)?;
    db.mark_saved();

    debug!(path = %path.display(), entries = db.entry_count(), "saved credential database");
    Ok(())
}

/// Read and decrypt the database at `path` with `key`.
///
/// A key that fails the HMAC check or the AEAD tag is reported as
/// `IncorrectMainPassword`, since that is the only way an intact file
/// can fail to open.
pub fn load_database(path: &Path, key: &VaultKey) -> Result<KeePassDatabase> {
    let raw = read_vault(path)?;

    let keys = sub_keys(key, &raw.header)?;
    verify_hmac(keys.hmac.as_slice(), &raw.header_bytes, &raw.body, &raw.stored_hmac).map_err(
        |e| match e {
            CredStoreError::HmacMismatch => CredStoreError::IncorrectMainPassword {
                file_missing: false,
            },
            other => other,
        },
    )?;

    let payload = Zeroizing::new(
        decrypt_with_aad(keys.cipher.as_slice(), &raw.body, &raw.header_bytes).map_err(|_| {
            CredStoreError::IncorrectMainPassword {
                file_missing: false,
            }
        })?,
    );
    let payload: DatabasePayload = serde_json::from_slice(&payload)
        .map_err(|e| CredStoreError::InvalidVaultFormat(format!("database JSON: {e}")))?;

    let db = KeePassDatabase::from_payload(payload, raw.header.created_at);
    debug!(path = %path.display(), entries = db.entry_count(), "loaded credential database");
    Ok(db)
}

/// Raw sections of a vault file, before any key is applied.
pub struct RawVault {
    pub header: VaultHeader,
    /// The raw header JSON bytes exactly as stored on disk.
    pub header_bytes: Vec<u8>,
    /// Nonce + ciphertext.
    pub body: Vec<u8>,
    /// The HMAC tag stored at the end of the file.
    pub stored_hmac: Vec<u8>,
}

/// Read a vault file from disk and split it into its sections.
pub fn read_vault(path: &Path) -> Result<RawVault> {
    if !path.exists() {
        return Err(CredStoreError::VaultNotFound(path.to_path_buf()));
    }

    let data = fs::read(path)?;

    if data.len() < PREFIX_LEN + HMAC_LEN {
        return Err(CredStoreError::InvalidVaultFormat(
            "file too small to be a valid vault".into(),
        ));
    }

    if &data[0..4] != MAGIC {
        return Err(CredStoreError::InvalidVaultFormat(
            "missing CSDB magic bytes".into(),
        ));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(CredStoreError::InvalidVaultFormat(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let header_len_u32 = u32::from_le_bytes(
        data[5..9]
            .try_into()
            .map_err(|_| CredStoreError::InvalidVaultFormat("bad header length".into()))?,
    );
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        CredStoreError::InvalidVaultFormat(format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;

    let header_end = PREFIX_LEN + header_len;
    if header_end + HMAC_LEN > data.len() {
        return Err(CredStoreError::InvalidVaultFormat(
            "header length exceeds file size".into(),
        ));
    }

    let header_bytes = data[PREFIX_LEN..header_end].to_vec();
    let body_end = data.len() - HMAC_LEN;
    let body = data[header_end..body_end].to_vec();
    let stored_hmac = data[body_end..].to_vec();

    let header: VaultHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| CredStoreError::InvalidVaultFormat(format!("header JSON: {e}")))?;

    // Checked before any key stretching: the header is not authenticated yet.
    header
        .argon2_params
        .validate()
        .map_err(|e| CredStoreError::InvalidVaultFormat(format!("header KDF params: {e}")))?;

    Ok(RawVault {
        header,
        header_bytes,
        body,
        stored_hmac,
    })
}

/// Write `bytes` to `path` via a temp file in the same directory.
///
/// On Unix the temp file is created owner-only, so the bytes are never
/// readable by anyone else.  It is synced and then renamed over `path`,
/// so readers see either the old file or the new one and never a
/// partial write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    let written = (|| -> Result<()> {
        let mut file = create_owner_only(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    written
}

/// Create (or truncate) `path` with owner read/write only on Unix.
///
/// A stale temp file left by a crash keeps its old mode through
/// `open`, so the mode is forced again afterwards.
fn create_owner_only(path: &Path) -> Result<File> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        Ok(file)
    }
    #[cfg(not(unix))]
    {
        Ok(File::create(path)?)
    }
}

fn sub_keys(key: &VaultKey, header: &VaultHeader) -> Result<SubKeys> {
    let stretched = stretch_key(key.as_bytes(), &header.salt, &header.argon2_params)?;
    derive_sub_keys(stretched.as_slice())
}

/// Compute HMAC-SHA256 over header + body bytes.
pub fn compute_hmac(hmac_key: &[u8], header_bytes: &[u8], body: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| CredStoreError::HmacError(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(body);

    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify the HMAC in constant time.
pub fn verify_hmac(
    hmac_key: &[u8],
    header_bytes: &[u8],
    body: &[u8],
    expected_hmac: &[u8],
) -> Result<()> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| CredStoreError::HmacError(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(body);

    mac.verify_slice(expected_hmac)
        .map_err(|_| CredStoreError::HmacMismatch)
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
