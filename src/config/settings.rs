use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::Argon2Params;
use crate::errors::{CredStoreError, Result};
use crate::store::{EncryptionSpec, EncryptionType};

/// Store configuration, loaded from `<config-dir>/credstore.toml`.
///
/// Every field has a sensible default so the store works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// File name of the vault database inside the config dir.
    #[serde(default = "default_db_file")]
    pub db_file: String,

    /// File name of the main key file inside the config dir.
    #[serde(default = "default_main_key_file")]
    pub main_key_file: String,

    /// How a newly generated main key is protected at rest.
    #[serde(default)]
    pub main_key_encryption: EncryptionType,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_db_file() -> String {
    "c.kdbx".to_string()
}

fn default_main_key_file() -> String {
    "c.pwd".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_file: default_db_file(),
            main_key_file: default_main_key_file(),
            main_key_encryption: EncryptionType::default(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the config dir.
    pub const FILE_NAME: &'static str = "credstore.toml";

    /// Load settings from `<config_dir>/credstore.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            CredStoreError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.argon2_params().validate().map_err(|e| {
            CredStoreError::ConfigError(format!("{}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Full path of the vault database, e.g. `<config_dir>/c.kdbx`.
    pub fn db_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.db_file)
    }

    /// Full path of the main key file, e.g. `<config_dir>/c.pwd`.
    pub fn main_key_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.main_key_file)
    }

    pub fn encryption_spec(&self) -> EncryptionSpec {
        EncryptionSpec::new(self.main_key_encryption)
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
