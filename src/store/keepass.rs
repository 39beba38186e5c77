//! The encrypted, file-backed credential store.
//!
//! `KeePassCredentialStore` owns an in-memory `KeePassDatabase`, the path
//! of its vault file, and a `MainKeyStorage` for the key that unlocks
//! it.  The two files are independent: losing either one makes the vault
//! unrecoverable, so opening a vault whose key is gone is a hard error
//! rather than a silent reset.
//!
//! One mutex around the database serializes save, reload, clear, delete
//! and every tree access.  Needs-save state lives in a `SaveTracker`
//! next to it.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::main_key::{EncryptionSpec, MainKey, MainKeyStorage};
use super::state::{SaveState, SaveTracker};
use super::CredentialStore;
use crate::credentials::{CredentialAttributes, Credentials};
use crate::crypto::{Argon2Params, VaultKey};
use crate::errors::{CredStoreError, Result};
use crate::vault::format;
use crate::vault::{EntrySummary, KeePassDatabase, ROOT_GROUP_NAME};

pub struct KeePassCredentialStore {
    db_file: PathBuf,
    main_key_storage: Box<dyn MainKeyStorage>,
    kdf_params: Argon2Params,
    db: Mutex<KeePassDatabase>,
    save_state: SaveTracker,
    last_save_error: Mutex<Option<String>>,
}

impl KeePassCredentialStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open the vault at `db_file` with default KDF parameters.
    pub fn open(
        db_file: impl Into<PathBuf>,
        main_key_storage: impl MainKeyStorage + 'static,
    ) -> Result<Self> {
        Self::open_with_params(db_file, main_key_storage, Argon2Params::default())
    }

    /// Open the vault at `db_file`.
    ///
    /// - File absent: start with an empty database that needs saving.
    /// - File present: a stored main key is required.  No key fails with
    ///   `IncorrectMainPassword { file_missing: true }`; a key that does
    ///   not decrypt the file fails with `file_missing: false`.
    ///
    /// `kdf_params` are used when writing; reads use whatever the file
    /// header recorded.
    pub fn open_with_params(
        db_file: impl Into<PathBuf>,
        main_key_storage: impl MainKeyStorage + 'static,
        kdf_params: Argon2Params,
    ) -> Result<Self> {
        let db_file = db_file.into();
        kdf_params.validate()?;

        let (db, initial) = if db_file.exists() {
            let vault_key = load_vault_key(&main_key_storage)?;
            (format::load_database(&db_file, &vault_key)?, SaveState::Clean)
        } else {
            debug!(path = %db_file.display(), "no credential database yet, starting empty");
            (KeePassDatabase::new(), SaveState::Dirty)
        };

        Ok(Self::from_parts(db_file, Box::new(main_key_storage), kdf_params, db, initial))
    }

    /// Wrap an already loaded database.  It is written on the next save.
    pub fn from_database(
        db_file: impl Into<PathBuf>,
        main_key_storage: impl MainKeyStorage + 'static,
        kdf_params: Argon2Params,
        db: KeePassDatabase,
    ) -> Self {
        Self::from_parts(
            db_file.into(),
            Box::new(main_key_storage),
            kdf_params,
            db,
            SaveState::Dirty,
        )
    }

    fn from_parts(
        db_file: PathBuf,
        main_key_storage: Box<dyn MainKeyStorage>,
        kdf_params: Argon2Params,
        db: KeePassDatabase,
        initial: SaveState,
    ) -> Self {
        Self {
            db_file,
            main_key_storage,
            kdf_params,
            db: Mutex::new(db),
            save_state: SaveTracker::new(initial),
            last_save_error: Mutex::new(None),
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write the vault if anything needs saving.
    ///
    /// On the first save of a new vault a random main key is generated
    /// with `main_key_encryption_spec` and stored.  Failures never reach
    /// the caller: the store stays dirty so the next save retries, the
    /// error is logged, and `last_save_error` reports it.
    pub fn save(&self, main_key_encryption_spec: EncryptionSpec) {
        let mut db = self.db.lock();

        let was_dirty = self.save_state.begin_save();
        if !was_dirty && !db.is_dirty() {
            self.save_state.finish_save();
            return;
        }

        match self.write_database(&mut db, main_key_encryption_spec) {
            Ok(()) => {
                self.save_state.finish_save();
                *self.last_save_error.lock() = None;
            }
            Err(e) => {
                self.save_state.fail_save();
                error!(path = %self.db_file.display(), error = %e, "cannot save credential database");
                *self.last_save_error.lock() = Some(e.to_string());
            }
        }
    }

    fn write_database(&self, db: &mut KeePassDatabase, spec: EncryptionSpec) -> Result<()> {
        let vault_key = match self.main_key_storage.load()? {
            Some(mut main_key) => main_key.derive_vault_key(),
            None => {
                let mut main_key = MainKey::generate(spec);
                self.main_key_storage.save(Some(&main_key))?;
                debug!(path = %self.main_key_storage.path().display(), "generated main key");
                main_key.derive_vault_key()
            }
        };

        format::save_database(&self.db_file, db, &vault_key, &self.kdf_params)
    }

    /// Re-encrypt the whole vault under `main_key` and write it now.
    ///
    /// The key is stored first and then wiped as the vault key is built
    /// from it.  Unlike `save`, errors are returned.
    pub fn set_main_password(&self, main_key: &mut MainKey) -> Result<()> {
        let mut db = self.db.lock();

        let result = (|| -> Result<()> {
            self.main_key_storage.save(Some(&*main_key))?;
            let vault_key = main_key.derive_vault_key();
            format::save_database(&self.db_file, &mut db, &vault_key, &self.kdf_params)
        })();

        match &result {
            Ok(()) => {
                self.save_state.set_dirty(false);
                *self.last_save_error.lock() = None;
            }
            Err(e) => {
                self.save_state.mark_dirty();
                error!(path = %self.db_file.display(), error = %e, "cannot re-encrypt credential database");
                *self.last_save_error.lock() = Some(e.to_string());
            }
        }
        result
    }

    /// Replace the in-memory tree with what is on disk.
    pub fn reload(&self) -> Result<()> {
        let mut db = self.db.lock();
        let vault_key = load_vault_key(self.main_key_storage.as_ref())?;
        *db = format::load_database(&self.db_file, &vault_key)?;
        self.save_state.set_dirty(false);
        Ok(())
    }

    /// `true` if a `save` would write anything.
    pub fn is_need_to_save(&self) -> bool {
        let db = self.db.lock();
        self.save_state.is_dirty() || db.is_dirty()
    }

    /// The error from the most recent failed save, if the last attempt
    /// failed.
    pub fn last_save_error(&self) -> Option<String> {
        self.last_save_error.lock().clone()
    }

    /// Delete the vault file and the main key.
    ///
    /// The key is removed even when deleting the vault file fails; that
    /// failure is returned afterwards.
    pub fn delete_file_storage(&self) -> Result<()> {
        let _db = self.db.lock();

        let vault_result = match fs::remove_file(&self.db_file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(path = %self.db_file.display(), error = %e, "cannot delete credential database");
                Err(CredStoreError::from(e))
            }
        };
        let key_result = self.main_key_storage.save(None);

        vault_result.and(key_result)
    }

    /// Remove every stored credential.
    ///
    /// Needs-save follows the database: clearing an empty vault leaves
    /// nothing to write.
    pub fn clear(&self) {
        let mut db = self.db.lock();
        db.remove_group(ROOT_GROUP_NAME);
        self.save_state.set_dirty(db.is_dirty());
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn db_file(&self) -> &Path {
        &self.db_file
    }

    pub fn main_key_file(&self) -> &Path {
        self.main_key_storage.path()
    }

    /// Stored credentials without their passwords, sorted.
    pub fn list(&self) -> Vec<EntrySummary> {
        self.db.lock().summaries(ROOT_GROUP_NAME)
    }

    /// Number of stored credentials.
    pub fn len(&self) -> usize {
        self.db
            .lock()
            .root_group()
            .group(ROOT_GROUP_NAME)
            .map_or(0, |g| g.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for KeePassCredentialStore {
    fn get(&self, attributes: &CredentialAttributes) -> Option<Credentials> {
        let db = self.db.lock();
        let entry = db.find_entry(
            ROOT_GROUP_NAME,
            &attributes.service_name,
            attributes.user_name(),
        )?;

        Some(Credentials {
            user_name: attributes
                .user_name()
                .map(str::to_string)
                .or_else(|| entry.user_name.clone()),
            password: entry.password.as_ref().map(|p| p.get()),
        })
    }

    fn set(&self, attributes: &CredentialAttributes, credentials: Option<Credentials>) {
        let mut db = self.db.lock();
        let service = &attributes.service_name;

        match credentials.filter(|c| !c.is_empty()) {
            None => {
                db.remove_entry(ROOT_GROUP_NAME, service, attributes.user_name());
            }
            Some(credentials) => {
                let user_name = attributes
                    .user_name()
                    .or(credentials.user_name.as_deref())
                    .filter(|u| !u.is_empty());
                db.upsert_entry(
                    ROOT_GROUP_NAME,
                    service,
                    user_name,
                    credentials.password_str(),
                );
            }
        }

        if db.is_dirty() {
            self.save_state.mark_dirty();
        }
    }

    fn mark_dirty(&self) {
        self.save_state.mark_dirty();
    }
}

impl std::fmt::Debug for KeePassCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeePassCredentialStore")
            .field("db_file", &self.db_file)
            .field("main_key_file", &self.main_key_storage.path())
            .field("save_state", &self.save_state.get())
            .finish()
    }
}

/// Load the stored main key for an existing vault and turn it into a
/// vault key, wiping the raw bytes.
fn load_vault_key(storage: &dyn MainKeyStorage) -> Result<VaultKey> {
    let loaded = storage.load().map_err(|e| match e {
        CredStoreError::MainKeyError(msg) => {
            warn!(path = %storage.path().display(), error = %msg, "main key unusable");
            CredStoreError::IncorrectMainPassword {
                file_missing: false,
            }
        }
        other => other,
    })?;

    let mut main_key = loaded.ok_or(CredStoreError::IncorrectMainPassword { file_missing: true })?;
    Ok(main_key.derive_vault_key())
}
