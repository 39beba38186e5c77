//! Integration tests for the file-backed and in-memory credential stores.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use credstore::crypto::Argon2Params;
use credstore::errors::{CredStoreError, Result};
use credstore::{
    generate_service_name, CredentialAttributes, CredentialStore, Credentials, EncryptionSpec,
    InMemoryCredentialStore, KeePassCredentialStore, MainKey, MainKeyFileStorage, MainKeyStorage,
};
use tempfile::TempDir;

/// Helper: vault and key paths inside a fresh temp dir.
fn paths() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let db = dir.path().join("c.kdbx");
    let key = dir.path().join("c.pwd");
    (dir, db, key)
}

fn open(db: &Path, key: &Path) -> Result<KeePassCredentialStore> {
    KeePassCredentialStore::open_with_params(
        db,
        MainKeyFileStorage::new(key),
        Argon2Params::minimum(),
    )
}

fn attrs(service: &str, user: &str) -> CredentialAttributes {
    CredentialAttributes::with_user(service, user)
}

fn creds(password: &str) -> Option<Credentials> {
    Some(Credentials::new(None, Some(password)))
}

/// Key storage whose writes always fail.
struct ReadOnlyKeyStorage {
    path: PathBuf,
}

impl MainKeyStorage for ReadOnlyKeyStorage {
    fn load(&self) -> Result<Option<MainKey>> {
        Ok(None)
    }

    fn save(&self, _key: Option<&MainKey>) -> Result<()> {
        Err(CredStoreError::MainKeyError("storage is read-only".into()))
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

// ---------------------------------------------------------------------------
// Persistence round-trip
// ---------------------------------------------------------------------------

#[test]
fn saved_credentials_survive_reopen() {
    let (_dir, db, key) = paths();

    let store = open(&db, &key).unwrap();
    store.set(&attrs("github.com", "alice"), creds("gh-token"));
    store.set(&attrs("gitlab.com", "bob"), creds("gl-token"));
    store.save(EncryptionSpec::default());
    assert!(!store.is_need_to_save());
    assert!(db.exists());
    assert!(key.exists(), "first save generates and stores a main key");

    let reopened = open(&db, &key).unwrap();
    assert!(!reopened.is_need_to_save());
    assert_eq!(reopened.len(), 2);
    let got = reopened.get(&attrs("github.com", "alice")).unwrap();
    assert_eq!(got.password_str(), Some("gh-token"));
    assert_eq!(got.user_name.as_deref(), Some("alice"));
}

#[test]
fn generated_service_names_work_as_keys() {
    let (_dir, db, key) = paths();
    let service = generate_service_name("Git", "https://example.com");

    let store = open(&db, &key).unwrap();
    store.set(&CredentialAttributes::new(service.clone()), Some(Credentials::new(Some("me"), Some("pw"))));
    store.save(EncryptionSpec::default());

    let reopened = open(&db, &key).unwrap();
    let got = reopened.get(&CredentialAttributes::new(service)).unwrap();
    assert_eq!(got.user_name.as_deref(), Some("me"));
}

#[test]
fn save_without_changes_does_not_rewrite() {
    let (_dir, db, key) = paths();
    let store = open(&db, &key).unwrap();
    store.set(&attrs("svc", "u"), creds("pw"));
    store.save(EncryptionSpec::default());

    let before = fs::read(&db).unwrap();
    store.save(EncryptionSpec::default());
    let after = fs::read(&db).unwrap();
    assert_eq!(before, after, "a clean store must not be re-encrypted");
}

#[test]
fn remove_is_persisted() {
    let (_dir, db, key) = paths();
    let store = open(&db, &key).unwrap();
    store.set(&attrs("svc", "u"), creds("pw"));
    store.save(EncryptionSpec::default());

    store.remove(&attrs("svc", "u"));
    assert!(store.is_need_to_save());
    store.save(EncryptionSpec::default());

    let reopened = open(&db, &key).unwrap();
    assert!(reopened.get(&attrs("svc", "u")).is_none());
    assert!(reopened.is_empty());
}

#[test]
fn reload_discards_unsaved_changes() {
    let (_dir, db, key) = paths();
    let store = open(&db, &key).unwrap();
    store.set(&attrs("svc", "u"), creds("saved"));
    store.save(EncryptionSpec::default());

    store.set(&attrs("svc", "u"), creds("unsaved"));
    assert!(store.is_need_to_save());

    store.reload().unwrap();
    assert!(!store.is_need_to_save());
    assert_eq!(
        store.get(&attrs("svc", "u")).unwrap().password_str(),
        Some("saved")
    );
}

// ---------------------------------------------------------------------------
// Main key handling
// ---------------------------------------------------------------------------

#[test]
fn missing_main_key_on_existing_vault_is_an_error() {
    let (_dir, db, key) = paths();
    let store = open(&db, &key).unwrap();
    store.set(&attrs("svc", "u"), creds("pw"));
    store.save(EncryptionSpec::default());
    drop(store);

    fs::remove_file(&key).unwrap();

    let err = open(&db, &key).unwrap_err();
    assert!(matches!(
        err,
        CredStoreError::IncorrectMainPassword { file_missing: true }
    ));
    assert!(db.exists(), "the vault is left untouched");
}

#[test]
fn foreign_main_key_is_incorrect_password() {
    let (dir, db, key) = paths();
    let store = open(&db, &key).unwrap();
    store.set(&attrs("svc", "u"), creds("pw"));
    store.save(EncryptionSpec::default());

    // A key that belongs to some other vault.
    let other_key = dir.path().join("other.pwd");
    MainKeyFileStorage::new(&other_key)
        .save(Some(&MainKey::generate(EncryptionSpec::default())))
        .unwrap();
    fs::copy(&other_key, &key).unwrap();

    let err = open(&db, &key).unwrap_err();
    assert!(matches!(
        err,
        CredStoreError::IncorrectMainPassword {
            file_missing: false
        }
    ));
    assert!(err.is_incorrect_main_password());
}

#[test]
fn set_main_password_consumes_key_and_rewrites_vault() {
    let (_dir, db, key) = paths();
    let store = open(&db, &key).unwrap();
    store.set(&attrs("svc", "u"), creds("pw"));
    store.save(EncryptionSpec::default());
    let old_key_file = fs::read(&key).unwrap();

    let mut main_key = MainKey::from_password("correct horse battery", EncryptionSpec::default());
    store.set_main_password(&mut main_key).unwrap();

    assert!(main_key.is_cleared(), "key bytes are wiped after use");
    assert!(!store.is_need_to_save());
    assert_ne!(fs::read(&key).unwrap(), old_key_file);

    let reopened = open(&db, &key).unwrap();
    assert_eq!(
        reopened.get(&attrs("svc", "u")).unwrap().password_str(),
        Some("pw")
    );
}

#[test]
fn set_main_password_on_new_store_writes_both_files() {
    let (_dir, db, key) = paths();
    let store = open(&db, &key).unwrap();
    store.set(&attrs("svc", "u"), creds("pw"));

    let mut main_key = MainKey::generate(EncryptionSpec::default());
    store.set_main_password(&mut main_key).unwrap();

    assert!(db.exists());
    assert!(key.exists());
    assert!(open(&db, &key).unwrap().get(&attrs("svc", "u")).is_some());
}

#[test]
fn stored_main_key_is_flagged_auto_generated_only_when_generated() {
    let (_dir, db, key) = paths();
    let store = open(&db, &key).unwrap();
    store.set(&attrs("svc", "u"), creds("pw"));
    store.save(EncryptionSpec::default());

    let storage = MainKeyFileStorage::new(&key);
    assert!(storage.load().unwrap().unwrap().is_auto_generated());

    let mut chosen = MainKey::from_password("a chosen password", EncryptionSpec::default());
    store.set_main_password(&mut chosen).unwrap();
    assert!(!storage.load().unwrap().unwrap().is_auto_generated());
}

// ---------------------------------------------------------------------------
// Save failures
// ---------------------------------------------------------------------------

#[test]
fn failed_save_keeps_store_dirty_and_reports_error() {
    let (_dir, db, key) = paths();
    let store = open(&db, &key).unwrap();
    store.set(&attrs("svc", "u"), creds("pw"));

    // A non-empty directory at the vault path makes the final rename fail.
    fs::create_dir_all(db.join("blocker")).unwrap();

    store.save(EncryptionSpec::default());
    assert!(store.is_need_to_save(), "failure re-arms the next save");
    assert!(store.last_save_error().is_some());

    fs::remove_dir_all(&db).unwrap();
    store.save(EncryptionSpec::default());
    assert!(!store.is_need_to_save());
    assert!(store.last_save_error().is_none());
    assert!(open(&db, &key).unwrap().get(&attrs("svc", "u")).is_some());
}

#[test]
fn key_storage_failure_is_swallowed_by_save() {
    let (dir, db, _key) = paths();
    let store = KeePassCredentialStore::open_with_params(
        &db,
        ReadOnlyKeyStorage {
            path: dir.path().join("ro.pwd"),
        },
        Argon2Params::minimum(),
    )
    .unwrap();
    store.set(&attrs("svc", "u"), creds("pw"));

    store.save(EncryptionSpec::default());
    assert!(store.is_need_to_save());
    assert!(!db.exists(), "no vault without a stored key");
    assert!(store
        .last_save_error()
        .unwrap()
        .contains("storage is read-only"));
}

#[test]
fn set_main_password_returns_storage_errors() {
    let (dir, db, _key) = paths();
    let store = KeePassCredentialStore::open_with_params(
        &db,
        ReadOnlyKeyStorage {
            path: dir.path().join("ro.pwd"),
        },
        Argon2Params::minimum(),
    )
    .unwrap();

    let mut main_key = MainKey::generate(EncryptionSpec::default());
    assert!(store.set_main_password(&mut main_key).is_err());
    assert!(store.is_need_to_save());
    assert!(store
        .last_save_error()
        .unwrap()
        .contains("storage is read-only"));
}

#[cfg(unix)]
#[test]
fn main_key_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, db, key) = paths();
    let store = open(&db, &key).unwrap();
    store.set(&attrs("svc", "u"), creds("pw"));
    store.save(EncryptionSpec::default());

    let mode = fs::metadata(&key).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

// ---------------------------------------------------------------------------
// Clear and delete
// ---------------------------------------------------------------------------

#[test]
fn clear_marks_dirty_only_when_something_was_removed() {
    let (_dir, db, key) = paths();
    let store = open(&db, &key).unwrap();
    store.save(EncryptionSpec::default());
    assert!(!store.is_need_to_save());

    store.clear();
    assert!(!store.is_need_to_save(), "clearing an empty vault is a no-op");

    store.set(&attrs("svc", "u"), creds("pw"));
    store.save(EncryptionSpec::default());
    store.clear();
    assert!(store.is_need_to_save());
    assert!(store.is_empty());

    store.save(EncryptionSpec::default());
    assert!(open(&db, &key).unwrap().is_empty());
}

#[test]
fn delete_file_storage_removes_both_files() {
    let (_dir, db, key) = paths();
    let store = open(&db, &key).unwrap();
    store.set(&attrs("svc", "u"), creds("pw"));
    store.save(EncryptionSpec::default());

    store.delete_file_storage().unwrap();
    assert!(!db.exists());
    assert!(!key.exists());

    // Nothing left to delete is fine.
    store.delete_file_storage().unwrap();
}

#[test]
fn empty_credentials_act_as_removal() {
    let (_dir, db, key) = paths();
    let store = open(&db, &key).unwrap();
    store.set(&attrs("svc", "u"), creds("pw"));
    store.save(EncryptionSpec::default());

    store.set(&attrs("svc", "u"), Some(Credentials::default()));
    store.save(EncryptionSpec::default());

    assert!(open(&db, &key).unwrap().get(&attrs("svc", "u")).is_none());
}

#[test]
fn main_key_is_deleted_even_if_vault_deletion_fails() {
    let (_dir, db, key) = paths();
    let store = open(&db, &key).unwrap();
    store.set(&attrs("svc", "u"), creds("pw"));
    store.save(EncryptionSpec::default());

    // Replace the vault file with a directory that remove_file cannot delete.
    fs::remove_file(&db).unwrap();
    fs::create_dir_all(db.join("blocker")).unwrap();

    assert!(store.delete_file_storage().is_err());
    assert!(!key.exists());
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_writers_and_saves_do_not_lose_entries() {
    let (_dir, db, key) = paths();
    let store = Arc::new(open(&db, &key).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..5 {
                    store.set(&attrs(&format!("svc-{t}-{i}"), "u"), creds("pw"));
                }
                store.save(EncryptionSpec::default());
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    store.save(EncryptionSpec::default());
    assert!(!store.is_need_to_save());
    assert_eq!(open(&db, &key).unwrap().len(), 20);
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[test]
fn in_memory_store_is_interchangeable() {
    fn roundtrip(store: &dyn CredentialStore) {
        let a = attrs("svc", "u");
        store.set(&a, creds("pw"));
        assert_eq!(store.get(&a).unwrap().password_str(), Some("pw"));
        store.remove(&a);
        assert!(store.get(&a).is_none());
    }

    let (_dir, db, key) = paths();
    roundtrip(&InMemoryCredentialStore::new());
    roundtrip(&open(&db, &key).unwrap());
    assert!(!db.exists(), "set alone never writes");
}
