//! `credstore delete-storage`: delete the database and its main key.

use crate::cli::output;
use crate::cli::{config_dir, confirm, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::store::{KeePassCredentialStore, MainKeyFileStorage, MainKeyStorage};

/// Execute the `delete-storage` command.
///
/// Works even when the database can no longer be opened, which is the
/// usual reason to run it.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    let dir = config_dir(cli)?;
    let settings = Settings::load(&dir)?;
    let db_path = settings.db_path(&dir);
    let key_storage = MainKeyFileStorage::new(settings.main_key_path(&dir));

    if !force
        && !confirm(&format!(
            "Permanently delete {} and its main key? Stored credentials cannot be recovered.",
            db_path.display()
        ))?
    {
        output::info("Cancelled.");
        return Ok(());
    }

    match KeePassCredentialStore::open_with_params(
        &db_path,
        key_storage.clone(),
        settings.argon2_params(),
    ) {
        Ok(store) => store.delete_file_storage()?,
        Err(e) if e.is_incorrect_main_password() => {
            // Nothing to decrypt; remove the files directly.
            let vault_result: Result<()> = match std::fs::remove_file(&db_path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
            let key_result = key_storage.save(None);
            vault_result.and(key_result)?;
        }
        Err(e) => return Err(e),
    }

    output::success("Credential database and main key deleted");
    Ok(())
}
