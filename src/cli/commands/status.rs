//! `credstore status`: show where things live and what state they are in.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::Result;

/// Execute the `status` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (settings, store) = open_store(cli)?;

    let db_exists = store.db_file().exists();
    let key_exists = store.main_key_file().exists();

    output::info(&format!(
        "Database:  {} ({})",
        store.db_file().display(),
        if db_exists { "present" } else { "not created yet" }
    ));
    output::info(&format!(
        "Main key:  {} ({})",
        store.main_key_file().display(),
        if key_exists { "present" } else { "not created yet" }
    ));
    output::info(&format!(
        "New keys protected with: {}",
        settings.main_key_encryption
    ));
    output::info(&format!("Credentials: {}", store.len()));

    if db_exists && store.is_need_to_save() {
        output::warning("Unsaved changes pending.");
    }

    Ok(())
}
