//! `credstore rotate-key`: re-encrypt the database under a new main key.
//!
//! By default a fresh random key is generated.  With `--password` the
//! user chooses the main password instead.  Either way the whole
//! database is rewritten immediately.

use crate::cli::output;
use crate::cli::{open_store, prompt_new_main_password, Cli};
use crate::errors::Result;
use crate::store::MainKey;

/// Execute the `rotate-key` command.
pub fn execute(cli: &Cli, use_password: bool) -> Result<()> {
    let (settings, store) = open_store(cli)?;
    let spec = settings.encryption_spec();

    let mut main_key = if use_password {
        let password = prompt_new_main_password()?;
        MainKey::from_password(&password, spec)
    } else {
        MainKey::generate(spec)
    };

    store.set_main_password(&mut main_key)?;

    output::success(&format!(
        "Main key rotated ({} credential(s) re-encrypted)",
        store.len()
    ));
    output::tip(&format!(
        "Keep {} safe; without it {} cannot be opened.",
        store.main_key_file().display(),
        store.db_file().display()
    ));

    Ok(())
}
