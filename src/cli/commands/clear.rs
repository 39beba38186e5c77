//! `credstore clear`: remove every stored credential, keeping the files.

use crate::cli::output;
use crate::cli::{confirm, open_store, save_store, Cli};
use crate::errors::Result;

/// Execute the `clear` command.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    if !force && !confirm("Remove ALL stored credentials?")? {
        output::info("Cancelled.");
        return Ok(());
    }

    let (settings, store) = open_store(cli)?;
    let count = store.len();
    store.clear();

    if store.is_need_to_save() {
        save_store(&settings, &store)?;
        output::success(&format!("Removed {count} credential(s)"));
    } else {
        output::info("Nothing to clear.");
    }

    Ok(())
}
