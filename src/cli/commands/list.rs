//! `credstore list`: display stored credentials in a table.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (_settings, store) = open_store(cli)?;
    let entries = store.list();

    output::info(&format!(
        "{} — {} credential(s)",
        store.db_file().display(),
        entries.len()
    ));
    output::print_credentials_table(&entries);

    Ok(())
}
