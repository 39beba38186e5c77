//! `credstore remove`: delete the credentials stored for a service.

use crate::cli::output;
use crate::cli::{attributes, confirm, open_store, save_store, Cli};
use crate::errors::{CredStoreError, Result};
use crate::store::CredentialStore;

/// Execute the `remove` command.
pub fn execute(cli: &Cli, service: &str, user: Option<&str>, force: bool) -> Result<()> {
    let attrs = attributes(service, user)?;

    if !force && !confirm(&format!("Remove credentials for '{service}'?"))? {
        output::info("Cancelled.");
        return Ok(());
    }

    let (settings, store) = open_store(cli)?;
    if store.get(&attrs).is_none() {
        return Err(CredStoreError::CredentialNotFound(service.to_string()));
    }

    store.remove(&attrs);
    save_store(&settings, &store)?;

    output::success(&format!("Removed credentials for '{service}'"));
    Ok(())
}
