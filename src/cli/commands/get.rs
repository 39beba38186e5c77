//! `credstore get`: print the password stored for a service.

use crate::cli::{attributes, open_store, Cli};
use crate::errors::{CredStoreError, Result};
use crate::store::CredentialStore;

/// Execute the `get` command.
pub fn execute(cli: &Cli, service: &str, user: Option<&str>, show_user: bool) -> Result<()> {
    let attrs = attributes(service, user)?;
    let (_settings, store) = open_store(cli)?;

    let credentials = store
        .get(&attrs)
        .ok_or_else(|| CredStoreError::CredentialNotFound(service.to_string()))?;

    if show_user {
        println!("{}", credentials.user_name.as_deref().unwrap_or_default());
    }
    println!("{}", credentials.password_str().unwrap_or_default());

    Ok(())
}
