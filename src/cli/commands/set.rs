//! `credstore set`: add or update credentials for a service.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{attributes, open_store, save_store, Cli};
use crate::credentials::Credentials;
use crate::errors::{CredStoreError, Result};
use crate::store::CredentialStore;

/// Execute the `set` command.
pub fn execute(cli: &Cli, service: &str, user: Option<&str>, value: Option<&str>) -> Result<()> {
    let attrs = attributes(service, user)?;

    let password = if let Some(v) = value {
        output::warning("Password given on the command line may appear in shell history.");
        Zeroizing::new(v.to_string())
    } else if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        Zeroizing::new(buf.trim_end().to_string())
    } else {
        Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt(format!("Password for {service}"))
                .interact()
                .map_err(|e| CredStoreError::CommandFailed(format!("input prompt: {e}")))?,
        )
    };

    let (settings, store) = open_store(cli)?;
    let existed = store.get(&attrs).is_some();
    store.set(
        &attrs,
        Some(Credentials {
            user_name: user.map(str::to_string),
            password: Some(password),
        }),
    );
    save_store(&settings, &store)?;

    let verb = if existed { "updated" } else { "stored" };
    output::success(&format!(
        "Credentials for '{service}' {verb} ({} total)",
        store.len()
    ));

    Ok(())
}
