//! `credstore version`: display version.

use console::style;

use crate::errors::Result;

/// Execute the `version` command.
pub fn execute() -> Result<()> {
    let current = env!("CARGO_PKG_VERSION");
    println!("credstore {}", style(current).green().bold());

    let keyring = if cfg!(feature = "keyring-store") {
        "enabled"
    } else {
        "disabled"
    };
    println!("  keyring protection: {keyring}");

    Ok(())
}
