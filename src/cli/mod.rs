//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use clap_complete::Shell;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::credentials::CredentialAttributes;
use crate::errors::{CredStoreError, Result};
use crate::store::{KeePassCredentialStore, MainKeyFileStorage};

/// Minimum length of a user-chosen main password.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable consulted before prompting for a main password.
pub const MAIN_PASSWORD_ENV: &str = "CREDSTORE_MAIN_PASSWORD";

/// credstore: encrypted local credential store.
#[derive(Parser)]
#[command(
    name = "credstore",
    about = "Encrypted local credential store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the credential database and main key file
    #[arg(
        long,
        env = "CREDSTORE_CONFIG_DIR",
        default_value = ".credstore",
        global = true
    )]
    pub config_dir: String,

    /// Log store operations to stderr (or set CREDSTORE_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Print the password stored for a service
    Get {
        /// Service name
        service: String,
        /// Account user name
        #[arg(short, long)]
        user: Option<String>,
        /// Print the user name on the line before the password
        #[arg(long)]
        show_user: bool,
    },

    /// Store credentials for a service (add or update)
    Set {
        /// Service name
        service: String,
        /// Account user name
        #[arg(short, long)]
        user: Option<String>,
        /// Password (omit for interactive prompt or stdin)
        value: Option<String>,
    },

    /// Remove the credentials stored for a service
    Remove {
        /// Service name
        service: String,
        /// Account user name
        #[arg(short, long)]
        user: Option<String>,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// List stored credentials (no passwords)
    List,

    /// Remove every stored credential
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete the credential database and its main key file
    DeleteStorage {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Re-encrypt the database under a new main key
    RotateKey {
        /// Use a chosen password instead of a generated key
        #[arg(long)]
        password: bool,
    },

    /// Show file locations and whether unsaved changes exist
    Status,

    /// Show version
    Version,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve `--config-dir` against the current directory.
pub fn config_dir(cli: &Cli) -> Result<PathBuf> {
    Ok(std::env::current_dir()?.join(&cli.config_dir))
}

/// Load settings and open the credential store they describe.
pub fn open_store(cli: &Cli) -> Result<(Settings, KeePassCredentialStore)> {
    let dir = config_dir(cli)?;
    let settings = Settings::load(&dir)?;
    let store = KeePassCredentialStore::open_with_params(
        settings.db_path(&dir),
        MainKeyFileStorage::new(settings.main_key_path(&dir)),
        settings.argon2_params(),
    )
    .map_err(|e| {
        if e.is_incorrect_main_password() {
            output::tip("Restore the main key file, or run `credstore delete-storage` to start over.");
        }
        e
    })?;
    Ok((settings, store))
}

/// Save the store, turning a swallowed save failure into a command error.
pub fn save_store(settings: &Settings, store: &KeePassCredentialStore) -> Result<()> {
    store.save(settings.encryption_spec());
    if store.is_need_to_save() {
        let reason = store
            .last_save_error()
            .unwrap_or_else(|| "changes were not persisted".to_string());
        return Err(CredStoreError::CommandFailed(format!(
            "could not save credential database: {reason}"
        )));
    }
    Ok(())
}

/// Build lookup attributes from CLI arguments.
pub fn attributes(service: &str, user: Option<&str>) -> Result<CredentialAttributes> {
    validate_service_name(service)?;
    Ok(CredentialAttributes {
        service_name: service.to_string(),
        user_name: user.map(str::to_string),
    })
}

/// Prompt for a new main password with confirmation.
///
/// Respects `CREDSTORE_MAIN_PASSWORD` for scripted use and enforces a
/// minimum length.  Returns `Zeroizing<String>` so the password is wiped
/// from memory on drop.
pub fn prompt_new_main_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(MAIN_PASSWORD_ENV) {
        if !pw.is_empty() {
            if pw.len() < MIN_PASSWORD_LEN {
                return Err(CredStoreError::CommandFailed(format!(
                    "main password must be at least {MIN_PASSWORD_LEN} characters"
                )));
            }
            return Ok(Zeroizing::new(pw));
        }
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose main password")
            .with_confirmation(
                "Confirm main password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| CredStoreError::CommandFailed(format!("password prompt: {e}")))?;

        if password.len() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Main password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}

/// Ask a yes/no question, defaulting to "no".
pub fn confirm(prompt: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| CredStoreError::CommandFailed(format!("confirm prompt: {e}")))
}

/// Validate that a service name is usable.
///
/// Must be non-empty, at most 1024 bytes, and free of control characters.
pub fn validate_service_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CredStoreError::CommandFailed(
            "service name cannot be empty".into(),
        ));
    }
    if name.len() > 1024 {
        return Err(CredStoreError::CommandFailed(
            "service name cannot exceed 1024 bytes".into(),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(CredStoreError::CommandFailed(
            "service name cannot contain control characters".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_service_names() {
        assert!(validate_service_name("github.com").is_ok());
        assert!(validate_service_name("Credential Store Git — https://x").is_ok());
    }

    #[test]
    fn rejects_blank_name() {
        assert!(validate_service_name("").is_err());
        assert!(validate_service_name("   ").is_err());
    }

    #[test]
    fn rejects_control_chars() {
        assert!(validate_service_name("svc\nname").is_err());
        assert!(validate_service_name("svc\u{0}").is_err());
    }

    #[test]
    fn rejects_too_long_name() {
        assert!(validate_service_name(&"a".repeat(1025)).is_err());
    }

    #[test]
    fn attributes_carry_user() {
        let attrs = attributes("svc", Some("alice")).unwrap();
        assert_eq!(attrs.service_name, "svc");
        assert_eq!(attrs.user_name(), Some("alice"));
    }
}
