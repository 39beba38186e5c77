//! Lookup keys and values exchanged with a credential store.
//!
//! `CredentialAttributes` identifies a stored credential by service name
//! and optional user name.  `Credentials` is what gets stored: a user
//! name and a password.  Passwords are held in `Zeroizing<String>` so
//! they are wiped as soon as the caller drops them.

use zeroize::Zeroizing;

/// Prefix of every service name built by `generate_service_name`.
pub const SERVICE_NAME_PREFIX: &str = "Credential Store";

/// Build a service name for `key` owned by `subsystem`.
///
/// Example: `generate_service_name("Git", "https://example.com")`
/// returns `"Credential Store Git — https://example.com"`.
pub fn generate_service_name(subsystem: &str, key: &str) -> String {
    format!("{SERVICE_NAME_PREFIX} {subsystem} — {key}")
}

/// Identifies a credential: which service, and optionally which account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialAttributes {
    pub service_name: String,
    pub user_name: Option<String>,
}

impl CredentialAttributes {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            user_name: None,
        }
    }

    pub fn with_user(service_name: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            user_name: Some(user_name.into()),
        }
    }

    /// The user name, treating an empty string as "not set".
    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref().filter(|u| !u.is_empty())
    }
}

/// A stored user name / password pair.
#[derive(Clone, Default)]
pub struct Credentials {
    pub user_name: Option<String>,
    pub password: Option<Zeroizing<String>>,
}

impl Credentials {
    pub fn new(user_name: Option<&str>, password: Option<&str>) -> Self {
        Self {
            user_name: user_name.map(str::to_string),
            password: password.map(|p| Zeroizing::new(p.to_string())),
        }
    }

    /// The password as a plain `&str`, if present.
    pub fn password_str(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.as_str())
    }

    /// `true` if neither a user name nor a password is set.
    pub fn is_empty(&self) -> bool {
        self.user_name.as_deref().map_or(true, str::is_empty)
            && self.password.as_ref().map_or(true, |p| p.is_empty())
    }
}

impl PartialEq for Credentials {
    fn eq(&self, other: &Self) -> bool {
        self.user_name == other.user_name && self.password_str() == other.password_str()
    }
}

impl Eq for Credentials {}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_name", &self.user_name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
