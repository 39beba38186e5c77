//! Entries stored in the vault tree.
//!
//! An entry is one credential: a title (the service name), an optional
//! user name, and an optional password.  Passwords are kept in memory as
//! a `ProtectedValue` so the plaintext only exists briefly while it is
//! being read or serialized.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// A string held XOR-masked with a random pad of the same length.
///
/// This is not encryption against an attacker who can read the whole
/// process; it keeps plaintext passwords out of heap dumps and swap.
/// Both buffers are wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ProtectedValue {
    masked: Vec<u8>,
    pad: Vec<u8>,
}

impl ProtectedValue {
    pub fn new(value: &str) -> Self {
        let mut pad = vec![0u8; value.len()];
        rand::rng().fill_bytes(&mut pad);
        let masked = value
            .as_bytes()
            .iter()
            .zip(&pad)
            .map(|(v, p)| v ^ p)
            .collect();
        Self { masked, pad }
    }

    /// Unmask the value.  The returned string is wiped when dropped.
    pub fn get(&self) -> Zeroizing<String> {
        let mut bytes: Vec<u8> = self
            .masked
            .iter()
            .zip(&self.pad)
            .map(|(m, p)| m ^ p)
            .collect();
        let value = String::from_utf8_lossy(&bytes).into_owned();
        bytes.zeroize();
        Zeroizing::new(value)
    }

    /// Compare against a plaintext without keeping an unmasked copy around.
    pub fn matches(&self, other: &str) -> bool {
        self.masked.len() == other.len()
            && self
                .masked
                .iter()
                .zip(&self.pad)
                .zip(other.as_bytes())
                .all(|((m, p), o)| m ^ p == *o)
    }

    pub fn is_empty(&self) -> bool {
        self.masked.is_empty()
    }
}

impl Clone for ProtectedValue {
    fn clone(&self) -> Self {
        Self::new(&self.get())
    }
}

impl std::fmt::Debug for ProtectedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProtectedValue(..)")
    }
}

// The payload is encrypted as a whole, so the plaintext is what goes
// into the serialized form.
impl Serialize for ProtectedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.get())
    }
}

impl<'de> Deserialize<'de> for ProtectedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let plain = Zeroizing::new(String::deserialize(deserializer)?);
        Ok(Self::new(&plain))
    }
}

/// A single credential entry in a vault group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// The service name this credential belongs to.
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<ProtectedValue>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(title: &str, user_name: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            title: title.to_string(),
            user_name: user_name.map(str::to_string),
            password: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `true` if this entry answers a lookup for `title` / `user_name`.
    ///
    /// A lookup without a user name matches any entry with the title.
    pub fn matches(&self, title: &str, user_name: Option<&str>) -> bool {
        self.title == title
            && user_name.map_or(true, |u| self.user_name.as_deref() == Some(u))
    }
}

/// Lightweight view of an entry without its password.
///
/// Returned by listing operations so callers can show what is stored
/// without unmasking anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySummary {
    pub service_name: String,
    pub user_name: Option<String>,
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Entry> for EntrySummary {
    fn from(entry: &Entry) -> Self {
        Self {
            service_name: entry.title.clone(),
            user_name: entry.user_name.clone(),
            has_password: entry.password.as_ref().is_some_and(|p| !p.is_empty()),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_value_roundtrip() {
        let value = ProtectedValue::new("correct horse battery staple");
        assert_eq!(value.get().as_str(), "correct horse battery staple");
        assert!(value.matches("correct horse battery staple"));
        assert!(!value.matches("correct horse"));
    }

    #[test]
    fn protected_value_is_masked_in_memory() {
        let plain = "a-fairly-long-password-value";
        let value = ProtectedValue::new(plain);
        assert_ne!(value.masked.as_slice(), plain.as_bytes());
    }

    #[test]
    fn protected_value_serializes_as_plain_string() {
        let value = ProtectedValue::new("pw");
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"pw\"");

        let back: ProtectedValue = serde_json::from_str("\"pw\"").unwrap();
        assert!(back.matches("pw"));
    }

    #[test]
    fn lookup_without_user_matches_any_user() {
        let entry = Entry::new("svc", Some("alice"));
        assert!(entry.matches("svc", None));
        assert!(entry.matches("svc", Some("alice")));
        assert!(!entry.matches("svc", Some("bob")));
        assert!(!entry.matches("other", None));
    }
}
