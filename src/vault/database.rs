//! In-memory vault tree.
//!
//! `KeePassDatabase` owns a root group whose children are named groups
//! holding credential entries.  Every method that changes the tree sets
//! the database's own dirty flag; the codec clears it after a successful
//! write and a fresh load starts clean.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::{Entry, EntrySummary, ProtectedValue};

/// Name of the group all credentials are stored under.
pub const ROOT_GROUP_NAME: &str = "Credential Store";

/// Name of the tree's root node.
const TREE_ROOT_NAME: &str = "Root";

/// A named group of entries and sub-groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Group {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    fn group_mut(&mut self, name: &str) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.name == name)
    }

    pub fn entry(&self, title: &str, user_name: Option<&str>) -> Option<&Entry> {
        self.entries.iter().find(|e| e.matches(title, user_name))
    }

    fn entry_mut(&mut self, title: &str, user_name: Option<&str>) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.matches(title, user_name))
    }

    /// Total number of entries in this group and every sub-group.
    pub fn entry_count(&self) -> usize {
        self.entries.len() + self.groups.iter().map(Group::entry_count).sum::<usize>()
    }
}

/// The tree serialized inside the encrypted container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DatabasePayload {
    pub root: Group,
}

/// An in-memory credential database.
#[derive(Debug, Clone)]
pub struct KeePassDatabase {
    root: Group,
    created_at: DateTime<Utc>,
    dirty: bool,
}

impl Default for KeePassDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl KeePassDatabase {
    /// An empty database.  Empty databases are not dirty: there is
    /// nothing in them worth writing yet.
    pub fn new() -> Self {
        Self {
            root: Group::new(TREE_ROOT_NAME),
            created_at: Utc::now(),
            dirty: false,
        }
    }

    pub(crate) fn from_payload(payload: DatabasePayload, created_at: DateTime<Utc>) -> Self {
        Self {
            root: payload.root,
            created_at,
            dirty: false,
        }
    }

    pub(crate) fn to_payload(&self) -> DatabasePayload {
        DatabasePayload {
            root: self.root.clone(),
        }
    }

    pub fn root_group(&self) -> &Group {
        &self.root
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// `true` if the tree changed since it was loaded or last saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Find an entry in `group`.
    pub fn find_entry(&self, group: &str, title: &str, user_name: Option<&str>) -> Option<&Entry> {
        self.root.group(group)?.entry(title, user_name)
    }

    /// Create or update the entry for `title` / `user_name` in `group`.
    ///
    /// The group is created on demand.  The dirty flag is only set when
    /// something actually changes.
    pub fn upsert_entry(
        &mut self,
        group: &str,
        title: &str,
        user_name: Option<&str>,
        password: Option<&str>,
    ) {
        if self.root.group(group).is_none() {
            self.root.groups.push(Group::new(group));
            self.dirty = true;
        }
        let Some(target) = self.root.group_mut(group) else {
            return;
        };

        let changed = match target.entry_mut(title, user_name) {
            Some(entry) => {
                let same_password = match (&entry.password, password) {
                    (Some(current), Some(new)) => current.matches(new),
                    (None, None) => true,
                    _ => false,
                };
                if !same_password {
                    entry.password = password.map(ProtectedValue::new);
                    entry.updated_at = Utc::now();
                }
                !same_password
            }
            None => {
                let mut entry = Entry::new(title, user_name);
                entry.password = password.map(ProtectedValue::new);
                target.entries.push(entry);
                true
            }
        };

        if changed {
            self.dirty = true;
        }
    }

    /// Remove the first entry matching `title` / `user_name` from `group`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove_entry(&mut self, group: &str, title: &str, user_name: Option<&str>) -> bool {
        let Some(target) = self.root.group_mut(group) else {
            return false;
        };
        let Some(index) = target
            .entries
            .iter()
            .position(|e| e.matches(title, user_name))
        else {
            return false;
        };
        target.entries.remove(index);
        self.dirty = true;
        true
    }

    /// Remove a whole group and everything under it.
    ///
    /// Returns `true` if the group existed.
    pub fn remove_group(&mut self, group: &str) -> bool {
        let before = self.root.groups.len();
        self.root.groups.retain(|g| g.name != group);
        let removed = self.root.groups.len() != before;
        if removed {
            self.dirty = true;
        }
        removed
    }

    /// Summaries of every entry in `group`, sorted by service then user.
    pub fn summaries(&self, group: &str) -> Vec<EntrySummary> {
        let mut list: Vec<EntrySummary> = self
            .root
            .group(group)
            .map(|g| g.entries.iter().map(EntrySummary::from).collect())
            .unwrap_or_default();
        list.sort_by(|a, b| {
            a.service_name
                .cmp(&b.service_name)
                .then_with(|| a.user_name.cmp(&b.user_name))
        });
        list
    }

    /// Number of entries in the whole tree.
    pub fn entry_count(&self) -> usize {
        self.root.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_database_is_clean_and_empty() {
        let db = KeePassDatabase::new();
        assert!(!db.is_dirty());
        assert_eq!(db.entry_count(), 0);
    }

    #[test]
    fn upsert_creates_group_and_entry() {
        let mut db = KeePassDatabase::new();
        db.upsert_entry(ROOT_GROUP_NAME, "svc", Some("alice"), Some("pw"));

        assert!(db.is_dirty());
        let entry = db.find_entry(ROOT_GROUP_NAME, "svc", Some("alice")).unwrap();
        assert!(entry.password.as_ref().unwrap().matches("pw"));
    }

    #[test]
    fn upsert_with_identical_values_does_not_dirty() {
        let mut db = KeePassDatabase::new();
        db.upsert_entry(ROOT_GROUP_NAME, "svc", Some("alice"), Some("pw"));
        db.mark_saved();

        db.upsert_entry(ROOT_GROUP_NAME, "svc", Some("alice"), Some("pw"));
        assert!(!db.is_dirty());

        db.upsert_entry(ROOT_GROUP_NAME, "svc", Some("alice"), Some("pw2"));
        assert!(db.is_dirty());
    }

    #[test]
    fn upsert_for_another_user_adds_an_entry() {
        let mut db = KeePassDatabase::new();
        db.upsert_entry(ROOT_GROUP_NAME, "svc", Some("alice"), Some("pw"));
        db.upsert_entry(ROOT_GROUP_NAME, "svc", Some("bob"), Some("pw"));

        assert_eq!(db.entry_count(), 2);
        let alice = db.find_entry(ROOT_GROUP_NAME, "svc", Some("alice")).unwrap();
        assert_eq!(alice.user_name.as_deref(), Some("alice"));
    }

    #[test]
    fn remove_missing_entry_is_not_a_change() {
        let mut db = KeePassDatabase::new();
        assert!(!db.remove_entry(ROOT_GROUP_NAME, "svc", None));
        assert!(!db.is_dirty());
    }

    #[test]
    fn remove_group_reports_whether_it_existed() {
        let mut db = KeePassDatabase::new();
        assert!(!db.remove_group(ROOT_GROUP_NAME));
        assert!(!db.is_dirty());

        db.upsert_entry(ROOT_GROUP_NAME, "svc", None, Some("pw"));
        db.mark_saved();
        assert!(db.remove_group(ROOT_GROUP_NAME));
        assert!(db.is_dirty());
        assert_eq!(db.entry_count(), 0);
    }

    #[test]
    fn summaries_are_sorted() {
        let mut db = KeePassDatabase::new();
        db.upsert_entry(ROOT_GROUP_NAME, "zeta", Some("u"), Some("1"));
        db.upsert_entry(ROOT_GROUP_NAME, "alpha", Some("b"), Some("2"));
        db.upsert_entry(ROOT_GROUP_NAME, "alpha", Some("a"), None);

        let list = db.summaries(ROOT_GROUP_NAME);
        let keys: Vec<_> = list
            .iter()
            .map(|s| (s.service_name.as_str(), s.user_name.as_deref()))
            .collect();
        assert_eq!(
            keys,
            vec![("alpha", Some("a")), ("alpha", Some("b")), ("zeta", Some("u"))]
        );
        assert!(!list[0].has_password);
    }
}
