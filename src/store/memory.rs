//! A credential store that never touches the disk.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::CredentialStore;
use crate::credentials::{CredentialAttributes, Credentials};

type Key = (String, Option<String>);

/// Credentials kept only in process memory.
///
/// There is no file and no main key, so `mark_dirty` does nothing.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    map: Mutex<BTreeMap<Key, Credentials>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }

    pub fn clear(&self) {
        self.map.lock().clear();
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, attributes: &CredentialAttributes) -> Option<Credentials> {
        let map = self.map.lock();
        let service = &attributes.service_name;
        match attributes.user_name() {
            Some(user) => map.get(&(service.clone(), Some(user.to_string()))).cloned(),
            None => map
                .iter()
                .find(|((s, _), _)| s == service)
                .map(|(_, c)| c.clone()),
        }
    }

    fn set(&self, attributes: &CredentialAttributes, credentials: Option<Credentials>) {
        let mut map = self.map.lock();
        let service = attributes.service_name.clone();

        let Some(credentials) = credentials.filter(|c| !c.is_empty()) else {
            match attributes.user_name() {
                Some(user) => {
                    map.remove(&(service, Some(user.to_string())));
                }
                None => {
                    if let Some(key) = map.keys().find(|(s, _)| *s == service).cloned() {
                        map.remove(&key);
                    }
                }
            }
            return;
        };

        let user = attributes
            .user_name()
            .or(credentials.user_name.as_deref())
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        let stored = Credentials {
            user_name: user.clone(),
            password: credentials.password,
        };
        map.insert((service, user), stored);
    }

    fn mark_dirty(&self) {}
}
