use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::SessionError;
use crate::session::storage::{read_value, to_json, SessionStore};

/// A single key of a session, bound for reading and writing
///
/// Obtained from `entry(key)` on a storage or session. Writes go through the
/// owning store, so they persist exactly like a direct `set`.
pub struct Entry<'a, S: SessionStore + ?Sized> {
    store: &'a mut S,
    key: &'a str,
}

impl<'a, S: SessionStore + ?Sized> Entry<'a, S> {
    pub(crate) fn new(store: &'a mut S, key: &'a str) -> Self {
        Self { store, key }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        self.key
    }

    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.store.value(self.key)
    }

    #[must_use]
    pub fn has(&self) -> bool {
        self.store.contains(self.key)
    }

    /// # Errors
    ///
    /// Returns an error if the stored value does not deserialize into `V`
    pub fn get<V: DeserializeOwned>(&self) -> Result<Option<V>, SessionError> {
        read_value(self.key, self.value())
    }

    /// # Errors
    ///
    /// Returns an error if the value is rejected or persisting fails
    pub fn set<V: Serialize>(&mut self, value: V) -> Result<(), SessionError> {
        self.store.insert_value(self.key, to_json(value)?)
    }

    /// # Errors
    ///
    /// Returns an error if persisting fails
    pub fn delete(self) -> Result<(), SessionError> {
        self.store.remove_value(Some(self.key))
    }
}
