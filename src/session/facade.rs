use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use std::ops::Index;

use crate::error::SessionError;
use crate::session::cookie::CookieJar;
use crate::session::entry::Entry;
use crate::session::flash::{Flash, FlashCache};
use crate::session::schema::{DefaultFlash, Dict, Schema};
use crate::session::storage::{read_value, to_json, CookieStorage, SessionStore, NULL};

/// Per-request session handle
///
/// Wraps a [`CookieStorage`] with key checks from the schema `T` and owns the
/// flash cache for the request, so every [`Session::flash`] view shares it.
#[derive(Debug)]
pub struct Session<J, T: Schema = Dict> {
    storage: CookieStorage<J>,
    flash_cache: FlashCache,
    _schema: PhantomData<T>,
}

impl<J: CookieJar, T: Schema> Session<J, T> {
    #[must_use]
    pub fn new(storage: CookieStorage<J>) -> Self {
        Self {
            storage,
            flash_cache: FlashCache::new(),
            _schema: PhantomData,
        }
    }

    /// `false` for absent, `null` and out-of-schema keys
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        T::allows(key) && self.storage.has(key)
    }

    /// # Errors
    ///
    /// Returns an error for keys outside the schema or values that do not
    /// deserialize into `V`
    pub fn get<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>, SessionError> {
        T::check_key(key)?;
        read_value(key, self.storage.value(key))
    }

    /// # Errors
    ///
    /// Returns an error when the schema rejects the key or value, or
    /// persisting fails
    pub fn set<V: Serialize>(&mut self, key: &str, value: V) -> Result<(), SessionError> {
        self.insert_value(key, to_json(value)?)
    }

    /// Remove `key`, or everything when given `None`
    ///
    /// # Errors
    ///
    /// Returns an error for keys outside the schema or a failed persist
    pub fn delete<'k>(&mut self, key: impl Into<Option<&'k str>>) -> Result<(), SessionError> {
        self.remove_value(key.into())
    }

    /// # Errors
    ///
    /// Returns an error if persisting fails
    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.remove_value(None)
    }

    pub fn entry<'a>(&'a mut self, key: &'a str) -> Entry<'a, Self> {
        Entry::new(self, key)
    }

    /// Deserialize the whole map into a typed view
    ///
    /// # Errors
    ///
    /// Returns an error if the map does not fit `D`
    pub fn snapshot<D: DeserializeOwned>(&self) -> Result<D, SessionError> {
        D::deserialize(Value::Object(self.storage.data().clone())).map_err(|source| {
            SessionError::Deserialize {
                key: String::new(),
                source,
            }
        })
    }

    /// Flash view with the conventional string keys
    pub fn flash(&mut self) -> Flash<'_, CookieStorage<J>, DefaultFlash> {
        self.flash_as()
    }

    /// Flash view constrained by a custom schema
    pub fn flash_as<F: Schema>(&mut self) -> Flash<'_, CookieStorage<J>, F> {
        Flash::new(&mut self.storage, &mut self.flash_cache)
    }

    #[must_use]
    pub fn storage(&self) -> &CookieStorage<J> {
        &self.storage
    }

    #[must_use]
    pub fn into_storage(self) -> CookieStorage<J> {
        self.storage
    }
}

impl<J: CookieJar, T: Schema> SessionStore for Session<J, T> {
    fn value(&self, key: &str) -> Option<&Value> {
        if T::allows(key) {
            self.storage.value(key)
        } else {
            None
        }
    }

    fn insert_value(&mut self, key: &str, value: Value) -> Result<(), SessionError> {
        T::check_key(key)?;
        T::check_value(key, &value)?;
        self.storage.insert_value(key, value)
    }

    fn remove_value(&mut self, key: Option<&str>) -> Result<(), SessionError> {
        if let Some(key) = key {
            T::check_key(key)?;
        }
        self.storage.remove_value(key)
    }
}

impl<J: CookieJar, T: Schema> Index<&str> for Session<J, T> {
    type Output = Value;

    /// `Value::Null` for absent and out-of-schema keys
    fn index(&self, key: &str) -> &Value {
        self.value(key).unwrap_or(&NULL)
    }
}
