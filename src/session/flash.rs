//! Flash messages
//!
//! Values stored under `flash.<key>` that survive until the next read. The
//! first `get` removes the stored value and remembers it in a request-scoped
//! [`FlashCache`], so later reads in the same request see the same value
//! while the next request sees nothing.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::error::SessionError;
use crate::session::schema::{DefaultFlash, Schema};
use crate::session::storage::{read_value, to_json, SessionStore};

/// Namespace prefix for flash keys in the session map
pub const FLASH_PREFIX: &str = "flash.";

/// Storage key for a flash key
#[must_use]
pub fn key_for(key: &str) -> String {
    format!("{FLASH_PREFIX}{key}")
}

/// Values already consumed in this request
///
/// `None` entries record a read that found nothing.
#[derive(Debug, Clone, Default)]
pub struct FlashCache {
    consumed: HashMap<String, Option<Value>>,
}

impl FlashCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }

    fn lookup(&self, key: &str) -> Option<&Option<Value>> {
        self.consumed.get(key)
    }

    fn remember(&mut self, key: &str, value: Option<Value>) {
        self.consumed.insert(key.to_owned(), value);
    }

    fn forget(&mut self, key: &str) {
        self.consumed.remove(key);
    }
}

/// Read-once view over the `flash.` namespace of a store
pub struct Flash<'a, S: SessionStore + ?Sized, F: Schema = DefaultFlash> {
    store: &'a mut S,
    cache: &'a mut FlashCache,
    _schema: PhantomData<F>,
}

impl<'a, S: SessionStore + ?Sized, F: Schema> Flash<'a, S, F> {
    pub fn new(store: &'a mut S, cache: &'a mut FlashCache) -> Self {
        Self {
            store,
            cache,
            _schema: PhantomData,
        }
    }

    /// Whether a value is pending or was consumed earlier in this request
    ///
    /// Does not consume anything.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        if !F::allows(key) {
            return false;
        }
        match self.cache.lookup(key) {
            Some(cached) => cached.as_ref().is_some_and(|value| !value.is_null()),
            None => self.store.contains(&key_for(key)),
        }
    }

    /// Consume the value for `key`
    ///
    /// The first call removes it from the session; repeated calls in the same
    /// request return the cached result.
    ///
    /// # Errors
    ///
    /// Returns an error for keys outside the schema, values that do not
    /// deserialize into `V`, or a failed persist
    pub fn get<V: DeserializeOwned>(&mut self, key: &str) -> Result<Option<V>, SessionError> {
        let value = self.value(key)?;
        read_value(key, value.as_ref())
    }

    /// Untyped [`Flash::get`]
    ///
    /// # Errors
    ///
    /// Returns an error for keys outside the schema or a failed persist
    pub fn value(&mut self, key: &str) -> Result<Option<Value>, SessionError> {
        F::check_key(key)?;
        if let Some(cached) = self.cache.lookup(key) {
            return Ok(cached.clone());
        }

        let namespaced = key_for(key);
        let value = self.store.value(&namespaced).cloned();
        self.cache.remember(key, value.clone());
        self.store.remove_value(Some(&namespaced))?;
        log::trace!("Consumed flash '{key}' (present: {})", value.is_some());
        Ok(value)
    }

    /// Store a value for the next read
    ///
    /// # Errors
    ///
    /// Returns an error when the schema rejects the key or value, or
    /// persisting fails
    pub fn set<V: Serialize>(&mut self, key: &str, value: V) -> Result<(), SessionError> {
        F::check_key(key)?;
        let value = to_json(value)?;
        F::check_value(key, &value)?;
        self.cache.forget(key);
        self.store.insert_value(&key_for(key), value)
    }

    /// # Errors
    ///
    /// Returns an error for keys outside the schema or a failed persist
    pub fn delete(&mut self, key: &str) -> Result<(), SessionError> {
        F::check_key(key)?;
        self.cache.forget(key);
        self.store.remove_value(Some(&key_for(key)))
    }
}

macro_rules! default_flash_accessors {
    ($($name:ident, $setter:ident => $key:expr;)+) => {
        impl<S: SessionStore + ?Sized> Flash<'_, S, DefaultFlash> {
            $(
                #[doc = concat!("Consume the `", stringify!($name), "` message")]
                ///
                /// # Errors
                ///
                /// Returns an error if persisting fails or the stored value is not a string
                pub fn $name(&mut self) -> Result<Option<String>, SessionError> {
                    self.get($key)
                }

                #[doc = concat!("Store the `", stringify!($name), "` message")]
                ///
                /// # Errors
                ///
                /// Returns an error if persisting fails
                pub fn $setter(&mut self, message: impl Into<String>) -> Result<(), SessionError> {
                    self.set($key, message.into())
                }
            )+
        }
    };
}

default_flash_accessors! {
    success, set_success => DefaultFlash::SUCCESS;
    notice, set_notice => DefaultFlash::NOTICE;
    alert, set_alert => DefaultFlash::ALERT;
    error, set_error => DefaultFlash::ERROR;
}
