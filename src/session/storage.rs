//! Cookie Storage
//!
//! Owns one named cookie for the lifetime of a request. The cookie is decoded
//! once at construction; after that every mutation re-encodes the whole map
//! and writes it back to the jar immediately.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::ops::Index;

use crate::error::SessionError;
use crate::session::config::{SessionConfig, SessionOptions};
use crate::session::cookie::{CookieJar, CookieSetOptions, COOKIE_NAME};
use crate::session::entry::Entry;
use crate::token::{Decoded, SessionData, TokenCodec};

/// Browsers drop cookies larger than this
const MAX_COOKIE_BYTES: usize = 4096;

pub(crate) static NULL: Value = Value::Null;

/// Untyped key/value access shared by [`CookieStorage`] and
/// [`crate::session::Session`]; [`crate::session::Flash`] layers on top of it.
pub trait SessionStore {
    /// Stored value, if any
    fn value(&self, key: &str) -> Option<&Value>;

    /// Insert and persist
    ///
    /// # Errors
    ///
    /// Returns an error if the value is rejected or persisting fails
    fn insert_value(&mut self, key: &str, value: Value) -> Result<(), SessionError>;

    /// Remove one key, or everything when `key` is `None`, and persist
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails
    fn remove_value(&mut self, key: Option<&str>) -> Result<(), SessionError>;

    /// `true` unless the key is absent or holds `null`
    fn contains(&self, key: &str) -> bool {
        self.value(key).is_some_and(|value| !value.is_null())
    }
}

/// Deserialize an optional stored value; `null` reads as absent
pub(crate) fn read_value<V: DeserializeOwned>(
    key: &str,
    value: Option<&Value>,
) -> Result<Option<V>, SessionError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => V::deserialize(value)
            .map(Some)
            .map_err(|source| SessionError::Deserialize {
                key: key.to_string(),
                source,
            }),
    }
}

pub(crate) fn to_json<V: Serialize>(value: V) -> Result<Value, SessionError> {
    serde_json::to_value(value).map_err(SessionError::Serialize)
}

/// Session map backed by a single signed cookie
#[derive(Debug)]
pub struct CookieStorage<J> {
    jar: J,
    codec: TokenCodec,
    name: String,
    set_options: CookieSetOptions,
    data: SessionData,
}

impl<J: CookieJar> CookieStorage<J> {
    /// Read and verify the session cookie from `jar`
    ///
    /// A missing, foreign or tampered cookie yields an empty session.
    ///
    /// # Errors
    ///
    /// Returns an error only for codec failures unrelated to the cookie value
    pub fn new(jar: J, config: &SessionConfig) -> Result<Self, SessionError> {
        let name = config
            .options
            .cookie_name
            .clone()
            .unwrap_or_else(|| COOKIE_NAME.to_string());
        let set_options = config
            .options
            .cookie_set_options
            .merged_over(&CookieSetOptions::defaults_for(config.environment));

        let mut storage = Self {
            jar,
            codec: TokenCodec::new(&config.secret, config.token_mode),
            name,
            set_options,
            data: SessionData::new(),
        };
        storage.restore()?;
        Ok(storage)
    }

    /// Resolve the secret from the environment, then construct
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingSecret`] when no secret is configured
    pub fn from_env(jar: J, options: SessionOptions) -> Result<Self, SessionError> {
        Self::new(jar, &SessionConfig::from_env(options)?)
    }

    fn restore(&mut self) -> Result<(), SessionError> {
        let raw = self.jar.get(&self.name);
        match self.codec.decode(raw.as_deref())? {
            Decoded::Valid(data) => self.data = data,
            Decoded::Absent => {}
            Decoded::Invalid(reason) => {
                log::debug!(
                    "Ignoring session cookie '{}' ({reason}); starting empty",
                    self.name
                );
            }
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), SessionError> {
        let token = self.codec.encode(&self.data)?.into_string();
        if token.len() > MAX_COOKIE_BYTES {
            log::warn!(
                "Session cookie '{}' is {} bytes, over the {MAX_COOKIE_BYTES} byte browser limit",
                self.name,
                token.len()
            );
        }
        log::debug!(
            "Persisting session cookie '{}': keys={}, bytes={}",
            self.name,
            self.data.len(),
            token.len()
        );
        self.jar.set(&self.name, token, &self.set_options);
        Ok(())
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.contains(key)
    }

    /// # Errors
    ///
    /// Returns an error if the stored value does not deserialize into `V`
    pub fn get<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>, SessionError> {
        read_value(key, self.data.get(key))
    }

    /// # Errors
    ///
    /// Returns an error if serialization or persisting fails
    pub fn set<V: Serialize>(&mut self, key: &str, value: V) -> Result<(), SessionError> {
        self.insert_value(key, to_json(value)?)
    }

    /// Remove `key`, or clear the whole map when given `None`
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails
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

    #[must_use]
    pub fn data(&self) -> &SessionData {
        &self.data
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.name
    }

    /// Options sent with every write, after merging over the defaults
    #[must_use]
    pub fn set_options(&self) -> &CookieSetOptions {
        &self.set_options
    }

    #[must_use]
    pub fn jar(&self) -> &J {
        &self.jar
    }

    #[must_use]
    pub fn into_jar(self) -> J {
        self.jar
    }
}

impl<J: CookieJar> SessionStore for CookieStorage<J> {
    fn value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    fn insert_value(&mut self, key: &str, value: Value) -> Result<(), SessionError> {
        self.data.insert(key.to_owned(), value);
        self.save()
    }

    fn remove_value(&mut self, key: Option<&str>) -> Result<(), SessionError> {
        match key {
            Some(key) => {
                self.data.remove(key);
            }
            None => self.data.clear(),
        }
        self.save()
    }
}

impl<J: CookieJar> Index<&str> for CookieStorage<J> {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.data.get(key).unwrap_or(&NULL)
    }
}
