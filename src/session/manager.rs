//! Session factory
//!
//! `CookieSessionStorage` is built once at startup, resolving the secret at
//! the composition boundary, and then hands out one [`Session`] per request
//! from that request's cookie jar.

use std::marker::PhantomData;

use crate::error::SessionError;
use crate::session::config::{SessionConfig, SessionOptions};
use crate::session::cookie::CookieJar;
use crate::session::facade::Session;
use crate::session::schema::{Dict, Schema};
use crate::session::storage::CookieStorage;

/// Produces request-scoped sessions sharing one configuration
#[derive(Debug)]
pub struct CookieSessionStorage<T: Schema = Dict> {
    config: SessionConfig,
    _schema: PhantomData<fn() -> T>,
}

impl<T: Schema> Clone for CookieSessionStorage<T> {
    fn clone(&self) -> Self {
        Self::with_config(self.config.clone())
    }
}

// =============================================================================
// Construction
// =============================================================================

impl<T: Schema> CookieSessionStorage<T> {
    /// Resolve the secret and environment from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingSecret`] outside test and development
    /// when `SECRET_KEY_BASE` is unset
    pub fn new(options: SessionOptions) -> Result<Self, SessionError> {
        Ok(Self::with_config(SessionConfig::from_env(options)?))
    }

    #[must_use]
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            _schema: PhantomData,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

// =============================================================================
// Session Extraction
// =============================================================================

impl<T: Schema> CookieSessionStorage<T> {
    /// Decode the session carried by `jar`
    ///
    /// # Errors
    ///
    /// Returns an error only for codec failures unrelated to the cookie value
    pub fn get_session<J: CookieJar>(&self, jar: J) -> Result<Session<J, T>, SessionError> {
        let storage = CookieStorage::new(jar, &self.config)?;
        Ok(Session::new(storage))
    }
}
