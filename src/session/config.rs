use serde::Deserialize;

use crate::error::SessionError;
use crate::secret::{Environment, SecretKeyBase};
use crate::session::cookie::CookieSetOptions;
use crate::token::TokenMode;

/// Caller-facing options: cookie name and cookie-set options
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Defaults to [`crate::session::COOKIE_NAME`]
    pub cookie_name: Option<String>,
    /// Merged over the environment defaults
    pub cookie_set_options: CookieSetOptions,
}

impl SessionOptions {
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_cookie_set_options(mut self, options: CookieSetOptions) -> Self {
        self.cookie_set_options = options;
        self
    }
}

/// Everything a [`crate::session::CookieStorage`] needs at construction
///
/// The secret is injected here; nothing below this type reads the process
/// environment.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub(crate) secret: SecretKeyBase,
    pub(crate) environment: Environment,
    pub(crate) options: SessionOptions,
    pub(crate) token_mode: TokenMode,
}

impl SessionConfig {
    /// Production environment, encrypted tokens, default options
    #[must_use]
    pub fn new(secret: SecretKeyBase) -> Self {
        Self {
            secret,
            environment: Environment::default(),
            options: SessionOptions::default(),
            token_mode: TokenMode::default(),
        }
    }

    /// Resolve secret and environment from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingSecret`] when no secret is available
    pub fn from_env(options: SessionOptions) -> Result<Self, SessionError> {
        let secret = SecretKeyBase::resolve()?;
        Ok(Self::new(secret)
            .with_environment(Environment::from_env())
            .with_options(options))
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_token_mode(mut self, mode: TokenMode) -> Self {
        self.token_mode = mode;
        self
    }

    #[must_use]
    pub fn secret(&self) -> &SecretKeyBase {
        &self.secret
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    #[must_use]
    pub fn token_mode(&self) -> TokenMode {
        self.token_mode
    }
}
