//! Secret Provider
//!
//! Resolves the key material used to sign and encrypt session tokens. The
//! lookup against the process environment happens here and nowhere else; the
//! rest of the crate receives a [`SecretKeyBase`] through
//! [`crate::session::SessionConfig`].

use std::fmt;

use once_cell::sync::OnceCell;

use crate::error::SessionError;

/// Environment variable holding the secret
pub const SECRET_KEY_BASE_VAR: &str = "SECRET_KEY_BASE";

/// Environment variable selecting test/development/production behaviour
pub const ENVIRONMENT_VAR: &str = "APP_ENV";

const TEST_SECRET: &str = "test-secret-key-base";
const DEVELOPMENT_SECRET: &str = "development-secret-key-base";

static CACHED_SECRET: OnceCell<SecretKeyBase> = OnceCell::new();

/// Runtime mode, read from [`ENVIRONMENT_VAR`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Test,
    Development,
    /// Anything else, including an unset variable
    #[default]
    Production,
}

impl Environment {
    /// Map a mode string onto an environment
    #[must_use]
    pub fn from_mode(mode: Option<&str>) -> Self {
        match mode.map(str::trim) {
            Some("test") => Environment::Test,
            Some("development") => Environment::Development,
            _ => Environment::Production,
        }
    }

    /// Read the mode from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_mode(std::env::var(ENVIRONMENT_VAR).ok().as_deref())
    }

    /// Whether cookies should default to `Secure`
    #[must_use]
    pub fn is_production_like(self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Signing key and encryption passphrase for session tokens
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKeyBase(String);

impl SecretKeyBase {
    /// Wrap an explicit secret
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingSecret`] if the secret is empty
    pub fn new(secret: impl Into<String>) -> Result<Self, SessionError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(SessionError::MissingSecret {
                var: SECRET_KEY_BASE_VAR,
            });
        }
        Ok(Self(secret))
    }

    /// Resolve the secret from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingSecret`] when `SECRET_KEY_BASE` is unset
    /// and the environment is neither `test` nor `development`
    pub fn resolve() -> Result<Self, SessionError> {
        Self::resolve_with(|var| std::env::var(var).ok())
    }

    /// Resolve the secret once per process and reuse it afterwards
    ///
    /// A failed resolution is not cached, so fixing the environment and
    /// calling again succeeds.
    ///
    /// # Errors
    ///
    /// Same as [`SecretKeyBase::resolve`]
    pub fn cached() -> Result<Self, SessionError> {
        CACHED_SECRET.get_or_try_init(Self::resolve).cloned()
    }

    /// Resolve the secret through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Same as [`SecretKeyBase::resolve`]
    pub fn resolve_with<F>(lookup: F) -> Result<Self, SessionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(SECRET_KEY_BASE_VAR).filter(|s| !s.is_empty()) {
            return Ok(Self(secret));
        }

        match Environment::from_mode(lookup(ENVIRONMENT_VAR).as_deref()) {
            Environment::Test => Ok(Self(TEST_SECRET.to_string())),
            Environment::Development => {
                log::warn!(
                    "Warning: Please set {SECRET_KEY_BASE_VAR} as an environment variable. Using the development fallback secret"
                );
                Ok(Self(DEVELOPMENT_SECRET.to_string()))
            }
            Environment::Production => Err(SessionError::MissingSecret {
                var: SECRET_KEY_BASE_VAR,
            }),
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKeyBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKeyBase(**redacted**)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_explicit_secret_returned_verbatim() {
        let secret = SecretKeyBase::resolve_with(lookup_from(&[
            (SECRET_KEY_BASE_VAR, "s3cr3t"),
            (ENVIRONMENT_VAR, "production"),
        ]))
        .unwrap();
        assert_eq!(secret.expose(), "s3cr3t");
    }

    #[test]
    fn test_explicit_secret_wins_over_test_fallback() {
        let secret = SecretKeyBase::resolve_with(lookup_from(&[
            (SECRET_KEY_BASE_VAR, "explicit"),
            (ENVIRONMENT_VAR, "test"),
        ]))
        .unwrap();
        assert_eq!(secret.expose(), "explicit");
    }

    #[test]
    fn test_test_mode_fallback() {
        let secret =
            SecretKeyBase::resolve_with(lookup_from(&[(ENVIRONMENT_VAR, "test")])).unwrap();
        assert_eq!(secret.expose(), TEST_SECRET);
    }

    #[test]
    fn test_development_mode_fallback() {
        let secret =
            SecretKeyBase::resolve_with(lookup_from(&[(ENVIRONMENT_VAR, "development")]))
                .unwrap();
        assert_eq!(secret.expose(), DEVELOPMENT_SECRET);
    }

    #[test]
    fn test_missing_secret_in_production_fails() {
        let result = SecretKeyBase::resolve_with(lookup_from(&[(ENVIRONMENT_VAR, "production")]));
        assert!(matches!(
            result,
            Err(SessionError::MissingSecret { var }) if var == SECRET_KEY_BASE_VAR
        ));
    }

    #[test]
    fn test_missing_secret_with_unset_mode_fails() {
        assert!(SecretKeyBase::resolve_with(lookup_from(&[])).is_err());
    }

    #[test]
    fn test_empty_secret_treated_as_unset() {
        let result = SecretKeyBase::resolve_with(lookup_from(&[(SECRET_KEY_BASE_VAR, "")]));
        assert!(result.is_err());
        assert!(SecretKeyBase::new("").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let secret = SecretKeyBase::new("do-not-print").unwrap();
        assert!(!format!("{secret:?}").contains("do-not-print"));
    }

    #[test]
    fn test_environment_modes() {
        assert_eq!(Environment::from_mode(Some("test")), Environment::Test);
        assert_eq!(
            Environment::from_mode(Some("development")),
            Environment::Development
        );
        assert_eq!(Environment::from_mode(Some("staging")), Environment::Production);
        assert_eq!(Environment::from_mode(None), Environment::Production);
        assert!(Environment::Production.is_production_like());
        assert!(!Environment::Development.is_production_like());
        assert!(!Environment::Test.is_production_like());
    }

    #[test]
    #[serial]
    fn test_cached_skips_failures_and_reuses_success() {
        std::env::remove_var(SECRET_KEY_BASE_VAR);
        std::env::set_var(ENVIRONMENT_VAR, "production");
        assert!(matches!(
            SecretKeyBase::cached(),
            Err(SessionError::MissingSecret { .. })
        ));

        std::env::set_var(SECRET_KEY_BASE_VAR, "first-secret");
        assert_eq!(SecretKeyBase::cached().unwrap().expose(), "first-secret");

        // later changes to the environment are not picked up
        std::env::set_var(SECRET_KEY_BASE_VAR, "second-secret");
        assert_eq!(SecretKeyBase::cached().unwrap().expose(), "first-secret");
        assert_eq!(SecretKeyBase::resolve().unwrap().expose(), "second-secret");

        std::env::remove_var(SECRET_KEY_BASE_VAR);
        std::env::remove_var(ENVIRONMENT_VAR);
    }
}
