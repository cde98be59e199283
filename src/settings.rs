use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SessionError;
use crate::session::config::{SessionConfig, SessionOptions};
use crate::session::cookie::{CookieSetOptions, SameSite, COOKIE_NAME};
use crate::token::TokenMode;

/// Directory searched for an overriding `Settings.toml`
pub const SETTINGS_DIR_VAR: &str = "COOKIE_SESSION_SETTINGS_DIR";

const SETTINGS_FILE: &str = "Settings.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub session: SessionSettings,
    pub cookies: CookieSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionSettings {
    pub cookie_name: String,
    /// Encrypt the payload before signing; `false` keeps it readable
    pub encrypt: bool,
}

/// Cookie attributes; unset fields fall back to the environment defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CookieSettings {
    pub http_only: Option<bool>,
    pub secure: Option<bool>,
    pub same_site: Option<SameSite>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: COOKIE_NAME.to_string(),
            encrypt: true,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file exists but cannot be read or parsed
    pub fn load() -> Result<Self, SessionError> {
        Self::initialize_environment();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        Ok(settings)
    }

    /// Load a single settings file, then apply environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_path(path: &Path) -> Result<Self, SessionError> {
        let mut settings = Self::read_file(path)?;
        Self::apply_env_overrides(&mut settings);
        Ok(settings)
    }

    /// # Errors
    ///
    /// Returns an error if the TOML does not parse into settings
    pub fn from_toml_str(content: &str) -> Result<Self, SessionError> {
        basic_toml::from_str(content).map_err(|e| SessionError::Settings(e.to_string()))
    }

    fn initialize_environment() {
        Self::load_env_file();
        if let Err(e) = env_logger::try_init() {
            log::debug!("Logger already initialized: {e}");
        }
    }

    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `COOKIE_SESSION_SETTINGS_DIR` (if set and present)
    /// 3. Settings.toml in the current directory (if present)
    /// 4. Default settings
    fn load_base_settings() -> Result<Self, SessionError> {
        let mut settings = Self::default();

        let default_config_path = PathBuf::from(SETTINGS_FILE);
        if default_config_path.exists() {
            settings = Self::read_file(&default_config_path)?;
            log::info!("Loaded base settings from {}", default_config_path.display());
        }

        if let Ok(settings_dir) = std::env::var(SETTINGS_DIR_VAR) {
            let override_path = Path::new(&settings_dir).join(SETTINGS_FILE);
            if override_path.exists() {
                settings = Self::read_file(&override_path)?;
                log::info!("Overriding settings from {}", override_path.display());
            } else {
                log::info!(
                    "{SETTINGS_DIR_VAR} set but no {SETTINGS_FILE} found at: {}",
                    override_path.display()
                );
            }
        }

        Ok(settings)
    }

    fn read_file(path: &Path) -> Result<Self, SessionError> {
        let content = fs::read_to_string(path)
            .map_err(|e| SessionError::Settings(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    fn apply_env_overrides(settings: &mut Self) {
        Self::apply_session_env_overrides(&mut settings.session);
        Self::apply_cookie_env_overrides(&mut settings.cookies);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    pub fn apply_session_env_overrides(session_settings: &mut SessionSettings) {
        if let Ok(cookie_name) = std::env::var("SESSION_COOKIE_NAME") {
            if !cookie_name.is_empty() {
                session_settings.cookie_name = cookie_name;
            }
        }
        if let Some(encrypt) = Self::parse_env::<bool>("SESSION_ENCRYPT") {
            session_settings.encrypt = encrypt;
        }
    }

    pub fn apply_cookie_env_overrides(cookie_settings: &mut CookieSettings) {
        Self::apply_optional_env_override("COOKIE_SECURE", &mut cookie_settings.secure);
        Self::apply_optional_env_override("COOKIE_HTTP_ONLY", &mut cookie_settings.http_only);
        Self::apply_optional_env_override("COOKIE_MAX_AGE", &mut cookie_settings.max_age_seconds);
        if let Ok(path) = std::env::var("COOKIE_PATH") {
            cookie_settings.path = Some(path);
        }
        if let Ok(domain) = std::env::var("COOKIE_DOMAIN") {
            cookie_settings.domain = Some(domain);
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Unparsable values are ignored
    fn apply_optional_env_override<T: std::str::FromStr>(env_var: &str, target: &mut Option<T>) {
        if let Some(value) = Self::parse_env(env_var) {
            *target = Some(value);
        }
    }

    fn parse_env<T: std::str::FromStr>(env_var: &str) -> Option<T> {
        let raw = std::env::var(env_var).ok()?;
        let parsed = raw.trim().parse::<T>().ok();
        if parsed.is_none() {
            log::warn!("Ignoring unparsable {env_var}={raw}");
        }
        parsed
    }

    /// Load environment variables from a `.env` file without replacing
    /// variables that are already set
    fn load_env_file() {
        if let Ok(contents) = fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    if std::env::var_os(key).is_none() {
                        std::env::set_var(key, value.trim());
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn token_mode(&self) -> TokenMode {
        if self.session.encrypt {
            TokenMode::Encrypted
        } else {
            TokenMode::Signed
        }
    }

    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        let cookies = &self.cookies;
        SessionOptions {
            cookie_name: Some(self.session.cookie_name.clone()),
            cookie_set_options: CookieSetOptions {
                http_only: cookies.http_only,
                secure: cookies.secure,
                same_site: cookies.same_site,
                path: cookies.path.clone(),
                domain: cookies.domain.clone(),
                expires: None,
                max_age: cookies.max_age_seconds,
            },
        }
    }

    /// Resolve the secret from the environment and build a session config
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingSecret`] when no secret is available
    pub fn into_config(self) -> Result<SessionConfig, SessionError> {
        let mode = self.token_mode();
        Ok(SessionConfig::from_env(self.session_options())?.with_token_mode(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::{ENVIRONMENT_VAR, SECRET_KEY_BASE_VAR};
    use serial_test::serial;
    use std::io::Write;

    // Helper function to clean all relevant environment variables for tests
    fn clean_env_vars() {
        for var in [
            "SESSION_COOKIE_NAME",
            "SESSION_ENCRYPT",
            "COOKIE_SECURE",
            "COOKIE_HTTP_ONLY",
            "COOKIE_PATH",
            "COOKIE_DOMAIN",
            "COOKIE_MAX_AGE",
            SETTINGS_DIR_VAR,
            SECRET_KEY_BASE_VAR,
            ENVIRONMENT_VAR,
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.session.cookie_name, COOKIE_NAME);
        assert!(settings.session.encrypt);
        assert_eq!(settings.cookies, CookieSettings::default());
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.token_mode(), TokenMode::Encrypted);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [session]
            encrypt = false

            [cookies]
            same_site = "lax"
            max_age_seconds = 3600
            "#,
        )
        .unwrap();

        assert_eq!(settings.session.cookie_name, COOKIE_NAME);
        assert_eq!(settings.token_mode(), TokenMode::Signed);
        assert_eq!(settings.cookies.same_site, Some(SameSite::Lax));
        assert_eq!(settings.cookies.max_age_seconds, Some(3600));
        assert_eq!(settings.cookies.secure, None);
    }

    #[test]
    fn test_invalid_toml_is_a_settings_error() {
        assert!(matches!(
            Settings::from_toml_str("[session\ncookie_name = 1"),
            Err(SessionError::Settings(_))
        ));
    }

    #[test]
    #[serial]
    fn test_cookie_env_overrides() {
        clean_env_vars();
        std::env::set_var("COOKIE_SECURE", "true");
        std::env::set_var("COOKIE_HTTP_ONLY", "false");
        std::env::set_var("COOKIE_MAX_AGE", "not-a-number");
        std::env::set_var("COOKIE_PATH", "/app");

        let mut cookies = CookieSettings::default();
        Settings::apply_cookie_env_overrides(&mut cookies);

        assert_eq!(cookies.secure, Some(true));
        assert_eq!(cookies.http_only, Some(false));
        assert_eq!(cookies.max_age_seconds, None);
        assert_eq!(cookies.path.as_deref(), Some("/app"));
        assert_eq!(cookies.domain, None);

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_session_env_overrides() {
        clean_env_vars();
        std::env::set_var("SESSION_COOKIE_NAME", "custom");
        std::env::set_var("SESSION_ENCRYPT", "false");

        let mut session = SessionSettings::default();
        Settings::apply_session_env_overrides(&mut session);

        assert_eq!(session.cookie_name, "custom");
        assert!(!session.encrypt);

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_load_from_path_then_env() {
        clean_env_vars();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\ncookie_name = \"from-file\"\n\n[cookies]\nsecure = false").unwrap();
        std::env::set_var("COOKIE_SECURE", "true");

        let settings = Settings::load_from_path(file.path()).unwrap();

        assert_eq!(settings.session.cookie_name, "from-file");
        assert_eq!(settings.cookies.secure, Some(true));

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_settings_dir_overrides_defaults() {
        clean_env_vars();
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            "[session]\ncookie_name = \"from-dir\"\n",
        )
        .unwrap();
        std::env::set_var(SETTINGS_DIR_VAR, dir.path());

        let settings = Settings::load().unwrap();
        assert_eq!(settings.session.cookie_name, "from-dir");

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_into_config() {
        clean_env_vars();
        std::env::set_var(ENVIRONMENT_VAR, "test");

        let mut settings = Settings::default();
        settings.session.encrypt = false;
        settings.cookies.path = Some("/".to_string());
        let config = settings.into_config().unwrap();

        assert_eq!(config.token_mode(), TokenMode::Signed);
        assert_eq!(config.options().cookie_name.as_deref(), Some(COOKIE_NAME));
        assert_eq!(
            config.options().cookie_set_options.path.as_deref(),
            Some("/")
        );

        clean_env_vars();
    }
}
