//! Pre-built secrets, configurations and session maps

use serde_json::json;

use crate::secret::{Environment, SecretKeyBase};
use crate::session::config::SessionConfig;
use crate::token::{SessionData, TokenMode};

pub use super::constants::{CUSTOM_COOKIE_NAME, OTHER_SECRET, TEST_SECRET};

/// Wrap a known non-empty secret
///
/// # Panics
///
/// Panics if `value` is empty
#[must_use]
pub fn secret(value: &str) -> SecretKeyBase {
    SecretKeyBase::new(value).expect("fixture secrets are non-empty")
}

/// Route `log` output through the test harness; safe to call repeatedly
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Test environment, [`TEST_SECRET`], encrypted tokens, default options
///
/// Also installs the test logger.
#[must_use]
pub fn test_config() -> SessionConfig {
    init_logging();
    SessionConfig::new(secret(TEST_SECRET)).with_environment(Environment::Test)
}

/// Same as [`test_config`] with readable signed tokens
#[must_use]
pub fn signed_config() -> SessionConfig {
    test_config().with_token_mode(TokenMode::Signed)
}

/// A map exercising every JSON value shape
#[must_use]
pub fn sample_data() -> SessionData {
    let value = json!({
        "count": 2,
        "user": "ada",
        "admin": false,
        "ratio": 0.5,
        "roles": ["reader", "writer"],
        "profile": {"email": "ada@example.com", "verified": true},
        "flash.notice": "welcome back",
    });
    match value {
        serde_json::Value::Object(map) => map,
        _ => SessionData::new(),
    }
}
