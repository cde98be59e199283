//! Key schemas for sessions and flash namespaces
//!
//! A schema is a zero-sized marker type. It can close the key set and
//! constrain values; the open [`Dict`] schema accepts anything.

use serde_json::Value;

use crate::error::SessionError;

/// Declares which keys a session or flash namespace accepts
pub trait Schema {
    /// Allowed keys, or `None` for an open schema
    const KEYS: Option<&'static [&'static str]> = None;

    /// # Errors
    ///
    /// Returns [`SessionError::UnknownKey`] for keys outside [`Schema::KEYS`]
    fn check_key(key: &str) -> Result<(), SessionError> {
        match Self::KEYS {
            Some(keys) if !keys.contains(&key) => Err(SessionError::UnknownKey(key.to_string())),
            _ => Ok(()),
        }
    }

    /// # Errors
    ///
    /// Returns [`SessionError::InvalidValue`] when the value has the wrong shape
    fn check_value(_key: &str, _value: &Value) -> Result<(), SessionError> {
        Ok(())
    }

    fn allows(key: &str) -> bool {
        Self::check_key(key).is_ok()
    }
}

/// Open schema: any key, any JSON value
#[derive(Debug, Clone, Copy)]
pub enum Dict {}

impl Schema for Dict {}

/// Conventional flash keys, all string-valued
#[derive(Debug, Clone, Copy)]
pub enum DefaultFlash {}

impl DefaultFlash {
    pub const SUCCESS: &'static str = "success";
    pub const NOTICE: &'static str = "notice";
    pub const ALERT: &'static str = "alert";
    pub const ERROR: &'static str = "error";
}

impl Schema for DefaultFlash {
    const KEYS: Option<&'static [&'static str]> = Some(&[
        DefaultFlash::SUCCESS,
        DefaultFlash::NOTICE,
        DefaultFlash::ALERT,
        DefaultFlash::ERROR,
    ]);

    fn check_value(key: &str, value: &Value) -> Result<(), SessionError> {
        if value.is_string() || value.is_null() {
            Ok(())
        } else {
            Err(SessionError::InvalidValue {
                key: key.to_string(),
                expected: "a string",
            })
        }
    }
}
