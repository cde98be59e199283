//! Error types for cookie sessions
//!
//! Two families live here. [`SessionError`] is what callers see: configuration
//! problems, schema violations and codec failures that are not a plain bad
//! cookie. [`InvalidToken`] enumerates the tamper/format classes the token
//! codec recognises; those never reach the caller as errors and only show up
//! as [`crate::token::Decoded::Invalid`].

use std::fmt;

/// Errors surfaced by the session layer
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No secret configured outside of test/development mode
    #[error("Please set {var} as an environment variable")]
    MissingSecret { var: &'static str },

    /// Key rejected by a closed schema
    #[error("Unknown session key: {0}")]
    UnknownKey(String),

    /// Value rejected by the schema for the given key
    #[error("Invalid value for session key {key}: expected {expected}")]
    InvalidValue { key: String, expected: &'static str },

    /// Session data could not be serialized into a token
    #[error("Failed to serialize session data: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A stored value did not match the requested type
    #[error("Failed to deserialize session value for {key}: {source}")]
    Deserialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Cryptographic failure that is not attributable to the incoming cookie
    #[error("Session crypto failure: {0}")]
    Crypto(#[from] anyhow::Error),

    /// Settings file could not be read or parsed
    #[error("Failed to load settings: {0}")]
    Settings(String),
}

/// Reasons a session token is discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidToken {
    /// Not three base64url segments, or a segment that is not JSON
    Malformed,
    /// Header names an algorithm other than HS256
    UnsupportedAlgorithm,
    /// HMAC does not match the header and payload
    BadSignature,
    /// Encrypted payload failed to decrypt
    Undecryptable,
    /// Verified payload is not a JSON object
    NotAnObject,
}

impl fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidToken::Malformed => write!(f, "malformed token"),
            InvalidToken::UnsupportedAlgorithm => write!(f, "unsupported token algorithm"),
            InvalidToken::BadSignature => write!(f, "signature mismatch"),
            InvalidToken::Undecryptable => write!(f, "payload could not be decrypted"),
            InvalidToken::NotAnObject => write!(f, "payload is not an object"),
        }
    }
}
