#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Sessions stored in a single signed, optionally encrypted cookie
//!
//! ```rust
//! use cookie_session::{CookieSessionStorage, MemoryJar, SecretKeyBase, SessionConfig};
//!
//! let secret = SecretKeyBase::new("a long random secret").unwrap();
//! let factory: CookieSessionStorage = CookieSessionStorage::with_config(SessionConfig::new(secret));
//!
//! let mut jar = MemoryJar::new();
//! let mut session = factory.get_session(&mut jar).unwrap();
//! session.set("count", 1).unwrap();
//! session.flash().set_notice("saved").unwrap();
//!
//! let mut next = factory.get_session(&mut jar).unwrap();
//! assert_eq!(next.get::<i64>("count").unwrap(), Some(1));
//! assert_eq!(next.flash().notice().unwrap().as_deref(), Some("saved"));
//! ```

/// Version of the cookie-session crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod secret;
pub mod session;
pub mod settings;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod token;
pub mod utils;

/// Re-export commonly used items
pub use error::{InvalidToken, SessionError};
pub use secret::{Environment, SecretKeyBase};
pub use session::{
    CookieJar, CookieSessionStorage, CookieSetOptions, CookieStorage, DefaultFlash, Dict, Flash,
    MemoryJar, Schema, Session, SessionConfig, SessionOptions,
};
pub use settings::Settings;
pub use token::{Decoded, SessionData, SignedToken, TokenCodec, TokenMode};
