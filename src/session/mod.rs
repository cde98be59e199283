//! Cookie-backed sessions
//!
//! # Modules
//!
//! - [`cookie`] - Cookie-jar collaborator, cookie options, in-memory jar
//! - [`config`] - Session options and construction-time configuration
//! - [`storage`] - `CookieStorage`, the single-cookie session map
//! - [`entry`] - Per-key accessor
//! - [`schema`] - Key schemas for sessions and flash
//! - [`facade`] - `Session`, the typed per-request handle
//! - [`flash`] - Read-once flash messages
//! - [`manager`] - `CookieSessionStorage` factory
//! - [`actix`] - actix-web cookie jar (feature `actix`)

#[cfg(feature = "actix")]
pub mod actix;
pub mod config;
pub mod cookie;
pub mod entry;
pub mod facade;
pub mod flash;
pub mod manager;
pub mod schema;
pub mod storage;

// Re-export commonly used items for convenience
#[cfg(feature = "actix")]
pub use actix::ActixCookieJar;
pub use config::{SessionConfig, SessionOptions};
pub use cookie::{CookieJar, CookieSetOptions, MemoryJar, SameSite, StoredCookie, COOKIE_NAME};
pub use entry::Entry;
pub use facade::Session;
pub use flash::{Flash, FlashCache, FLASH_PREFIX};
pub use manager::CookieSessionStorage;
pub use schema::{DefaultFlash, Dict, Schema};
pub use storage::{CookieStorage, SessionStore};
