//! Shared test utilities
//!
//! Compiled for unit tests and, behind the `testing` feature, for
//! integration tests and downstream crates.
//!
//! ```rust
//! use cookie_session::testing::fixtures::{test_config, sample_data};
//! use cookie_session::session::{CookieStorage, MemoryJar};
//!
//! let mut storage = CookieStorage::new(MemoryJar::new(), &test_config()).unwrap();
//! for (key, value) in sample_data() {
//!     storage.set(&key, value).unwrap();
//! }
//! ```

pub mod fixtures;

/// Common test constants
pub mod constants {
    /// Secret used by most fixtures
    pub const TEST_SECRET: &str = "unit-test-secret-key-base";

    /// A second secret for tamper tests
    pub const OTHER_SECRET: &str = "some-other-secret-key-base";

    /// Cookie name used by custom-name tests
    pub const CUSTOM_COOKIE_NAME: &str = "myCookieName";
}

pub use constants::*;
