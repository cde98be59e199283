use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::secret::Environment;

/// Default name of the session cookie
pub const COOKIE_NAME: &str = "astro.session";

/// Cookie-jar collaborator
///
/// The session layer only needs to read one named value and write it back.
/// Framework adapters implement this over their request/response cookies.
pub trait CookieJar {
    /// Raw value of the named cookie, if the request carried one
    fn get(&self, name: &str) -> Option<String>;

    /// Queue the named cookie for the response
    fn set(&mut self, name: &str, value: String, options: &CookieSetOptions);
}

impl<J: CookieJar + ?Sized> CookieJar for &mut J {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }

    fn set(&mut self, name: &str, value: String, options: &CookieSetOptions) {
        (**self).set(name, value, options);
    }
}

/// `SameSite` cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Attributes passed to the jar with every write
///
/// Every field is optional; unset fields are left to the jar/browser. Caller
/// supplied options are merged over [`CookieSetOptions::defaults_for`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSetOptions {
    pub http_only: Option<bool>,
    pub secure: Option<bool>,
    pub same_site: Option<SameSite>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    /// Seconds
    pub max_age: Option<i64>,
}

impl CookieSetOptions {
    /// `HttpOnly` always, `Secure` only in production-like environments
    #[must_use]
    pub fn defaults_for(environment: Environment) -> Self {
        Self {
            http_only: Some(true),
            secure: Some(environment.is_production_like()),
            ..Self::default()
        }
    }

    /// Overlay `self` on `base`: every field set here wins
    #[must_use]
    pub fn merged_over(&self, base: &Self) -> Self {
        Self {
            http_only: self.http_only.or(base.http_only),
            secure: self.secure.or(base.secure),
            same_site: self.same_site.or(base.same_site),
            path: self.path.clone().or_else(|| base.path.clone()),
            domain: self.domain.clone().or_else(|| base.domain.clone()),
            expires: self.expires.or(base.expires),
            max_age: self.max_age.or(base.max_age),
        }
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = Some(http_only);
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Build an actix-web cookie carrying these attributes
    #[cfg(feature = "actix")]
    #[must_use]
    pub fn to_cookie(&self, name: &str, value: String) -> actix_web::cookie::Cookie<'static> {
        use actix_web::cookie::time::{Duration, OffsetDateTime};
        use actix_web::cookie::{Cookie, SameSite as ActixSameSite};

        let mut builder = Cookie::build(name.to_owned(), value);
        if let Some(http_only) = self.http_only {
            builder = builder.http_only(http_only);
        }
        if let Some(secure) = self.secure {
            builder = builder.secure(secure);
        }
        if let Some(same_site) = self.same_site {
            builder = builder.same_site(match same_site {
                SameSite::Strict => ActixSameSite::Strict,
                SameSite::Lax => ActixSameSite::Lax,
                SameSite::None => ActixSameSite::None,
            });
        }
        if let Some(path) = &self.path {
            builder = builder.path(path.clone());
        }
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(max_age) = self.max_age {
            builder = builder.max_age(Duration::seconds(max_age));
        }
        if let Some(expires) = self.expires {
            match OffsetDateTime::from_unix_timestamp(expires.timestamp()) {
                Ok(at) => builder = builder.expires(at),
                Err(e) => log::warn!("Ignoring out-of-range cookie expiry {expires}: {e}"),
            }
        }
        builder.finish()
    }
}

/// A cookie as recorded by [`MemoryJar`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCookie {
    pub value: String,
    pub options: CookieSetOptions,
}

/// In-process cookie jar
///
/// Useful outside HTTP handlers and in tests: reads see the latest write, and
/// every write is counted.
#[derive(Debug, Clone, Default)]
pub struct MemoryJar {
    cookies: HashMap<String, StoredCookie>,
    writes: usize,
}

impl MemoryJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cookie as if it arrived with the request
    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: impl Into<String>) -> Self {
        self.cookies.insert(
            name.to_owned(),
            StoredCookie {
                value: value.into(),
                options: CookieSetOptions::default(),
            },
        );
        self
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|cookie| cookie.value.as_str())
    }

    /// Options used by the latest write to `name`
    #[must_use]
    pub fn options(&self, name: &str) -> Option<&CookieSetOptions> {
        self.cookies.get(name).map(|cookie| &cookie.options)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    /// Number of `set` calls seen so far
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl CookieJar for MemoryJar {
    fn get(&self, name: &str) -> Option<String> {
        self.value(name).map(str::to_owned)
    }

    fn set(&mut self, name: &str, value: String, options: &CookieSetOptions) {
        self.writes += 1;
        self.cookies.insert(
            name.to_owned(),
            StoredCookie {
                value,
                options: options.clone(),
            },
        );
    }
}
