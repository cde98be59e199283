//! actix-web integration
//!
//! [`ActixCookieJar`] reads the request's cookies once and collects every
//! session write as a `Set-Cookie` delta for the response.

use actix_web::cookie::{Cookie, CookieJar as ActixJar};
use actix_web::{HttpRequest, HttpResponseBuilder};

use crate::error::SessionError;
use crate::session::cookie::{CookieJar, CookieSetOptions};
use crate::session::facade::Session;
use crate::session::manager::CookieSessionStorage;
use crate::session::schema::Schema;

/// Cookie jar bridging an actix request and its response
#[derive(Debug, Clone, Default)]
pub struct ActixCookieJar {
    inner: ActixJar,
}

impl ActixCookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the jar with the cookies the request carried
    ///
    /// An unparsable `Cookie` header is treated as no cookies at all.
    #[must_use]
    pub fn from_request(req: &HttpRequest) -> Self {
        let mut inner = ActixJar::new();
        match req.cookies() {
            Ok(cookies) => {
                for cookie in cookies.iter() {
                    inner.add_original(cookie.clone());
                }
            }
            Err(e) => log::debug!("Ignoring unparsable request cookies: {e}"),
        }
        Self { inner }
    }

    /// Cookies written since construction
    pub fn delta(&self) -> impl Iterator<Item = &Cookie<'static>> {
        self.inner.delta()
    }

    /// Add every written cookie to the response
    pub fn apply_to(&self, response: &mut HttpResponseBuilder) {
        for cookie in self.inner.delta() {
            response.cookie(cookie.clone());
        }
    }

    #[must_use]
    pub fn into_inner(self) -> ActixJar {
        self.inner
    }
}

impl CookieJar for ActixCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.inner.get(name).map(|cookie| cookie.value().to_owned())
    }

    fn set(&mut self, name: &str, value: String, options: &CookieSetOptions) {
        self.inner.add(options.to_cookie(name, value));
    }
}

impl<T: Schema> CookieSessionStorage<T> {
    /// Session for an incoming actix request
    ///
    /// Call [`ActixCookieJar::apply_to`] on the jar from
    /// [`crate::session::CookieStorage::jar`] when building the response.
    ///
    /// # Errors
    ///
    /// Returns an error only for codec failures unrelated to the cookie value
    pub fn session_for(&self, req: &HttpRequest) -> Result<Session<ActixCookieJar, T>, SessionError> {
        self.get_session(ActixCookieJar::from_request(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::cookie::COOKIE_NAME;
    use crate::session::schema::Dict;
    use crate::testing::fixtures::test_config;
    use actix_web::{test::TestRequest, HttpResponse};

    fn factory() -> CookieSessionStorage<Dict> {
        CookieSessionStorage::with_config(test_config())
    }

    #[test]
    fn test_fresh_request_has_no_delta() {
        let req = TestRequest::default().to_http_request();
        let session = factory().session_for(&req).unwrap();

        assert!(!session.has("count"));
        assert_eq!(session.storage().jar().delta().count(), 0);
    }

    #[test]
    fn test_write_then_replay_on_next_request() {
        let req = TestRequest::default().to_http_request();
        let mut session = factory().session_for(&req).unwrap();
        session.set("count", 2).unwrap();

        let mut builder = HttpResponse::Ok();
        session.storage().jar().apply_to(&mut builder);
        let response = builder.finish();

        let cookie = response
            .cookies()
            .find(|c| c.name() == COOKIE_NAME)
            .unwrap()
            .into_owned();
        assert_eq!(cookie.http_only(), Some(true));
        // no `Secure` attribute in the header outside production
        assert_ne!(cookie.secure(), Some(true));

        let next = TestRequest::default().cookie(cookie).to_http_request();
        let session = factory().session_for(&next).unwrap();
        assert_eq!(session.get::<i64>("count").unwrap(), Some(2));
    }

    #[test]
    fn test_repeated_writes_collapse_to_last_value() {
        let mut jar = ActixCookieJar::new();
        let options = CookieSetOptions::default();
        jar.set("name", "first".to_string(), &options);
        jar.set("name", "second".to_string(), &options);

        let delta: Vec<_> = jar.delta().collect();
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].value(), "second");
        assert_eq!(jar.get("name").as_deref(), Some("second"));
    }
}
