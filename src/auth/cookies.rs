use std::time::Duration;

use axum::http::{header::COOKIE, HeaderMap};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Attributes shared by every auth cookie.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    fn attributes(&self) -> &'static str {
        // Browsers drop SameSite=None cookies that are not Secure.
        if self.secure {
            "Path=/; HttpOnly; Secure; SameSite=None"
        } else {
            "Path=/; HttpOnly; SameSite=Lax"
        }
    }

    pub fn set(&self, name: &str, value: &str, ttl: Duration) -> String {
        format!(
            "{}={}; {}; Max-Age={}",
            name,
            value,
            self.attributes(),
            ttl.as_secs()
        )
    }

    pub fn clear(&self, name: &str) -> String {
        format!("{}=; {}; Max-Age=0", name, self.attributes())
    }
}

/// Find a cookie value in the request's `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .map(str::trim)
        .find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k.trim() == name && !v.trim().is_empty()).then(|| v.trim())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn set_cookie_has_security_attributes() {
        let c = CookiePolicy { secure: true }.set(ACCESS_COOKIE, "abc", Duration::from_secs(3600));
        assert_eq!(
            c,
            "accessToken=abc; Path=/; HttpOnly; Secure; SameSite=None; Max-Age=3600"
        );
    }

    #[test]
    fn insecure_policy_falls_back_to_lax() {
        let c = CookiePolicy { secure: false }.clear(REFRESH_COOKIE);
        assert_eq!(c, "refreshToken=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    }

    #[test]
    fn read_cookie_finds_named_value() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; accessToken=a.b.c"));
        headers.append(COOKIE, HeaderValue::from_static("refreshToken=r.s.t"));
        assert_eq!(read_cookie(&headers, ACCESS_COOKIE), Some("a.b.c"));
        assert_eq!(read_cookie(&headers, REFRESH_COOKIE), Some("r.s.t"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("refreshToken="));
        assert_eq!(read_cookie(&headers, REFRESH_COOKIE), None);
    }
}
