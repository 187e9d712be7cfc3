//! `Set-Cookie` serialization. Parsing incoming cookies is left to
//! middleware.

use std::fmt::Write as _;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// `SameSite` attribute values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax    => "Lax",
            Self::None   => "None",
        }
    }
}

/// Attributes for `Response::cookie`. `path` defaults to `/`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CookieOptions {
    /// Lifetime; also sets `Expires` to now + `max_age`.
    pub max_age: Option<Duration>,
    pub expires: Option<SystemTime>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age: None,
            expires: None,
            path: Some("/".to_owned()),
            domain: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }
}

impl CookieOptions {
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn expires(mut self, at: SystemTime) -> Self {
        self.expires = Some(at);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Options that expire the cookie immediately, as used by
    /// `Response::clear_cookie`. `max_age` is dropped.
    pub(crate) fn expired(self) -> Self {
        Self { max_age: None, expires: Some(UNIX_EPOCH + Duration::from_millis(1)), ..self }
    }
}

/// Builds one `Set-Cookie` header value. The value is percent-encoded.
pub fn serialize(name: &str, value: &str, opts: &CookieOptions) -> String {
    let mut out = format!("{name}={}", urlencoding::encode(value));

    let mut expires = opts.expires;
    if let Some(max_age) = opts.max_age {
        let _ = write!(out, "; Max-Age={}", max_age.as_secs());
        expires = Some(SystemTime::now() + max_age);
    }
    if let Some(domain) = &opts.domain {
        let _ = write!(out, "; Domain={domain}");
    }
    if let Some(path) = &opts.path {
        let _ = write!(out, "; Path={path}");
    }
    if let Some(at) = expires {
        let _ = write!(out, "; Expires={}", httpdate::fmt_http_date(at));
    }
    if opts.http_only {
        out.push_str("; HttpOnly");
    }
    if opts.secure {
        out.push_str("; Secure");
    }
    if let Some(same_site) = opts.same_site {
        let _ = write!(out, "; SameSite={}", same_site.as_str());
    }
    out
}

/// `true` for names made only of RFC 6265 token characters.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_order() {
        let opts = CookieOptions::default()
            .domain("example.com")
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Lax);
        assert_eq!(
            serialize("sid", "a b", &opts),
            "sid=a%20b; Domain=example.com; Path=/; HttpOnly; Secure; SameSite=Lax"
        );
    }

    #[test]
    fn max_age_sets_expires() {
        let out = serialize("n", "v", &CookieOptions::default().max_age(Duration::from_secs(60)));
        assert!(out.starts_with("n=v; Max-Age=60; Path=/; Expires="));
    }

    #[test]
    fn expired_cookie() {
        let out = serialize("n", "", &CookieOptions::default().max_age(Duration::from_secs(5)).expired());
        assert_eq!(out, "n=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn names() {
        assert!(is_valid_name("session_id"));
        assert!(!is_valid_name("bad name"));
        assert!(!is_valid_name("a=b"));
    }
}
