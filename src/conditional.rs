//! Cache validators: entity tag generation and request freshness.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use http::HeaderMap;
use http::header::{CACHE_CONTROL, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use sha1::{Digest, Sha1};

/// Entity tag for a body: `"<len hex>-<27 chars of base64 sha1>"`, prefixed
/// with `W/` when `weak`.
pub fn entity_tag(body: &[u8], weak: bool) -> String {
    let digest = BASE64_STANDARD.encode(Sha1::digest(body));
    let tag = format!("\"{:x}-{}\"", body.len(), &digest[..27]);
    if weak { format!("W/{tag}") } else { tag }
}

/// Weak entity tag derived from file metadata: `W/"<size hex>-<mtime ms hex>"`.
pub fn stat_tag(len: u64, modified: Option<SystemTime>) -> String {
    let mtime = modified
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_millis());
    format!("W/\"{len:x}-{mtime:x}\"")
}

/// `true` when the client's cached copy, described by the request's
/// conditional headers, still matches the response's validators.
pub fn is_fresh(request: &HeaderMap, response: &HeaderMap) -> bool {
    let modified_since = header_str(request, IF_MODIFIED_SINCE);
    let none_match = header_str(request, IF_NONE_MATCH);
    if modified_since.is_none() && none_match.is_none() {
        return false;
    }

    // An end-to-end reload must bypass the cache.
    if let Some(cc) = header_str(request, CACHE_CONTROL) {
        if cc.split(',').any(|d| d.trim().eq_ignore_ascii_case("no-cache")) {
            return false;
        }
    }

    if let Some(none_match) = none_match {
        if none_match.trim() != "*" {
            let Some(etag) = header_str(response, ETAG) else {
                return false;
            };
            let hit = none_match
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .any(|t| weak_eq(t, etag));
            if !hit {
                return false;
            }
        }
    }

    if let Some(since) = modified_since {
        let last_modified = header_str(response, LAST_MODIFIED).and_then(parse_date);
        let not_modified = match (last_modified, parse_date(since)) {
            (Some(lm), Some(since)) => lm <= since,
            _ => false,
        };
        if !not_modified {
            return false;
        }
    }

    true
}

fn weak_eq(candidate: &str, etag: &str) -> bool {
    let strip = |t: &str| t.strip_prefix("W/").unwrap_or(t).to_owned();
    strip(candidate) == strip(etag)
}

fn parse_date(value: &str) -> Option<SystemTime> {
    httpdate::parse_http_date(value).ok()
}

fn header_str(headers: &HeaderMap, name: http::header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(http::header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn body_tags() {
        assert_eq!(entity_tag(b"", false), "\"0-2jmj7l5rSw0yVb/vlWAYkK/YBwk\"");
        assert_eq!(entity_tag(b"", true), "W/\"0-2jmj7l5rSw0yVb/vlWAYkK/YBwk\"");
        assert!(entity_tag(b"hello world", true).starts_with("W/\"b-"));
    }

    #[test]
    fn stat_tags() {
        let t = UNIX_EPOCH + Duration::from_millis(0x1234);
        assert_eq!(stat_tag(255, Some(t)), "W/\"ff-1234\"");
    }

    #[test]
    fn fresh_requires_a_conditional_header() {
        let res = headers(&[(ETAG, "\"abc\"")]);
        assert!(!is_fresh(&HeaderMap::new(), &res));
    }

    #[test]
    fn etag_matching_is_weak() {
        let res = headers(&[(ETAG, "W/\"abc\"")]);
        assert!(is_fresh(&headers(&[(IF_NONE_MATCH, "\"abc\"")]), &res));
        assert!(is_fresh(&headers(&[(IF_NONE_MATCH, "\"x\", W/\"abc\"")]), &res));
        assert!(is_fresh(&headers(&[(IF_NONE_MATCH, "*")]), &res));
        assert!(!is_fresh(&headers(&[(IF_NONE_MATCH, "\"nope\"")]), &res));
        assert!(!is_fresh(&headers(&[(IF_NONE_MATCH, "\"abc\"")]), &HeaderMap::new()));
    }

    #[test]
    fn no_cache_forces_stale() {
        let res = headers(&[(ETAG, "\"abc\"")]);
        let req = headers(&[(IF_NONE_MATCH, "\"abc\""), (CACHE_CONTROL, "max-age=0, no-cache")]);
        assert!(!is_fresh(&req, &res));
    }

    #[test]
    fn modified_since() {
        let res = headers(&[(LAST_MODIFIED, "Sat, 01 Jan 2022 00:00:00 GMT")]);
        assert!(is_fresh(&headers(&[(IF_MODIFIED_SINCE, "Sun, 02 Jan 2022 00:00:00 GMT")]), &res));
        assert!(!is_fresh(&headers(&[(IF_MODIFIED_SINCE, "Fri, 31 Dec 2021 00:00:00 GMT")]), &res));
        assert!(!is_fresh(&headers(&[(IF_MODIFIED_SINCE, "garbage")]), &res));
    }
}
