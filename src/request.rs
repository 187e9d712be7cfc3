//! Incoming request context.
//!
//! The immutable part of the exchange (method, URI, headers, body, peer) lives
//! in a shared [`RequestHead`]; the response holds the same `Arc` so it can
//! negotiate and evaluate freshness without borrowing the request. What
//! changes while dispatching (the path view, parameters, extensions) lives on
//! [`Request`] itself.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST, REFERER, TRANSFER_ENCODING};
use http::{Extensions, HeaderMap, Method, Uri, Version};

use crate::mime;
use crate::negotiate::{self, Accepted, Kind};
use crate::path::Params;
use crate::response::Response;
use crate::settings::Settings;

// ── RequestHead ───────────────────────────────────────────────────────────────

/// The parts of a request no layer may change.
#[derive(Debug)]
pub(crate) struct RequestHead {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) version: Version,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) remote_addr: Option<SocketAddr>,
    accept: OnceLock<Vec<Accepted>>,
}

impl RequestHead {
    pub(crate) fn new(req: http::Request<Bytes>, remote_addr: Option<SocketAddr>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            remote_addr,
            accept: OnceLock::new(),
        }
    }

    /// Parsed `Accept` header, computed on first use.
    pub(crate) fn accept(&self) -> &[Accepted] {
        self.accept.get_or_init(|| negotiate::parse(Kind::MediaType, self.header("accept")))
    }

    /// Case-insensitive header lookup; `Referer` and `Referrer` are aliases.
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        let value = if name.eq_ignore_ascii_case("referer") || name.eq_ignore_ascii_case("referrer") {
            self.headers.get(REFERER).or_else(|| self.headers.get("referrer"))
        } else {
            self.headers.get(name)
        };
        value.and_then(|v| v.to_str().ok())
    }

    pub(crate) fn original_url(&self) -> &str {
        self.uri.path_and_query().map_or("/", |pq| pq.as_str())
    }

    pub(crate) fn query_param(&self, name: &str) -> Option<String> {
        parse_query(self.uri.query().unwrap_or(""))
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

// ── Request ───────────────────────────────────────────────────────────────────

/// An incoming request as seen by the handler currently running.
#[derive(Debug)]
pub struct Request {
    pub(crate) head: Arc<RequestHead>,
    pub(crate) settings: Arc<Settings>,
    pub(crate) base_url: String,
    pub(crate) path: String,
    pub(crate) params: Params,
    query: Vec<(String, String)>,
    extensions: Extensions,
}

impl Request {
    pub(crate) fn new(head: Arc<RequestHead>, settings: Arc<Settings>) -> Self {
        let path = head.uri.path().to_owned();
        let query = parse_query(head.uri.query().unwrap_or(""));
        Self {
            head,
            settings,
            base_url: String::new(),
            path,
            params: Params::new(),
            query,
            extensions: Extensions::new(),
        }
    }

    pub fn method(&self) -> &Method { &self.head.method }
    pub fn uri(&self) -> &Uri { &self.head.uri }
    pub fn version(&self) -> Version { self.head.version }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn body(&self) -> &Bytes { &self.head.body }
    pub fn settings(&self) -> &Settings { &self.settings }

    /// The path relative to where the current layer is mounted.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The mount prefixes stripped so far, e.g. `/api` inside a router
    /// mounted at `/api`. Empty at the top level.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Path and query exactly as received.
    pub fn original_url(&self) -> &str {
        self.head.original_url()
    }

    /// A path parameter captured by the matching layer.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// First value of a query-string parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Every value of a repeated query-string parameter.
    pub fn query_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query.iter().filter(move |(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Case-insensitive header lookup; `Referer` and `Referrer` are
    /// interchangeable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    // ── Negotiation ──

    /// The best of `types` for the client's `Accept` header, returned as
    /// given. Extensions (`"json"`) and full types (`"text/html"`) may be
    /// mixed. Without an `Accept` header the first type wins.
    pub fn accepts(&self, types: &[&str]) -> Option<String> {
        best_type(self.head.accept(), types).map(|i| types[i].to_owned())
    }

    /// Media types the client accepts, most preferred first.
    pub fn accepted_types(&self) -> Vec<String> {
        negotiate::accepted_values(self.head.accept())
    }

    pub fn accepts_encodings(&self, encodings: &[&str]) -> Option<String> {
        self.negotiate(Kind::Encoding, "accept-encoding", encodings)
    }

    pub fn accepts_charsets(&self, charsets: &[&str]) -> Option<String> {
        self.negotiate(Kind::Charset, "accept-charset", charsets)
    }

    pub fn accepts_languages(&self, languages: &[&str]) -> Option<String> {
        self.negotiate(Kind::Language, "accept-language", languages)
    }

    fn negotiate(&self, kind: Kind, header: &str, offered: &[&str]) -> Option<String> {
        let accepted = negotiate::parse(kind, self.get(header));
        let best = *negotiate::preferred(kind, &accepted, offered).first()?;
        Some(offered[best].to_owned())
    }

    /// Matches the request's `Content-Type` against `types` (`"json"`,
    /// `"text/*"`, `"+json"`, `"application/xml"`). Returns the matching
    /// entry, or the actual type when the entry holds a wildcard. `None` for
    /// requests without a body.
    pub fn is(&self, types: &[&str]) -> Option<String> {
        if !self.has_body() {
            return None;
        }
        let actual = self.get(CONTENT_TYPE.as_str())?;
        let actual = actual.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        if !actual.contains('/') {
            return None;
        }

        types.iter().find_map(|t| {
            let expected = if let Some(suffix) = t.strip_prefix('+') {
                format!("*/*+{suffix}")
            } else {
                mime::lookup_known(t)?.to_ascii_lowercase()
            };
            if !mime_match(&expected, &actual) {
                return None;
            }
            let wildcard = t.starts_with('+') || t.contains('*');
            Some(if wildcard { actual.clone() } else { (*t).to_owned() })
        })
    }

    fn has_body(&self) -> bool {
        self.head.headers.contains_key(TRANSFER_ENCODING)
            || self.get(CONTENT_LENGTH.as_str()).is_some_and(|v| v.trim() != "")
    }

    // ── Caching ──

    /// `true` when the client's cached copy matches what `res` would send:
    /// GET/HEAD only, 2xx or 304 status, validators agree.
    pub fn is_fresh(&self, res: &Response) -> bool {
        res.is_fresh()
    }

    pub fn is_stale(&self, res: &Response) -> bool {
        !self.is_fresh(res)
    }

    // ── Connection ──

    /// `https` or `http`; honours `X-Forwarded-Proto` when proxies are
    /// trusted.
    pub fn protocol(&self) -> String {
        if self.settings.trust_proxy {
            if let Some(proto) = self.get("x-forwarded-proto") {
                let first = proto.split(',').next().unwrap_or("").trim();
                if !first.is_empty() {
                    return first.to_ascii_lowercase();
                }
            }
        }
        self.head.uri.scheme_str().unwrap_or("http").to_owned()
    }

    pub fn secure(&self) -> bool {
        self.protocol() == "https"
    }

    /// Host name without the port.
    pub fn hostname(&self) -> Option<String> {
        let forwarded = if self.settings.trust_proxy { self.get("x-forwarded-host") } else { None };
        let host = match forwarded {
            Some(h) => h.split(',').next().unwrap_or("").trim(),
            None => match self.get(HOST.as_str()) {
                Some(h) => h,
                None => self.head.uri.authority().map(|a| a.as_str())?,
            },
        };
        if host.is_empty() {
            return None;
        }
        // IPv6 literals keep their brackets.
        let end = if host.starts_with('[') {
            host.find(']').map_or(host.len(), |i| i + 1)
        } else {
            host.find(':').unwrap_or(host.len())
        };
        Some(host[..end].to_owned())
    }

    /// Subdomains in reverse order, dropping the registrable `offset` parts
    /// (two by default: `tobi.ferrets.example.com` → `["ferrets", "tobi"]`).
    pub fn subdomains(&self, offset: usize) -> Vec<String> {
        let Some(host) = self.hostname() else {
            return Vec::new();
        };
        if host.parse::<std::net::IpAddr>().is_ok() || host.starts_with('[') {
            return vec![host];
        }
        host.split('.').rev().skip(offset).map(str::to_owned).collect()
    }

    /// Remote address; the client end of `X-Forwarded-For` when proxies are
    /// trusted.
    pub fn ip(&self) -> Option<String> {
        self.ips().into_iter().next().or_else(|| self.head.remote_addr.map(|a| a.ip().to_string()))
    }

    /// `X-Forwarded-For` addresses, client first. Empty unless proxies are
    /// trusted.
    pub fn ips(&self) -> Vec<String> {
        if !self.settings.trust_proxy {
            return Vec::new();
        }
        self.get("x-forwarded-for")
            .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.head.remote_addr
    }

    /// `X-Requested-With: XMLHttpRequest`.
    pub fn xhr(&self) -> bool {
        self.get("x-requested-with").is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
    }

    // ── Extensions ──

    /// Request-scoped values shared between layers.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

/// Index of the entry of `types` (extensions or full media types) the client
/// prefers. Unknown extensions never match.
pub(crate) fn best_type(accepted: &[Accepted], types: &[&str]) -> Option<usize> {
    let valid: Vec<(usize, &str)> = types
        .iter()
        .enumerate()
        .filter_map(|(i, t)| mime::lookup_known(t).map(|m| (i, m)))
        .collect();
    let mimes: Vec<&str> = valid.iter().map(|(_, m)| *m).collect();
    let best = *negotiate::preferred(Kind::MediaType, accepted, &mimes).first()?;
    Some(valid[best].0)
}

/// `type/subtype` match where either side of `expected` may be `*` and the
/// subtype may be a `*+suffix` pattern.
fn mime_match(expected: &str, actual: &str) -> bool {
    let (Some((et, es)), Some((at, asub))) = (expected.split_once('/'), actual.split_once('/')) else {
        return false;
    };
    if et != "*" && et != at {
        return false;
    }
    if let Some(suffix) = es.strip_prefix("*+") {
        return asub.len() > suffix.len() && asub.ends_with(suffix) && asub[..asub.len() - suffix.len()].ends_with('+');
    }
    es == "*" || es == asub
}

/// Flat `a=1&b=two&b=2` parsing; `+` is a space, invalid escapes are kept
/// verbatim.
pub(crate) fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(k), decode_component(v))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
