//! Outgoing response context.
//!
//! A [`Response`] starts `Open`: status and headers may be changed freely.
//! The first terminal operation (`send`, `json`, `jsonp`, `end`,
//! `send_status`, `send_file`, `redirect`, …) finalizes the entity and moves
//! it to `Committed`. From then on header and status changes are ignored and
//! recorded as [`Fault`]s, and a second terminal operation fails with
//! [`Error::HeadersSent`].

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{
    CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED, LINK,
    LOCATION, TRANSFER_ENCODING, VARY,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::warn;

use crate::conditional;
use crate::cookie::{self, CookieOptions};
use crate::error::{Error, Result};
use crate::file::{self, SendFileOptions};
use crate::mime;
use crate::request::{RequestHead, best_type};
use crate::settings::Settings;

// ── Body ──────────────────────────────────────────────────────────────────────

/// What `Response::send` accepts.
///
/// Strings become HTML unless a content type is already set, byte buffers
/// become `application/octet-stream`, JSON values (including `null`, numbers
/// and booleans) go through `Response::json`.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Empty,
    Text(String),
    Bytes(Bytes),
    Json(Value),
}

impl From<()> for Body {
    fn from(_: ()) -> Self { Self::Empty }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for Body {
    fn from(s: String) -> Self { Self::Text(s) }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self { Self::Bytes(b) }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self { Self::Bytes(Bytes::from(b)) }
}

impl From<&'static [u8]> for Body {
    fn from(b: &'static [u8]) -> Self { Self::Bytes(Bytes::from_static(b)) }
}

impl From<Value> for Body {
    fn from(v: Value) -> Self { Self::Json(v) }
}

macro_rules! json_body {
    ($($t:ty),*) => {
        $(impl From<$t> for Body {
            fn from(v: $t) -> Self { Self::Json(Value::from(v)) }
        })*
    };
}

json_body!(bool, i32, i64, u32, u64, f64);

impl<T: Into<Body>> From<Option<T>> for Body {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Json(Value::Null), Into::into)
    }
}

// ── Faults ────────────────────────────────────────────────────────────────────

/// Protocol misuse observed on a response. Never fatal; inspect with
/// [`Response::faults`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Fault {
    /// A header was changed after the response was committed.
    HeaderAfterCommit(String),
    /// The status was changed after the response was committed.
    StatusAfterCommit(u16),
    /// A second terminal operation ran.
    RepeatedEnd,
    /// A header name or value was not valid HTTP.
    InvalidHeader(String),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Open,
    Committed,
}

// ── Response ──────────────────────────────────────────────────────────────────

/// The response under construction for one exchange.
#[derive(Debug)]
pub struct Response {
    head: Arc<RequestHead>,
    pub(crate) settings: Arc<Settings>,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    state: State,
    faults: Vec<Fault>,
}

impl Response {
    pub(crate) fn new(head: Arc<RequestHead>, settings: Arc<Settings>) -> Self {
        Self {
            head,
            settings,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            state: State::Open,
            faults: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }

    /// Puts back headers captured before a failed transfer.
    pub(crate) fn restore_headers(&mut self, headers: HeaderMap) {
        if !self.is_committed() {
            self.headers = headers;
        }
    }
    pub fn body(&self) -> &Bytes { &self.body }
    pub fn faults(&self) -> &[Fault] { &self.faults }
    pub fn settings(&self) -> &Settings { &self.settings }

    /// `true` once a terminal operation has run.
    pub fn is_committed(&self) -> bool {
        self.state == State::Committed
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    // ── Header mutation ──

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        if self.is_committed() {
            self.fault(Fault::StatusAfterCommit(status.as_u16()));
        } else {
            self.status = status;
        }
        self
    }

    /// Replaces a header. A `Content-Type` value may be a shorthand
    /// (`"json"`) and gets a default charset for textual types.
    pub fn set(&mut self, name: &str, value: &str) -> &mut Self {
        if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
            let value = mime::with_default_charset(mime::lookup(value));
            self.put(name, &value, false);
        } else {
            self.put(name, value, false);
        }
        self
    }

    /// Adds a header value, keeping existing ones.
    pub fn append(&mut self, name: &str, value: &str) -> &mut Self {
        self.put(name, value, true);
        self
    }

    pub fn remove(&mut self, name: &str) -> &mut Self {
        if self.guard(name) {
            self.headers.remove(name);
        }
        self
    }

    /// Sets `Content-Type` from a shorthand or a full type.
    pub fn content_type(&mut self, shorthand: &str) -> &mut Self {
        self.set(CONTENT_TYPE.as_str(), shorthand)
    }

    /// Adds `field` to `Vary` unless it is already listed (or `*` is).
    pub fn vary(&mut self, field: &str) -> &mut Self {
        let current = self.get(VARY.as_str()).unwrap_or("").to_owned();
        let updated = append_vary(&current, field);
        if updated != current {
            self.put(VARY.as_str(), &updated, false);
        }
        self
    }

    /// Sets `Location`. `"back"` means the request's referrer, or `/`.
    pub fn location(&mut self, url: &str) -> &mut Self {
        let target = if url == "back" { self.head.header("referrer").unwrap_or("/") } else { url };
        let encoded = encode_url(target);
        self.put(LOCATION.as_str(), &encoded, false);
        self
    }

    /// Appends `<url>; rel="rel"` entries to `Link`.
    pub fn links(&mut self, links: &[(&str, &str)]) -> &mut Self {
        let mut value = self.get(LINK.as_str()).unwrap_or("").to_owned();
        for (rel, url) in links {
            if !value.is_empty() {
                value.push_str(", ");
            }
            let _ = write!(value, "<{url}>; rel=\"{rel}\"");
        }
        self.put(LINK.as_str(), &value, false);
        self
    }

    pub fn cookie(&mut self, name: &str, value: &str, opts: &CookieOptions) -> &mut Self {
        if !cookie::is_valid_name(name) {
            self.fault(Fault::InvalidHeader(format!("cookie name `{name}`")));
            return self;
        }
        let header = cookie::serialize(name, value, opts);
        self.put("set-cookie", &header, true);
        self
    }

    /// Expires `name` on the client. `opts` should match the ones the cookie
    /// was set with (path, domain).
    pub fn clear_cookie(&mut self, name: &str, opts: &CookieOptions) -> &mut Self {
        self.cookie(name, "", &opts.clone().expired())
    }

    /// `Content-Disposition: attachment`, plus a content type from the
    /// file name's extension when one is given.
    pub fn attachment(&mut self, filename: Option<&str>) -> &mut Self {
        match filename {
            Some(name) => {
                let ext = Path::new(name).extension().and_then(|e| e.to_str()).unwrap_or("");
                self.content_type(if ext.is_empty() { "bin" } else { ext });
                self.put(CONTENT_DISPOSITION.as_str(), &content_disposition(name), false);
            }
            None => self.put(CONTENT_DISPOSITION.as_str(), "attachment", false),
        }
        self
    }

    /// Computes an `ETag` for `body` with the configured generator. Only
    /// length-bearing bodies (text, bytes) are tagged.
    pub fn etag(&mut self, body: &Body) -> &mut Self {
        let bytes = match body {
            Body::Text(s) => s.as_bytes(),
            Body::Bytes(b) => b.as_ref(),
            Body::Empty | Body::Json(_) => return self,
        };
        if let Some(tag) = self.settings.etag.generate(bytes) {
            if !tag.is_empty() {
                self.put(ETAG.as_str(), &tag, false);
            }
        }
        self
    }

    fn put(&mut self, name: &str, value: &str, append: bool) {
        if !self.guard(name) {
            return;
        }
        let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) else {
            self.fault(Fault::InvalidHeader(name.to_owned()));
            return;
        };
        if append {
            self.headers.append(name, value);
        } else {
            self.headers.insert(name, value);
        }
    }

    /// `true` while headers may change; records a fault otherwise.
    fn guard(&mut self, name: &str) -> bool {
        if self.is_committed() {
            self.fault(Fault::HeaderAfterCommit(name.to_ascii_lowercase()));
            return false;
        }
        true
    }

    fn fault(&mut self, fault: Fault) {
        warn!(?fault, method = %self.head.method, path = %self.head.uri.path(), "response misuse");
        self.faults.push(fault);
    }

    fn ensure_open(&mut self) -> Result<()> {
        if self.is_committed() {
            self.fault(Fault::RepeatedEnd);
            return Err(Error::HeadersSent);
        }
        Ok(())
    }

    // ── Terminal operations ──

    /// Finalizes the response with `body`. See [`Body`] for how each kind is
    /// encoded.
    pub fn send(&mut self, body: impl Into<Body>) -> Result<()> {
        self.ensure_open()?;
        match body.into() {
            Body::Empty => self.finalize(None, true),
            Body::Text(text) => {
                let existing = self.get(CONTENT_TYPE.as_str()).map(|ct| mime::set_charset(ct, "utf-8"));
                match existing {
                    Some(ct) => self.put(CONTENT_TYPE.as_str(), &ct, false),
                    None => {
                        self.content_type("html");
                    }
                }
                self.finalize(Some(Bytes::from(text)), true)
            }
            Body::Bytes(bytes) => {
                if !self.headers.contains_key(CONTENT_TYPE) {
                    self.content_type("bin");
                }
                self.finalize(Some(bytes), true)
            }
            Body::Json(value) => self.json(&value),
        }
    }

    /// Serializes `value` honouring `json_replacer`, `json_spaces` and
    /// `json_escape`, defaults the content type to `application/json` and
    /// sends it.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.ensure_open()?;
        let body = stringify(value, &self.settings)?;
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.content_type("application/json");
        }
        self.send(body.map_or(Body::Empty, Body::Text))
    }

    /// JSON with JSONP support: when the query parameter named by
    /// `jsonp_callback_name` is present, the body is wrapped in a call to it.
    pub fn jsonp<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.ensure_open()?;
        let body = stringify(value, &self.settings)?;

        if !self.headers.contains_key(CONTENT_TYPE) {
            self.set("x-content-type-options", "nosniff");
            self.content_type("application/json");
        }

        let callback = self.head.query_param(&self.settings.jsonp_callback_name).filter(|cb| !cb.is_empty());
        let Some(callback) = callback else {
            return self.send(body.map_or(Body::Empty, Body::Text));
        };

        self.set("x-content-type-options", "nosniff");
        self.content_type("text/javascript");

        let callback: String = callback
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '[' | ']'))
            .collect();
        let body = body
            .map(|b| b.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029"))
            .unwrap_or_default();
        self.send(format!("/**/ typeof {callback} === 'function' && {callback}({body});"))
    }

    /// Sets the status and sends its reason phrase as plain text.
    pub fn send_status(&mut self, status: StatusCode) -> Result<()> {
        self.ensure_open()?;
        self.set_status(status);
        self.content_type("txt");
        let body = status.canonical_reason().map_or_else(|| status.as_u16().to_string(), str::to_owned);
        self.send(body)
    }

    /// Commits `bytes` as-is: no content type, validator or length inference.
    pub fn end(&mut self, bytes: impl Into<Bytes>) -> Result<()> {
        self.ensure_open()?;
        self.body = if self.head.method == Method::HEAD { Bytes::new() } else { bytes.into() };
        self.state = State::Committed;
        Ok(())
    }

    /// Runs the callback registered for the type the client prefers.
    ///
    /// Always adds `Accept` to `Vary`. With no acceptable type and no
    /// fallback, returns [`Error::NotAcceptable`] listing the offered types.
    pub fn format(&mut self, formats: Formats<'_>) -> Result<()> {
        let Formats { arms, fallback } = formats;
        let keys: Vec<&str> = arms.iter().map(|(k, _)| k.as_str()).collect();

        self.vary("Accept");
        let chosen = if keys.is_empty() { None } else { best_type(self.head.accept(), &keys) };

        if let Some(index) = chosen {
            let ty = normalize_type(&keys[index]);
            self.content_type(&ty);
            let Some((_, arm)) = arms.into_iter().nth(index) else {
                return Ok(());
            };
            return arm(self);
        }
        if let Some(fallback) = fallback {
            return fallback(self);
        }
        Err(Error::NotAcceptable { types: keys.iter().map(|k| normalize_type(k)).collect() })
    }

    /// Sets `Location` and answers with a short negotiated body.
    pub fn redirect(&mut self, status: StatusCode, url: &str) -> Result<()> {
        self.ensure_open()?;
        self.location(url);
        let address = self.get(LOCATION.as_str()).unwrap_or("").to_owned();
        let reason = status.canonical_reason().unwrap_or("");

        self.vary("Accept");
        let body = match best_type(self.head.accept(), &["text", "html"]) {
            Some(0) => {
                self.content_type("text");
                format!("{reason}. Redirecting to {address}")
            }
            Some(_) => {
                self.content_type("html");
                let u = escape_html(&address);
                format!(
                    "<!DOCTYPE html><head><title>{reason}</title></head>\
                     <body><p>{reason}. Redirecting to {u}</p></body>"
                )
            }
            None => String::new(),
        };

        self.set_status(status);
        self.set(CONTENT_LENGTH.as_str(), &body.len().to_string());
        self.end(body)
    }

    /// Sends a file from an absolute path with default options.
    pub async fn send_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.send_file_with(path, &SendFileOptions::default()).await
    }

    /// Sends a file. Nothing on the response changes until the file has been
    /// read completely; on error the response is untouched.
    pub async fn send_file_with(&mut self, path: impl AsRef<Path>, opts: &SendFileOptions) -> Result<()> {
        self.ensure_open()?;
        let file = file::load(path.as_ref(), opts).await?;
        let modified = file.metadata.modified().ok();

        if opts.cache_control && !self.headers.contains_key(CACHE_CONTROL) {
            self.put(CACHE_CONTROL.as_str(), &opts.cache_control_value(), false);
        }
        if opts.last_modified && !self.headers.contains_key(LAST_MODIFIED) {
            if let Some(at) = modified {
                self.put(LAST_MODIFIED.as_str(), &httpdate::fmt_http_date(at), false);
            }
        }
        if opts.etag && !self.headers.contains_key(ETAG) {
            self.put(ETAG.as_str(), &conditional::stat_tag(file.metadata.len(), modified), false);
        }
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.content_type(mime::for_path(&file.path));
        }
        self.finalize(Some(file.contents), false)
    }

    /// Sends a file as an attachment named `filename` (or the file's own
    /// name). On failure `Content-Disposition` is removed again.
    pub async fn download(&mut self, path: impl AsRef<Path>, filename: Option<&str>) -> Result<()> {
        self.ensure_open()?;
        let path = path.as_ref();
        let name = match filename {
            Some(n) => n.to_owned(),
            None => path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
        };
        if name.is_empty() {
            self.put(CONTENT_DISPOSITION.as_str(), "attachment", false);
        } else {
            self.put(CONTENT_DISPOSITION.as_str(), &content_disposition(&name), false);
        }

        let result = match std::path::absolute(path) {
            Ok(full) => self.send_file_with(full, &SendFileOptions::default()).await,
            Err(e) => Err(Error::from(e)),
        };
        if result.is_err() {
            self.remove(CONTENT_DISPOSITION.as_str());
        }
        result
    }

    // ── Finalization ──

    /// `true` when the request's validators match this response: GET/HEAD,
    /// 2xx or 304.
    pub(crate) fn is_fresh(&self) -> bool {
        let method = &self.head.method;
        if *method != Method::GET && *method != Method::HEAD {
            return false;
        }
        let s = self.status;
        if !(s.is_success() || s == StatusCode::NOT_MODIFIED) {
            return false;
        }
        conditional::is_fresh(&self.head.headers, &self.headers)
    }

    fn finalize(&mut self, entity: Option<Bytes>, generate_etag: bool) -> Result<()> {
        let mut entity = entity;

        if let Some(bytes) = &entity {
            self.put(CONTENT_LENGTH.as_str(), &bytes.len().to_string(), false);
            if generate_etag && !self.headers.contains_key(ETAG) {
                if let Some(tag) = self.settings.etag.generate(bytes) {
                    if !tag.is_empty() {
                        self.put(ETAG.as_str(), &tag, false);
                    }
                }
            }
        }

        if self.is_fresh() {
            self.status = StatusCode::NOT_MODIFIED;
        }

        if self.status == StatusCode::NO_CONTENT || self.status == StatusCode::NOT_MODIFIED {
            self.headers.remove(CONTENT_TYPE);
            self.headers.remove(CONTENT_LENGTH);
            self.headers.remove(TRANSFER_ENCODING);
            entity = None;
        }

        if self.status == StatusCode::RESET_CONTENT {
            self.headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
            self.headers.remove(TRANSFER_ENCODING);
            entity = None;
        }

        self.end(entity.unwrap_or_default())
    }

    /// Converts into a plain `http::Response`.
    pub fn into_http(self) -> http::Response<Bytes> {
        let mut res = http::Response::new(self.body);
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

// ── Formats ───────────────────────────────────────────────────────────────────

type Arm<'a> = Box<dyn FnOnce(&mut Response) -> Result<()> + 'a>;

/// Callbacks keyed by media type (or extension) for [`Response::format`].
#[derive(Default)]
pub struct Formats<'a> {
    arms: Vec<(String, Arm<'a>)>,
    fallback: Option<Arm<'a>>,
}

impl<'a> Formats<'a> {
    pub fn new() -> Self {
        Self { arms: Vec::new(), fallback: None }
    }

    /// Registers `f` for `key` (`"json"`, `"html"`, `"text/plain"`, …).
    /// Earlier keys win ties.
    pub fn on(mut self, key: &str, f: impl FnOnce(&mut Response) -> Result<()> + 'a) -> Self {
        self.arms.push((key.to_owned(), Box::new(f)));
        self
    }

    /// Runs when nothing is acceptable.
    pub fn fallback(mut self, f: impl FnOnce(&mut Response) -> Result<()> + 'a) -> Self {
        self.fallback = Some(Box::new(f));
        self
    }
}

fn normalize_type(key: &str) -> String {
    if key.contains('/') {
        key.split(';').next().unwrap_or(key).trim().to_owned()
    } else {
        mime::lookup(key).to_owned()
    }
}

// ── Encoding helpers ──────────────────────────────────────────────────────────

fn stringify<T: Serialize + ?Sized>(value: &T, settings: &Settings) -> Result<Option<String>> {
    let mut value = serde_json::to_value(value)?;
    if let Some(replacer) = &settings.json_replacer {
        match replacer.apply(&value) {
            Some(replaced) => value = replaced,
            None => return Ok(None),
        }
    }

    let mut out = match settings.json_spaces {
        Some(spaces) => {
            let indent = vec![b' '; spaces];
            let mut buf = Vec::new();
            let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(&indent));
            value.serialize(&mut ser)?;
            String::from_utf8(buf).map_err(Error::other)?
        }
        None => serde_json::to_string(&value)?,
    };

    if settings.json_escape {
        out = out.replace('<', "\\u003c").replace('>', "\\u003e").replace('&', "\\u0026");
    }
    Ok(Some(out))
}

fn append_vary(current: &str, field: &str) -> String {
    let existing: Vec<&str> = current.split(',').map(str::trim).filter(|f| !f.is_empty()).collect();
    if existing.contains(&"*") {
        return current.to_owned();
    }
    let mut out: Vec<String> = existing.iter().map(|f| (*f).to_owned()).collect();
    for f in field.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        if f == "*" {
            return "*".to_owned();
        }
        if !out.iter().any(|e| e.eq_ignore_ascii_case(f)) {
            out.push(f.to_owned());
        }
    }
    out.join(", ")
}

/// Percent-encodes everything outside the URL-safe set, leaving valid `%XX`
/// escapes alone.
pub(crate) fn encode_url(url: &str) -> String {
    let bytes = url.as_bytes();
    let mut out = String::with_capacity(url.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let escape = b == b'%'
            && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
        if escape {
            out.push_str(&url[i..i + 3]);
            i += 3;
            continue;
        }
        let safe = matches!(b, 0x21 | 0x23..=0x24 | 0x26..=0x3B | 0x3D | 0x3F..=0x5F | 0x61..=0x7A | 0x7C | 0x7E);
        if safe {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{b:02X}");
        }
        i += 1;
    }
    out
}

/// `attachment; filename="…"` with an RFC 5987 `filename*` for names that
/// do not survive as plain ASCII.
pub(crate) fn content_disposition(filename: &str) -> String {
    let name = Path::new(filename).file_name().and_then(|n| n.to_str()).unwrap_or(filename);
    let printable = |c: char| (' '..='~').contains(&c);

    let fallback: String = name.chars().map(|c| if printable(c) { c } else { '?' }).collect();
    let mut out = format!(
        "attachment; filename=\"{}\"",
        fallback.replace('\\', "\\\\").replace('"', "\\\"")
    );

    let has_escape = name.as_bytes().windows(3).any(|w| {
        w[0] == b'%' && w[1].is_ascii_hexdigit() && w[2].is_ascii_hexdigit()
    });
    if !name.chars().all(printable) || has_escape {
        out.push_str("; filename*=UTF-8''");
        for b in name.bytes() {
            if b.is_ascii_alphanumeric() || b"!-._~".contains(&b) {
                out.push(b as char);
            } else {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&'  => out.push_str("&amp;"),
            '<'  => out.push_str("&lt;"),
            '>'  => out.push_str("&gt;"),
            '"'  => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Minimal HTML page used for framework-generated bodies.
pub(crate) fn html_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n<pre>{body}</pre>\n</body>\n</html>\n"
    )
}
