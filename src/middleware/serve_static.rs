//! Serving files from a directory.
//!
//! ```rust,no_run
//! use strata::Application;
//! use strata::middleware::serve_static::{ServeStaticOptions, serve_static};
//!
//! let app = Application::new()
//!     .middleware_at("/assets", serve_static("public", ServeStaticOptions::default()));
//! ```
//!
//! With `fallthrough` on (the default) a missing file, a bad path or a wrong
//! method simply hands the request to the next layer. Server-side failures
//! always travel down the error path.

use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_LENGTH, CONTENT_SECURITY_POLICY, CONTENT_TYPE, LOCATION, X_CONTENT_TYPE_OPTIONS};
use http::{Method, StatusCode};
use tracing::trace;

use crate::error::{Error, Result};
use crate::file::{self, Dotfiles, SendFileOptions};
use crate::handler::{Handler, Next};
use crate::request::Request;
use crate::response::{Response, encode_url, escape_html, html_document};

/// Hook run right before a file is sent, typically to add headers.
pub type BeforeSend = Arc<dyn Fn(&mut Response, &Path, &Metadata) + Send + Sync>;

#[derive(Clone)]
pub struct ServeStaticOptions {
    /// Let client errors and unsupported methods reach the next layer.
    pub fallthrough: bool,
    /// Redirect `/dir` to `/dir/`.
    pub redirect: bool,
    /// Files tried, in order, for a path ending in `/`.
    pub index: Vec<String>,
    pub dotfiles: Option<Dotfiles>,
    pub max_age: Duration,
    pub immutable: bool,
    pub etag: bool,
    pub last_modified: bool,
    pub before: Option<BeforeSend>,
}

impl Default for ServeStaticOptions {
    fn default() -> Self {
        Self {
            fallthrough: true,
            redirect: true,
            index: vec!["index.html".to_owned()],
            dotfiles: None,
            max_age: Duration::ZERO,
            immutable: false,
            etag: true,
            last_modified: true,
            before: None,
        }
    }
}

impl fmt::Debug for ServeStaticOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeStaticOptions")
            .field("fallthrough", &self.fallthrough)
            .field("redirect", &self.redirect)
            .field("index", &self.index)
            .field("dotfiles", &self.dotfiles)
            .field("max_age", &self.max_age)
            .field("immutable", &self.immutable)
            .field("etag", &self.etag)
            .field("last_modified", &self.last_modified)
            .field("before", &self.before.is_some())
            .finish()
    }
}

impl ServeStaticOptions {
    pub fn before(mut self, f: impl Fn(&mut Response, &Path, &Metadata) + Send + Sync + 'static) -> Self {
        self.before = Some(Arc::new(f));
        self
    }
}

/// Builds a middleware serving files below `root`.
pub fn serve_static(root: impl Into<PathBuf>, options: ServeStaticOptions) -> impl Handler {
    let root = root.into();
    let send = SendFileOptions {
        root: Some(root.clone()),
        // Dotfiles are checked once, on the requested path.
        dotfiles: Some(Dotfiles::Allow),
        max_age: options.max_age,
        immutable: options.immutable,
        last_modified: options.last_modified,
        etag: options.etag,
        cache_control: true,
    };
    let dir = Arc::new(StaticDir { root, options, send });

    move |req: Request, mut res: Response, next: Next| {
        let dir = Arc::clone(&dir);
        async move {
            match dir.serve(&req, &mut res).await {
                Ok(Served::Sent) => next.finish(req, res),
                Ok(Served::Skipped) => next.proceed(req, res),
                Err(e) if dir.options.fallthrough && e.is_client_error() => {
                    trace!(path = %req.path(), error = %e, "static file not served");
                    next.proceed(req, res)
                }
                Err(e) => next.fail(req, res, e),
            }
        }
    }
}

enum Served {
    Sent,
    Skipped,
}

struct StaticDir {
    root: PathBuf,
    options: ServeStaticOptions,
    send: SendFileOptions,
}

impl StaticDir {
    async fn serve(&self, req: &Request, res: &mut Response) -> Result<Served> {
        let method = req.method();
        if *method != Method::GET && *method != Method::HEAD {
            if self.options.fallthrough {
                return Ok(Served::Skipped);
            }
            res.set_status(StatusCode::METHOD_NOT_ALLOWED)
                .set(ALLOW.as_str(), "GET, HEAD")
                .set(CONTENT_LENGTH.as_str(), "0");
            res.end(Bytes::new())?;
            return Ok(Served::Sent);
        }

        let mut path = req.path();
        if path == "/" && !req.uri().path().ends_with('/') {
            path = "";
        }

        let decoded = decode_path(path)?;
        let (full, parts) = resolve(&self.root, &decoded)?;
        file::check_dotfiles(&parts, self.options.dotfiles)?;

        if decoded.ends_with('/') {
            return self.serve_index(res, parts).await;
        }

        let metadata = tokio::fs::metadata(&full).await?;
        if metadata.is_dir() {
            if !self.options.redirect {
                return Err(Error::not_found());
            }
            redirect_to_directory(req, res)?;
            return Ok(Served::Sent);
        }

        self.send_file(res, &parts, &full, &metadata).await?;
        Ok(Served::Sent)
    }

    async fn serve_index(&self, res: &mut Response, parts: Vec<String>) -> Result<Served> {
        for name in &self.options.index {
            let mut candidate = parts.clone();
            candidate.push(name.clone());
            let full: PathBuf = self.root.join(candidate.iter().collect::<PathBuf>());

            match tokio::fs::metadata(&full).await {
                Ok(m) if m.is_file() => {
                    self.send_file(res, &candidate, &full, &m).await?;
                    return Ok(Served::Sent);
                }
                Ok(_) => {}
                Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::not_found())
    }

    async fn send_file(&self, res: &mut Response, parts: &[String], full: &Path, metadata: &Metadata) -> Result<()> {
        let saved = res.headers().clone();
        if let Some(before) = &self.options.before {
            before(res, full, metadata);
        }
        let rel: PathBuf = parts.iter().collect();
        let result = res.send_file_with(rel, &self.send).await;
        if result.is_err() {
            res.restore_headers(saved);
        }
        result
    }
}

/// Joins a decoded request path onto `root`. NUL bytes are a bad request;
/// climbing above the root is forbidden.
pub(crate) fn resolve(root: &Path, decoded: &str) -> Result<(PathBuf, Vec<String>)> {
    if decoded.contains('\0') {
        return Err(Error::http(StatusCode::BAD_REQUEST, "Bad Request"));
    }
    file::join_contained(root, Path::new(decoded))
}

fn decode_path(path: &str) -> Result<String> {
    let bad_request = || Error::http(StatusCode::BAD_REQUEST, "Bad Request");
    let bytes = path.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'%' {
            let valid = bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
            if !valid {
                return Err(bad_request());
            }
        }
    }
    urlencoding::decode(path).map(|d| d.into_owned()).map_err(|_| bad_request())
}

/// `301` to the original path plus `/`, keeping the query string.
fn redirect_to_directory(req: &Request, res: &mut Response) -> Result<()> {
    let mut target = format!("/{}/", req.uri().path().trim_start_matches('/'));
    if let Some(query) = req.uri().query() {
        target.push('?');
        target.push_str(query);
    }
    let location = encode_url(&target);
    let link = escape_html(&location);
    let doc = html_document("Redirecting", &format!("Redirecting to <a href=\"{link}\">{link}</a>"));

    res.set_status(StatusCode::MOVED_PERMANENTLY)
        .set(CONTENT_SECURITY_POLICY.as_str(), "default-src 'none'")
        .set(X_CONTENT_TYPE_OPTIONS.as_str(), "nosniff")
        .set(CONTENT_TYPE.as_str(), "text/html; charset=UTF-8")
        .set(CONTENT_LENGTH.as_str(), &doc.len().to_string())
        .set(LOCATION.as_str(), &location);
    res.end(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_escapes_are_rejected() {
        assert_eq!(decode_path("/a%20b").unwrap(), "/a b");
        assert_eq!(decode_path("/%zz").unwrap_err().status(), StatusCode::BAD_REQUEST);
        assert_eq!(decode_path("/trailing%2").unwrap_err().status(), StatusCode::BAD_REQUEST);
        assert_eq!(decode_path("/%ff").unwrap_err().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn resolve_stays_below_root() {
        let root = Path::new("/srv/www");
        let (full, parts) = resolve(root, "/css/../js/app.js").unwrap();
        assert_eq!(full, Path::new("/srv/www/js/app.js"));
        assert_eq!(parts, vec!["js", "app.js"]);

        assert_eq!(resolve(root, "/../etc/passwd").unwrap_err().status(), StatusCode::FORBIDDEN);
        assert_eq!(resolve(root, "/a\0b").unwrap_err().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn default_options() {
        let opts = ServeStaticOptions::default();
        assert!(opts.fallthrough && opts.redirect && opts.etag && opts.last_modified);
        assert_eq!(opts.index, vec!["index.html"]);
        assert!(format!("{opts:?}").contains("before: false"));
    }
}
