//! Applications: a root router plus settings, and the final responder.
//!
//! [`Application`] is the mutable builder. [`App`] is what serves traffic:
//! frozen, cheap to clone, and without any registration API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_SECURITY_POLICY, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{Method, StatusCode};
use tracing::{debug, error, warn};

use crate::handler::{ErrorHandler, Handler};
use crate::request::{Request, RequestHead};
use crate::response::{Response, encode_url, escape_html, html_document};
use crate::router::{Dispatched, Exit, Mount, Router, RouterOptions};
use crate::settings::Settings;

// ── Application ───────────────────────────────────────────────────────────────

/// An application under construction.
///
/// Registration methods mirror [`Router`]'s and forward to the root router,
/// whose case sensitivity and strictness come from the settings.
pub struct Application {
    router: Router,
    settings: Settings,
}

impl Application {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let settings = settings.normalized();
        let router = Router::with_options(RouterOptions {
            case_sensitive: settings.case_sensitive_routing,
            strict: settings.strict_routing,
            merge_params: false,
        });
        Self { router, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn map(self, f: impl FnOnce(Router) -> Router) -> Self {
        Self { router: f(self.router), settings: self.settings }
    }

    pub fn middleware(self, handler: impl Handler) -> Self {
        self.map(|r| r.middleware(handler))
    }

    pub fn middleware_at(self, path: &str, handler: impl Handler) -> Self {
        self.map(|r| r.middleware_at(path, handler))
    }

    pub fn catch(self, handler: impl ErrorHandler) -> Self {
        self.map(|r| r.catch(handler))
    }

    pub fn catch_at(self, path: &str, handler: impl ErrorHandler) -> Self {
        self.map(|r| r.catch_at(path, handler))
    }

    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.map(|r| r.on(method, path, handler))
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.map(|r| r.get(path, handler))
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.map(|r| r.post(path, handler))
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.map(|r| r.put(path, handler))
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.map(|r| r.delete(path, handler))
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.map(|r| r.patch(path, handler))
    }

    pub fn head(self, path: &str, handler: impl Handler) -> Self {
        self.map(|r| r.head(path, handler))
    }

    pub fn options(self, path: &str, handler: impl Handler) -> Self {
        self.map(|r| r.options(path, handler))
    }

    pub fn all(self, path: &str, handler: impl Handler) -> Self {
        self.map(|r| r.all(path, handler))
    }

    /// See [`Router::mount`]. A mounted application does not inherit these
    /// settings.
    pub fn mount(self, path: &str, child: impl Into<Mount>) -> Self {
        self.map(|r| r.mount(path, child))
    }

    /// Ends registration.
    pub fn freeze(self) -> App {
        App { router: Arc::new(self.router), settings: Arc::new(self.settings) }
    }
}

impl Default for Application {
    fn default() -> Self { Self::new() }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// A frozen application, ready to handle requests.
#[derive(Clone)]
pub struct App {
    pub(crate) router: Arc<Router>,
    pub(crate) settings: Arc<Settings>,
}

impl From<Application> for App {
    fn from(app: Application) -> Self { app.freeze() }
}

impl App {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs one exchange through the application.
    pub async fn handle(&self, req: http::Request<Bytes>) -> http::Response<Bytes> {
        self.handle_from(req, None).await
    }

    /// Like [`handle`](App::handle), recording the peer address for
    /// `Request::ip`.
    pub async fn handle_from(
        &self,
        req: http::Request<Bytes>,
        remote_addr: Option<SocketAddr>,
    ) -> http::Response<Bytes> {
        let started = Instant::now();
        let head = Arc::new(RequestHead::new(req, remote_addr));
        let req = Request::new(Arc::clone(&head), Arc::clone(&self.settings));
        let mut res = Response::new(Arc::clone(&head), Arc::clone(&self.settings));

        if self.settings.x_powered_by {
            res.set("x-powered-by", "strata");
        }

        let dispatched = self.router.dispatch(req, res).await;
        let res = self.respond(&head, dispatched);

        debug!(
            method = %head.method,
            path = %head.uri.path(),
            status = res.status().as_u16(),
            latency_us = started.elapsed().as_micros() as u64,
            "request handled"
        );
        res.into_http()
    }

    /// The final responder: whatever the layers left behind becomes a
    /// complete response.
    fn respond(&self, head: &Arc<RequestHead>, dispatched: Dispatched) -> Response {
        let Dispatched { mut res, exit, .. } = dispatched;

        let err = match exit {
            Exit::Handled => {
                if !res.is_committed() {
                    warn!(method = %head.method, path = %head.uri.path(), "exchange finished without a response");
                    let _ = res.end(Bytes::new());
                }
                return res;
            }
            Exit::Exhausted(err) => err,
        };

        if res.is_committed() {
            if let Some(e) = err {
                error!(error = %e, method = %head.method, path = %head.uri.path(), "error after response was sent");
            }
            return res;
        }

        let (status, message) = match err {
            None => (
                StatusCode::NOT_FOUND,
                format!("Cannot {} {}", head.method, encode_url(head.uri.path())),
            ),
            Some(e) => {
                let status = e.status();
                if status.is_server_error() {
                    error!(error = %e, status = status.as_u16(), path = %head.uri.path(), "unhandled error");
                } else {
                    debug!(error = %e, status = status.as_u16(), path = %head.uri.path(), "unhandled client error");
                }
                (status, status.canonical_reason().unwrap_or("Error").to_owned())
            }
        };

        error_page(Response::new(Arc::clone(head), Arc::clone(&self.settings)), status, &message)
    }
}

/// Minimal HTML error page; starts from a fresh response so nothing a layer
/// set leaks through.
fn error_page(mut res: Response, status: StatusCode, message: &str) -> Response {
    let body = escape_html(message).replace('\n', "<br>").replace("  ", " &nbsp;");
    let doc = html_document("Error", &body);

    res.set_status(status)
        .set(CONTENT_SECURITY_POLICY.as_str(), "default-src 'none'")
        .set(X_CONTENT_TYPE_OPTIONS.as_str(), "nosniff")
        .set(CONTENT_TYPE.as_str(), "text/html; charset=utf-8")
        .set(CONTENT_LENGTH.as_str(), &doc.len().to_string());
    let _ = res.end(doc);
    res
}
