//! Ordered layer stack and the dispatch loop.
//!
//! Layers run strictly in registration order. There is no specificity
//! ranking: the first layer that finishes the exchange wins, and a layer that
//! proceeds hands control to the next one that matches.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::Method;
use tracing::trace;

use crate::app::{App, Application};
use crate::error::Error;
use crate::handler::{ErrorHandler, Handler, Next, Outcome, Step};
use crate::layer::{Layer, LayerKind};
use crate::method::{AllowList, MethodFilter};
use crate::path::{MatchOptions, Params, PathMatch, PathPattern};
use crate::request::Request;
use crate::response::Response;
use crate::settings::Settings;

/// Router-wide matching options, fixed when the router is created.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RouterOptions {
    /// `/Foo` and `/foo` are different routes.
    pub case_sensitive: bool,
    /// `/foo` and `/foo/` are different routes.
    pub strict: bool,
    /// Keep the parameters captured by the parent's mount pattern visible
    /// inside this router.
    pub merge_params: bool,
}

/// Anything that can be mounted under a path prefix.
pub enum Mount {
    Router(Router),
    Application(Application),
    App(App),
}

impl From<Router> for Mount {
    fn from(r: Router) -> Self { Self::Router(r) }
}

impl From<Application> for Mount {
    fn from(a: Application) -> Self { Self::Application(a) }
}

impl From<App> for Mount {
    fn from(a: App) -> Self { Self::App(a) }
}

impl Mount {
    fn into_parts(self) -> (Arc<Router>, Option<Arc<Settings>>) {
        match self {
            Self::Router(r) => (Arc::new(r), None),
            Self::Application(a) => {
                let App { router, settings } = a.freeze();
                (router, Some(settings))
            }
            Self::App(App { router, settings }) => (router, Some(settings)),
        }
    }
}

/// How a dispatch through one router ended.
#[derive(Debug)]
pub(crate) enum Exit {
    /// A layer finished the exchange.
    Handled,
    /// The layers ran out, possibly with an unhandled error.
    Exhausted(Option<Error>),
}

#[derive(Debug)]
pub(crate) struct Dispatched {
    pub(crate) req: Request,
    pub(crate) res: Response,
    pub(crate) exit: Exit,
}

type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Dispatched> + Send + 'a>>;

/// An ordered, append-only stack of layers.
///
/// Build it by chaining registrations; every method takes and returns `self`.
/// Once mounted (or once its application is frozen) it is shared read-only.
pub struct Router {
    options: RouterOptions,
    layers: Vec<Layer>,
}

impl Router {
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default())
    }

    pub fn with_options(options: RouterOptions) -> Self {
        Self { options, layers: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    // ── Registration ──

    /// Runs `handler` for every request reaching this router.
    pub fn middleware(self, handler: impl Handler) -> Self {
        self.middleware_at("/", handler)
    }

    /// Runs `handler` for requests under `path`. Inside the handler the
    /// prefix is stripped from `req.path()` and appended to `req.base_url()`.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid pattern.
    pub fn middleware_at(mut self, path: &str, handler: impl Handler) -> Self {
        let pattern = self.compile(path, false);
        self.layers.push(Layer {
            pattern,
            methods: MethodFilter::any(),
            kind: LayerKind::Handler(handler.into_boxed_handler()),
            route: false,
        });
        self
    }

    /// Runs `handler` while an error is pending.
    pub fn catch(self, handler: impl ErrorHandler) -> Self {
        self.catch_at("/", handler)
    }

    pub fn catch_at(mut self, path: &str, handler: impl ErrorHandler) -> Self {
        let pattern = self.compile(path, false);
        self.layers.push(Layer {
            pattern,
            methods: MethodFilter::any(),
            kind: LayerKind::ErrorHandler(handler.into_boxed_error_handler()),
            route: false,
        });
        self
    }

    /// Registers a route for one method. `GET` routes also answer `HEAD`.
    ///
    /// Path parameters use `:name` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,ignore
    /// Router::new()
    ///     .on(Method::DELETE, "/users/:id", delete_user)
    ///     .on(Method::GET,    "/users/:id", get_user)
    ///     .on(Method::POST,   "/users",     create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid pattern.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.route(MethodFilter::only(method), path, handler)
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PATCH, path, handler)
    }

    pub fn head(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::HEAD, path, handler)
    }

    pub fn options(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::OPTIONS, path, handler)
    }

    /// A route answering every method.
    pub fn all(self, path: &str, handler: impl Handler) -> Self {
        self.route(MethodFilter::any(), path, handler)
    }

    /// Nests a router or an application under `path`. A plain router uses
    /// the parent's settings. A mounted application uses only its own
    /// settings while it dispatches: nothing is inherited, so a child built
    /// with `Application::new()` runs with defaults (`trust_proxy` off,
    /// `x_powered_by` on) whatever the parent configured.
    pub fn mount(mut self, path: &str, child: impl Into<Mount>) -> Self {
        let pattern = self.compile(path, false);
        let (router, settings) = child.into().into_parts();
        self.layers.push(Layer {
            pattern,
            methods: MethodFilter::any(),
            kind: LayerKind::Mount { router, settings },
            route: false,
        });
        self
    }

    fn route(mut self, methods: MethodFilter, path: &str, handler: impl Handler) -> Self {
        let pattern = self.compile(path, true);
        self.layers.push(Layer {
            pattern,
            methods,
            kind: LayerKind::Handler(handler.into_boxed_handler()),
            route: true,
        });
        self
    }

    fn compile(&self, path: &str, route: bool) -> PathPattern {
        let options = MatchOptions {
            case_sensitive: self.options.case_sensitive,
            strict: route && self.options.strict,
            end: route,
        };
        PathPattern::compile(path, options).unwrap_or_else(|e| panic!("{e}"))
    }

    // ── Dispatch ──

    /// Walks the layers for one exchange. Boxed so mounted routers can
    /// recurse.
    pub(crate) fn dispatch<'a>(&'a self, req: Request, res: Response) -> DispatchFuture<'a> {
        Box::pin(self.run(req, res))
    }

    async fn run(&self, mut req: Request, mut res: Response) -> Dispatched {
        let parent_params = req.params.clone();
        let mut pending: Option<Error> = None;
        let mut allow = AllowList::default();

        for (index, layer) in self.layers.iter().enumerate() {
            if layer.is_error_handler() != pending.is_some() {
                continue;
            }

            let matched = match layer.matches(&req.path) {
                Ok(Some(m)) => m,
                Ok(None) => continue,
                Err(e) => {
                    trace!(layer = index, error = %e, "path parameter failed to decode");
                    pending.get_or_insert(e);
                    continue;
                }
            };

            if !layer.accepts(req.method()) {
                if *req.method() == Method::OPTIONS && layer.route {
                    allow.extend_from(&layer.methods);
                }
                continue;
            }

            let saved = enter(&mut req, layer, matched, &parent_params, self.options.merge_params);
            trace!(
                layer = index,
                kind = layer.describe(),
                pattern = layer.pattern.as_str(),
                methods = %layer.methods,
                path = %req.path,
                "invoking layer"
            );

            let Outcome { req: r, res: s, step } = invoke(layer, &mut pending, req, res).await;
            req = r;
            res = s;
            if let Some((base_url, path)) = saved {
                req.base_url = base_url;
                req.path = path;
            }

            match step {
                Step::Proceed => {}
                Step::Fail(e) => {
                    trace!(layer = index, error = %e, "layer failed");
                    pending = Some(e);
                }
                Step::Finish => {
                    req.params = parent_params;
                    return Dispatched { req, res, exit: Exit::Handled };
                }
                Step::ExitRouter => {
                    pending = None;
                    break;
                }
            }
        }

        req.params = parent_params;

        if pending.is_none() && *req.method() == Method::OPTIONS && !allow.is_empty() {
            let value = allow.header_value();
            res.set("allow", &value);
            return match res.send(value) {
                Ok(()) => Dispatched { req, res, exit: Exit::Handled },
                Err(e) => Dispatched { req, res, exit: Exit::Exhausted(Some(e)) },
            };
        }

        Dispatched { req, res, exit: Exit::Exhausted(pending) }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// Binds the layer's parameters and, for prefix layers, swaps in the
/// stripped path view. Returns the view to restore afterwards.
fn enter(
    req: &mut Request,
    layer: &Layer,
    matched: PathMatch,
    parent_params: &Params,
    merge: bool,
) -> Option<(String, String)> {
    req.params = if merge { parent_params.merged(&matched.params) } else { matched.params };

    if layer.route || matched.matched.is_empty() {
        return None;
    }

    let saved = (req.base_url.clone(), req.path.clone());
    let consumed = matched.matched.strip_suffix('/').unwrap_or(&matched.matched);
    req.base_url.push_str(consumed);
    req.path = if matched.remainder.starts_with('/') {
        matched.remainder
    } else {
        format!("/{}", matched.remainder)
    };
    Some(saved)
}

async fn invoke(layer: &Layer, pending: &mut Option<Error>, mut req: Request, mut res: Response) -> Outcome {
    match &layer.kind {
        LayerKind::Handler(h) => h.call(req, res, Next::new()).await,
        LayerKind::ErrorHandler(h) => match pending.take() {
            Some(err) => h.call(err, req, res, Next::new()).await,
            None => Next::new().proceed(req, res),
        },
        LayerKind::Mount { router, settings } => {
            let previous = settings.as_ref().map(|child| {
                res.settings = Arc::clone(child);
                std::mem::replace(&mut req.settings, Arc::clone(child))
            });

            let Dispatched { mut req, mut res, exit } = router.dispatch(req, res).await;

            if let Some(previous) = previous {
                res.settings = Arc::clone(&previous);
                req.settings = previous;
            }

            let step = match exit {
                Exit::Handled => Step::Finish,
                Exit::Exhausted(None) => Step::Proceed,
                Exit::Exhausted(Some(e)) => Step::Fail(e),
            };
            Outcome { req, res, step }
        }
    }
}
