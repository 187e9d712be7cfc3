//! One entry of a router's ordered stack.

use std::sync::Arc;

use http::Method;

use crate::error::Result;
use crate::handler::{BoxedErrorHandler, BoxedHandler};
use crate::method::MethodFilter;
use crate::path::{PathMatch, PathPattern};
use crate::router::Router;
use crate::settings::Settings;

/// What a layer runs once it matches.
pub(crate) enum LayerKind {
    /// Route handler or middleware.
    Handler(BoxedHandler),
    /// Runs only while an error is pending.
    ErrorHandler(BoxedErrorHandler),
    /// A nested router. Applications carry their own settings, which are
    /// swapped in for the duration of the child dispatch.
    Mount { router: Arc<Router>, settings: Option<Arc<Settings>> },
}

/// Matcher, method filter and handler, fixed at registration.
pub(crate) struct Layer {
    pub(crate) pattern: PathPattern,
    pub(crate) methods: MethodFilter,
    pub(crate) kind: LayerKind,
    /// Route layers are anchored at the end of the path and never strip a
    /// prefix.
    pub(crate) route: bool,
}

impl Layer {
    pub(crate) fn is_error_handler(&self) -> bool {
        matches!(self.kind, LayerKind::ErrorHandler(_))
    }

    pub(crate) fn accepts(&self, method: &Method) -> bool {
        self.methods.accepts(method)
    }

    pub(crate) fn matches(&self, path: &str) -> Result<Option<PathMatch>> {
        self.pattern.matches(path)
    }

    pub(crate) fn describe(&self) -> &'static str {
        match (&self.kind, self.route) {
            (LayerKind::Handler(_), true)   => "route",
            (LayerKind::Handler(_), false)  => "middleware",
            (LayerKind::ErrorHandler(_), _) => "error handler",
            (LayerKind::Mount { .. }, _)    => "mount",
        }
    }
}
