//! Handler traits, type erasure and the continuation token.
//!
//! # How a handler hands control back
//!
//! Every handler receives the request, the response and a single-use
//! [`Next`] token, and must give all three back inside an [`Outcome`]:
//!
//! ```text
//! async fn auth(req: Request, res: Response, next: Next) -> Outcome {
//!     if req.get("authorization").is_none() {
//!         return next.fail(req, res, Error::http(StatusCode::UNAUTHORIZED, "login"));
//!     }
//!     next.proceed(req, res)                       ← run the next layer
//! }
//! ```
//!
//! `Next` is not `Clone` and every method consumes it, so a handler cannot
//! continue twice. Ownership of the request and response travels back with
//! the outcome, which is how the dispatch loop restores the path view after
//! the handler returns.
//!
//! # How async handlers are stored
//!
//! Layers hold handlers of different concrete types in one `Vec`, so each
//! handler is erased behind `Arc<dyn ErasedHandler>`:
//!
//! ```text
//! async fn hello(req, res, next) -> Outcome { … }   ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_boxed_handler()                        ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                        ← stored in the Layer
//!        ↓
//! handler.call(req, res, next)  at request time     ← one vtable dispatch
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;

// ── Continuation ──────────────────────────────────────────────────────────────

/// What a handler decided.
#[derive(Debug)]
pub(crate) enum Step {
    /// Run the next matching layer.
    Proceed,
    /// Divert to error-handling layers with this cause.
    Fail(Error),
    /// The exchange is handled; stop dispatching.
    Finish,
    /// Leave the current router as if it had run out of layers.
    ExitRouter,
}

/// The value every handler returns: the request and response, handed back,
/// plus the decision taken through [`Next`].
#[derive(Debug)]
pub struct Outcome {
    pub(crate) req: Request,
    pub(crate) res: Response,
    pub(crate) step: Step,
}

/// Single-use continuation handed to every handler.
#[derive(Debug)]
#[must_use = "a handler must return an Outcome built from its Next"]
pub struct Next {
    _private: (),
}

impl Next {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }

    /// Pass control to the next matching layer.
    pub fn proceed(self, req: Request, res: Response) -> Outcome {
        Outcome { req, res, step: Step::Proceed }
    }

    /// Skip to the next error-handling layer with `err` as the cause.
    pub fn fail(self, req: Request, res: Response, err: impl Into<Error>) -> Outcome {
        Outcome { req, res, step: Step::Fail(err.into()) }
    }

    /// The response has been produced; stop dispatching.
    pub fn finish(self, req: Request, res: Response) -> Outcome {
        Outcome { req, res, step: Step::Finish }
    }

    /// `finish` on `Ok`, `fail` on `Err`. Pairs with the fallible response
    /// operations:
    ///
    /// ```text
    /// let sent = res.json(&user);
    /// next.settle(req, res, sent)
    /// ```
    pub fn settle(self, req: Request, res: Response, result: Result<()>) -> Outcome {
        match result {
            Ok(()) => self.finish(req, res),
            Err(e) => self.fail(req, res, e),
        }
    }

    /// Skip the remaining layers of the current router and continue in the
    /// parent.
    pub fn exit_router(self, req: Request, res: Response) -> Outcome {
        Outcome { req, res, step: Step::ExitRouter }
    }
}

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future resolving to an [`Outcome`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Outcome> + Send + 'static>>;

#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request, res: Response, next: Next) -> BoxFuture;
}

#[doc(hidden)]
pub trait ErasedErrorHandler {
    fn call(&self, err: Error, req: Request, res: Response, next: Next) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

#[doc(hidden)]
pub type BoxedErrorHandler = Arc<dyn ErasedErrorHandler + Send + Sync + 'static>;

// ── Public traits ─────────────────────────────────────────────────────────────

/// Implemented for every ordinary handler:
///
/// ```text
/// async fn name(req: Request, res: Response, next: Next) -> Outcome
/// ```
///
/// Closures work too, with their argument types spelled out. The trait is
/// sealed; only the blanket impl below satisfies it.
pub trait Handler: private::SealedHandler + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// Implemented for every error handler:
///
/// ```text
/// async fn name(err: Error, req: Request, res: Response, next: Next) -> Outcome
/// ```
///
/// Error handlers only run while an error is pending. Proceeding clears the
/// error; failing replaces it.
pub trait ErrorHandler: private::SealedErrorHandler + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_error_handler(self) -> BoxedErrorHandler;
}

/// Separate sealing traits keep the two blanket impls coherent.
mod private {
    pub trait SealedHandler {}
    pub trait SealedErrorHandler {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut> private::SealedHandler for F
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
}

impl<F, Fut> Handler for F
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

impl<F, Fut> private::SealedErrorHandler for F
where
    F: Fn(Error, Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
}

impl<F, Fut> ErrorHandler for F
where
    F: Fn(Error, Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn into_boxed_error_handler(self) -> BoxedErrorHandler {
        Arc::new(FnErrorHandler(self))
    }
}

// ── Concrete wrappers ─────────────────────────────────────────────────────────

struct FnHandler<F>(F);

impl<F, Fut> ErasedHandler for FnHandler<F>
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn call(&self, req: Request, res: Response, next: Next) -> BoxFuture {
        Box::pin((self.0)(req, res, next))
    }
}

struct FnErrorHandler<F>(F);

impl<F, Fut> ErasedErrorHandler for FnErrorHandler<F>
where
    F: Fn(Error, Request, Response, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn call(&self, err: Error, req: Request, res: Response, next: Next) -> BoxFuture {
        Box::pin((self.0)(err, req, res, next))
    }
}
