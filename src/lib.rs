//! # strata
//!
//! A layered HTTP application framework. An application is an ordered stack
//! of layers (middleware, routes, error handlers and mounted sub-routers);
//! each request walks the stack in registration order until some layer
//! finishes the exchange.
//!
//! ## The contract
//!
//! Every handler receives the request, the response and a single-use
//! [`Next`] token, and returns an [`Outcome`] built from that token:
//!
//! - `next.proceed(req, res)`: hand the request to the next matching layer
//! - `next.fail(req, res, err)`: skip to the error-handling layers
//! - `next.finish(req, res)`: the exchange is done
//! - `next.exit_router(req, res)`: leave the current router
//!
//! What the stack does not answer, the application's final responder does:
//! `404 Cannot GET /path` for a routing miss, the status of the pending
//! [`Error`] otherwise.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use strata::{Application, Next, Outcome, Request, Response, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let api = Router::new()
//!         .get("/users/:id", get_user)
//!         .post("/users",    create_user);
//!
//!     let app = Application::new()
//!         .middleware(log)
//!         .mount("/api", api);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn log(req: Request, res: Response, next: Next) -> Outcome {
//!     tracing::info!(path = %req.path(), "incoming");
//!     next.proceed(req, res)
//! }
//!
//! async fn get_user(req: Request, mut res: Response, next: Next) -> Outcome {
//!     let id = req.param("id").unwrap_or("unknown").to_owned();
//!     let sent = res.json(&serde_json::json!({ "id": id }));
//!     next.settle(req, res, sent)
//! }
//!
//! async fn create_user(req: Request, mut res: Response, next: Next) -> Outcome {
//!     res.set_status(StatusCode::CREATED).location("/api/users/99");
//!     let sent = res.send(());
//!     next.settle(req, res, sent)
//! }
//! ```

mod app;
mod error;
mod file;
mod handler;
mod layer;
mod method;
mod path;
mod request;
mod response;
mod router;
mod server;
mod settings;

pub mod conditional;
pub mod cookie;
pub mod middleware;
pub mod mime;
pub mod negotiate;

pub use app::{App, Application};
pub use cookie::{CookieOptions, SameSite};
pub use error::{Error, Result};
pub use file::{Dotfiles, SendFileOptions};
pub use handler::{ErrorHandler, Handler, Next, Outcome};
pub use method::MethodFilter;
pub use path::{MatchOptions, Params, PathMatch, PathPattern};
pub use request::Request;
pub use response::{Body, Fault, Formats, Response};
pub use router::{Mount, Router, RouterOptions};
pub use server::Server;
pub use settings::{Etag, EtagFn, JsonReplacer, Settings};

pub use http::{Method, StatusCode};
