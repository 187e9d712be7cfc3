//! Built-in middleware.
//!
//! Middleware are ordinary [`Handler`](crate::Handler)s, registered with
//! `middleware` or `middleware_at`. They either finish the exchange or hand it
//! on with `next.proceed`.

pub mod serve_static;

pub use serve_static::{ServeStaticOptions, serve_static};
