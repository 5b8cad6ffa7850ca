//! # torii
//!
//! A minimal HTTP framework built around one thing done carefully: a
//! backtracking radix-tree router.
//!
//! ## The contract
//!
//! torii sits behind a reverse proxy. nginx handles TLS, rate limiting,
//! slow clients, and body-size limits; torii handles none of those. What's
//! left is the part that changes between applications:
//!
//! - **Routing** — a compressed prefix tree owned by this crate: static
//!   edges split around shared prefixes, `:name` segments capture values,
//!   and lookup backtracks from failed static matches into parameter
//!   branches. Cost follows path length, not route count, and resolution
//!   allocates only for the captured values.
//! - **Dispatch** — each request gets a pooled [`Context`] carrying its
//!   captured parameters and the request/response handles; handlers are
//!   plain `async fn`s.
//! - **Transport** — tokio + hyper (HTTP/1.1 and HTTP/2), with graceful
//!   SIGTERM / Ctrl-C shutdown that drains in-flight requests.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use torii::{Context, Response, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .get("/users/:id", get_user)
//!         .post("/users", create_user);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(mut ctx: Context) -> Context {
//!     let id = ctx.param("id").unwrap_or("unknown").to_owned();
//!     // Write-through style: the context becomes a 200 with these bytes.
//!     ctx.write(format!(r#"{{"id":"{id}"}}"#).as_bytes());
//!     ctx
//! }
//!
//! async fn create_user(ctx: Context) -> Response {
//!     if ctx.request().body().is_empty() {
//!         return Response::status(StatusCode::BAD_REQUEST);
//!     }
//!     # let bytes: Vec<u8> = vec![];
//!     Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(bytes)
//! }
//! ```
//!
//! Routes are registered once, single-threaded, before serving begins;
//! resolution is lock-free and safe under unbounded concurrency — captured
//! parameters live only in each call's own [`Context`], never on the shared
//! tree.

mod context;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;
mod tree;

pub mod health;

pub use context::Context;
pub use error::Error;
pub use handler::Handler;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use tree::Params;

// The HTTP vocabulary types, so applications don't need their own `http`
// dependency for everyday use.
pub use http::{Method, StatusCode};
