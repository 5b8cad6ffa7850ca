//! Route table: registration and resolution.
//!
//! One compressed prefix tree for all routes, with a per-node method table —
//! lookup cost follows path length, not route count. Build the table once at
//! startup, hand it to [`Server::serve`](crate::Server::serve); each
//! [`Router::on`] call returns `self` so registrations chain.

use std::sync::Arc;

use http::Method;

use crate::context::ContextPool;
use crate::handler::{BoxedHandler, Handler};
use crate::tree::{Params, Tree};

/// The application router.
///
/// Route paths are literal except for `:name` segments, which capture up to
/// the next `/` and surface through
/// [`Context::param`](crate::Context::param):
///
/// ```rust,no_run
/// # use torii::{Context, Method, Response, Router};
/// # async fn get_user(_: Context) -> Response { Response::text("") }
/// # async fn create_user(_: Context) -> Response { Response::text("") }
/// # async fn purge_user(_: Context) -> Response { Response::text("") }
/// Router::new()
///     .get("/users/:id", get_user)
///     .post("/users", create_user)
///     .on(Method::from_bytes(b"PURGE").unwrap(), "/users/:id", purge_user);
/// ```
///
/// Registration is a single-threaded startup affair (`on` takes `self`);
/// resolution is `&self` and safe under any number of concurrent requests.
pub struct Router {
    tree: Tree,
    pool: Arc<ContextPool>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            tree: Tree::new(),
            pool: ContextPool::new(),
        }
    }

    /// Registers a handler for a method + path pair. The one registration
    /// primitive — the verb methods below are sugar over it. Registering
    /// the same method and path again silently replaces the handler.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.tree.insert(method, path, handler.into_boxed_handler());
        self
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

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PATCH, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    pub fn head(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::HEAD, path, handler)
    }

    /// Resolves a concrete method + path against the table, returning the
    /// handler and the captured parameters in path order.
    ///
    /// `None` covers both a path nothing was registered under and a matched
    /// path whose node has no handler for `method`; the serving layer turns
    /// either into a 404.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<(BoxedHandler, Params)> {
        self.tree.resolve(method, path)
    }

    /// Resolution into a pooled capture list; see [`Tree::resolve_into`].
    pub(crate) fn resolve_into(
        &self,
        method: &Method,
        path: &str,
        params: &mut Params,
    ) -> Option<BoxedHandler> {
        self.tree.resolve_into(method, path, params)
    }

    pub(crate) fn pool(&self) -> &Arc<ContextPool> {
        &self.pool
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;
    use crate::Context;

    #[tokio::test]
    async fn resolved_handler_sees_its_captures() {
        let router = Router::new().get("/users/:id", |mut ctx: Context| async move {
            let id = ctx.param("id").unwrap_or("?").to_owned();
            ctx.write(id.as_bytes());
            ctx
        });

        let (handler, params) = router.resolve(&Method::GET, "/users/42").expect("match");
        let mut ctx = ContextPool::acquire(router.pool(), Request::test(Method::GET, "/users/42"));
        *ctx.params_mut() = params;

        let res = handler.call(ctx).await;
        assert_eq!(res.body, b"42");
    }

    #[test]
    fn verb_sugar_routes_through_the_primitive() {
        let router = Router::new()
            .get("/r", |_: Context| async { "get" })
            .post("/r", |_: Context| async { "post" })
            .delete("/r", |_: Context| async { "delete" });

        assert!(router.resolve(&Method::GET, "/r").is_some());
        assert!(router.resolve(&Method::POST, "/r").is_some());
        assert!(router.resolve(&Method::DELETE, "/r").is_some());
        assert!(router.resolve(&Method::PUT, "/r").is_none());
    }

    #[test]
    fn concurrent_resolution_is_isolated() {
        let router = Arc::new(Router::new().get("/users/:id", |ctx: Context| async move { ctx }));

        // Every thread hammers the shared table with its own id and must
        // only ever see that id come back.
        std::thread::scope(|s| {
            for i in 0..32 {
                let router = Arc::clone(&router);
                s.spawn(move || {
                    let path = format!("/users/{i}");
                    let want = i.to_string();
                    for _ in 0..500 {
                        let (_, params) =
                            router.resolve(&Method::GET, &path).expect("match");
                        assert_eq!(params.get("id"), Some(want.as_str()));
                    }
                });
            }
        });
    }
}
