//! Per-request context and its reuse pool.
//!
//! A [`Context`] carries one request through one handler: the parameters the
//! router captured, the inbound [`Request`], and the response buffer the
//! handler writes into. It is passed to the handler by value and released
//! back to the pool when it drops — either inside the handler (when the
//! handler builds a [`Response`](crate::Response) itself) or after its
//! written bytes have been converted into the response.
//!
//! The pool hands out previously-used allocations in no particular order,
//! so acquisition overwrites every field: captures and buffer are cleared,
//! the request handle is replaced. A handler can never observe another
//! call's parameters or bytes.

use std::sync::{Arc, Mutex, MutexGuard};

use http::StatusCode;

use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::tree::Params;

// ── Context ───────────────────────────────────────────────────────────────────

/// The per-call value a handler receives.
///
/// ```rust,no_run
/// use torii::{Context, Response};
///
/// // Write-through style: the context itself becomes a 200 response
/// // carrying exactly the written bytes.
/// async fn hello(mut ctx: Context) -> Context {
///     let name = ctx.param("name").unwrap_or("world").to_owned();
///     ctx.write(format!("hello, {name}").as_bytes());
///     ctx
/// }
///
/// // Or ignore the buffer and build the response directly.
/// async fn bye(_ctx: Context) -> Response {
///     Response::text("bye")
/// }
/// ```
pub struct Context {
    params: Params,
    request: Request,
    body: Vec<u8>,
    pool: Arc<ContextPool>,
}

impl Context {
    /// Returns the value captured for the `:name` segment of the matched
    /// route. Linear scan — capture lists are a handful of entries.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// All captures of the matched route, in path order.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The inbound request: method, path, headers, body.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Appends bytes to the response buffer.
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    pub(crate) fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.pool.release(
            std::mem::take(&mut self.params),
            std::mem::take(&mut self.body),
        );
    }
}

/// A context returned from a handler is a `200 OK` whose body is exactly
/// what was [`write`](Context::write)-n into it.
impl IntoResponse for Context {
    fn into_response(mut self) -> Response {
        Response {
            body: std::mem::take(&mut self.body),
            headers: Vec::new(),
            status: StatusCode::OK,
        }
    }
}

// ── Pool ──────────────────────────────────────────────────────────────────────

/// Freelist entries kept across requests. Beyond this the allocations are
/// dropped instead; steady-state size tracks peak concurrency, not uptime.
const POOL_LIMIT: usize = 128;

/// Recycles the capture list and response buffer of completed contexts.
pub(crate) struct ContextPool {
    free: Mutex<Vec<(Params, Vec<u8>)>>,
}

impl ContextPool {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            free: Mutex::new(Vec::new()),
        })
    }

    /// Takes a context off the freelist (or allocates one) and resets it
    /// for `request`. All fields are overwritten here, on acquisition —
    /// whatever the previous call left behind never reaches the handler.
    pub(crate) fn acquire(pool: &Arc<Self>, request: Request) -> Context {
        let (mut params, mut body) = pool.lock().pop().unwrap_or_default();
        params.clear();
        body.clear();
        Context {
            params,
            request,
            body,
            pool: Arc::clone(pool),
        }
    }

    fn release(&self, params: Params, body: Vec<u8>) {
        let mut free = self.lock();
        if free.len() < POOL_LIMIT {
            free.push((params, body));
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(Params, Vec<u8>)>> {
        match self.free.lock() {
            Ok(guard) => guard,
            // A panicking handler cannot leave the freelist in a bad state;
            // entries are reset on the way out anyway.
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn acquisition_resets_pooled_state() {
        let pool = ContextPool::new();

        let mut ctx = ContextPool::acquire(&pool, Request::test(Method::GET, "/a"));
        ctx.params_mut().push("id".to_owned(), "stale".to_owned());
        ctx.write(b"stale bytes");
        drop(ctx);

        let ctx = ContextPool::acquire(&pool, Request::test(Method::GET, "/b"));
        assert!(ctx.params().is_empty());
        assert!(ctx.body.is_empty());
        assert_eq!(ctx.param("id"), None);
        assert_eq!(ctx.request().path(), "/b");
    }

    #[test]
    fn write_through_context_becomes_a_200() {
        let pool = ContextPool::new();
        let mut ctx = ContextPool::acquire(&pool, Request::test(Method::GET, "/"));
        ctx.write(b"hello, ");
        ctx.write(b"world");

        let res = ctx.into_response();
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, b"hello, world");
        assert!(res.headers.is_empty());
    }

    #[test]
    fn param_lookup_scans_in_capture_order() {
        let pool = ContextPool::new();
        let mut ctx = ContextPool::acquire(&pool, Request::test(Method::GET, "/"));
        ctx.params_mut().push("id".to_owned(), "7".to_owned());
        ctx.params_mut().push("post_id".to_owned(), "19".to_owned());

        assert_eq!(ctx.param("id"), Some("7"));
        assert_eq!(ctx.param("post_id"), Some("19"));
        assert_eq!(ctx.param("missing"), None);
    }

    #[test]
    fn freelist_stops_growing_at_the_cap() {
        let pool = ContextPool::new();
        let live: Vec<Context> = (0..POOL_LIMIT + 10)
            .map(|_| ContextPool::acquire(&pool, Request::test(Method::GET, "/")))
            .collect();
        drop(live);
        assert_eq!(pool.lock().len(), POOL_LIMIT);
    }
}
