//! HTTP server and graceful shutdown.
//!
//! The transport layer: accepts connections, drives them through hyper, and
//! funnels every request into the router. Shutdown is graceful — on SIGTERM
//! (what Kubernetes sends before SIGKILL) or Ctrl-C the listener stops
//! accepting immediately and every in-flight connection runs to completion
//! before [`Server::serve`] returns. Size your pod's
//! `terminationGracePeriodSeconds` above your slowest request.

use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::context::ContextPool;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: String,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called. The address is parsed in `serve`, so a bad one surfaces as
    /// an [`Error`] there rather than a panic here.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use torii::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        Self {
            addr: addr.to_owned(),
        }
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown: a signal, then all
    /// in-flight requests completing.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let addr: std::net::SocketAddr = self.addr.parse()?;
        let listener = TcpListener::bind(addr).await?;

        // Shared across every connection task; the routing table is read-only
        // from here on.
        let router = Arc::new(router);

        info!(addr = %addr, "torii listening");

        // Tracks every spawned connection so the drain below can wait for
        // all of them.
        let mut tasks = tokio::task::JoinSet::new();

        // The signal future is polled repeatedly across loop iterations, so
        // it must be pinned to one stack location first.
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Top-to-bottom arm order: a pending signal always beats the
                // accept queue, so shutdown takes effect immediately.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    debug!(peer = %remote_addr, "connection accepted");
                    let router = Arc::clone(&router);
                    // TokioIo adapts tokio's AsyncRead/AsyncWrite to hyper's
                    // IO traits.
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // One call per request on the connection, not one
                        // per connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(router, req).await }
                        });

                        // Speaks HTTP/1.1 or HTTP/2, whichever the client
                        // negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connections so the JoinSet stays bounded on
                // long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Drain every in-flight connection before returning.
        while tasks.join_next().await.is_some() {}

        info!("torii stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Hot path: one request in, one response out.
///
/// The error type is [`Infallible`](std::convert::Infallible) — every
/// failure becomes a response (404, 400, 500) and hyper never sees an error.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!("failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    Ok(respond(&router, parts, body).await.into_inner())
}

/// The serving entry point over the routing core: resolve the method + path,
/// populate a pooled context, invoke the handler — or answer 404.
async fn respond(router: &Router, parts: Parts, body: Bytes) -> Response {
    let method = parts.method.clone();
    let path = parts.uri.path().to_owned();

    let mut ctx = ContextPool::acquire(router.pool(), Request::new(parts, body));
    match router.resolve_into(&method, &path, ctx.params_mut()) {
        Some(handler) => handler.call(ctx).await,
        None => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .text("404 Not Found"),
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** (Kubernetes, systemd) and
/// **SIGINT** (Ctrl-C, local dev). On other platforms only Ctrl-C exists.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    // A future that never resolves — disables the SIGTERM arm off-Unix.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
