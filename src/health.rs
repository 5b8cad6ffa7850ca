//! Built-in Kubernetes health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from the load-balancer. |
//!
//! These are ordinary handlers — register them like any other route:
//!
//! ```rust,no_run
//! use torii::{health, Router};
//!
//! let app = Router::new()
//!     .get("/healthz", health::liveness)
//!     .get("/readyz", health::readiness);
//! ```
//!
//! Swap `readiness` for your own handler to gate on dependency health
//! (database connections, downstream services, warm-up state).

use crate::{Context, Response};

/// Liveness probe handler.
///
/// Always `200 OK` with body `"ok"`. If the process answers HTTP at all it
/// is alive, so this handler deliberately depends on nothing.
pub async fn liveness(_ctx: Context) -> Response {
    Response::text("ok")
}

/// Readiness probe handler (default implementation).
///
/// `200 OK` with body `"ready"`. Replace it when your application needs a
/// warm-up period or must verify dependencies before taking traffic.
pub async fn readiness(_ctx: Context) -> Response {
    Response::text("ready")
}
