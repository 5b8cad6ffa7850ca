//! Minimal torii example — CRUD-style JSON endpoints and health checks.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/42/posts/7
//!   curl -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:3000/users/42
//!   curl http://localhost:3000/healthz

use torii::{health, Context, Response, Router, Server, StatusCode};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .get("/users/:id", get_user)
        .get("/users/:id/posts/:post_id", get_post)
        .post("/users", create_user)
        .delete("/users/:id", delete_user)
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /users/:id — write-through style: the context itself becomes the
// response, carrying exactly the written bytes.
async fn get_user(mut ctx: Context) -> Context {
    let id = ctx.param("id").unwrap_or("unknown").to_owned();
    ctx.write(format!(r#"{{"id":"{id}","name":"alice"}}"#).as_bytes());
    ctx
}

// GET /users/:id/posts/:post_id — two captures, in path order.
async fn get_post(ctx: Context) -> Response {
    let user = ctx.param("id").unwrap_or("?");
    let post = ctx.param("post_id").unwrap_or("?");
    Response::json(format!(r#"{{"user":"{user}","post":"{post}"}}"#).into_bytes())
}

// POST /users
//
// ctx.request().body() is &[u8] — parse with serde_json::from_slice or
// friends; torii does not touch the bytes.
async fn create_user(ctx: Context) -> Response {
    if ctx.request().body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#.to_owned().into_bytes())
}

// DELETE /users/:id → 204 No Content
async fn delete_user(_ctx: Context) -> StatusCode {
    StatusCode::NO_CONTENT
}
