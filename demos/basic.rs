//! Minimal strata example: JSON endpoints under a mounted router, static
//! files, and an error handler.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/api/users/42
//!   curl -X POST http://localhost:3000/api/users -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:3000/api/users/42
//!   curl -i -X OPTIONS http://localhost:3000/api/users/42
//!   curl -i http://localhost:3000/assets

use strata::middleware::{ServeStaticOptions, serve_static};
use strata::{Application, Error, Next, Outcome, Request, Response, Router, Server, Settings, StatusCode};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let users = Router::new()
        .get("/users/:id",    get_user)
        .post("/users",       create_user)
        .delete("/users/:id", delete_user);

    let settings = Settings { json_spaces: Some(2), ..Settings::default() };

    let app = Application::with_settings(settings)
        .middleware_at("/assets", serve_static("public", ServeStaticOptions::default()))
        .mount("/api", users)
        .catch(report);

    if let Err(e) = Server::bind("0.0.0.0:3000").serve(app).await {
        eprintln!("server error: {e}");
    }
}

// GET /api/users/:id
async fn get_user(req: Request, mut res: Response, next: Next) -> Outcome {
    let id = req.param("id").unwrap_or("unknown").to_owned();
    if id == "0" {
        return next.fail(req, res, Error::not_found());
    }
    let sent = res.json(&serde_json::json!({ "id": id, "name": "alice" }));
    next.settle(req, res, sent)
}

// POST /api/users
async fn create_user(req: Request, mut res: Response, next: Next) -> Outcome {
    if req.body().is_empty() {
        let sent = res.send_status(StatusCode::BAD_REQUEST);
        return next.settle(req, res, sent);
    }
    res.set_status(StatusCode::CREATED).location("/api/users/99");
    let sent = res.json(&serde_json::json!({ "id": "99", "name": "new_user" }));
    next.settle(req, res, sent)
}

// DELETE /api/users/:id → 204 No Content
async fn delete_user(req: Request, mut res: Response, next: Next) -> Outcome {
    let sent = res.send_status(StatusCode::NO_CONTENT);
    next.settle(req, res, sent)
}

async fn report(err: Error, req: Request, mut res: Response, next: Next) -> Outcome {
    tracing::warn!(path = %req.original_url(), "request failed: {err}");
    res.set_status(err.status());
    let sent = res.json(&serde_json::json!({ "error": err.status().canonical_reason() }));
    next.settle(req, res, sent)
}
