use std::sync::{Arc, Mutex};

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::Value;

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing is listening on.
pub fn unused_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub type Captured = Arc<Mutex<Vec<Value>>>;

/// `/api/generate` stub answering every request with `status` and `body`,
/// recording the JSON it was sent.
pub fn ollama_stub(status: StatusCode, body: Value) -> (Router, Captured) {
    let seen = Captured::default();
    let app = Router::new()
        .route(
            "/api/generate",
            post(
                move |State(seen): State<Captured>, Json(request): Json<Value>| {
                    let body = body.clone();
                    async move {
                        seen.lock().unwrap().push(request);
                        (status, Json(body))
                    }
                },
            ),
        )
        .with_state(seen.clone());
    (app, seen)
}
