use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::Value;
use std::sync::{Arc, Mutex};

pub type Captured = Arc<Mutex<Vec<Value>>>;

#[derive(Clone)]
struct RelayState {
    status: StatusCode,
    captured: Captured,
}

async fn relay(State(state): State<RelayState>, Json(body): Json<Value>) -> StatusCode {
    if let Ok(mut captured) = state.captured.lock() {
        captured.push(body);
    }
    state.status
}

/// Start a fake webhook relay answering every POST with `status`.
pub async fn spawn_relay(status: StatusCode) -> (String, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let state = RelayState {
        status,
        captured: captured.clone(),
    };
    let app = Router::new().route("/hook", post(relay)).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/hook", addr), captured)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
