use axum::Json;
use serde_json::{json, Value};

use crate::config::SERVICE_NAME;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}
