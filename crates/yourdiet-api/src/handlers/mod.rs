pub mod diets;
pub mod events;
pub mod users;

use axum::Json;
use serde_json::{Value, json};

/// `GET /ping`
pub async fn ping() -> Json<Value> { Json(json!({ "message": "pong" })) }
