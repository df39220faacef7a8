pub mod products;
pub mod stock;
pub mod suppliers;
pub mod transfers;
pub mod users;
pub mod warehouses;

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
