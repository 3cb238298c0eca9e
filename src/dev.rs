use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use tracing::{instrument, warn};

use crate::{auth::error::AuthError, state::AppState};

/// Destructive helpers. Only mounted when dev endpoints are enabled.
pub fn router() -> Router<AppState> {
    Router::new().route("/migrate", post(migrate))
}

/// Drops and recreates the schema. Every account is lost.
#[instrument(skip(state))]
pub async fn migrate(State(state): State<AppState>) -> Result<Json<Value>, AuthError> {
    warn!("schema reset requested over HTTP");
    state.engine.reset_schema().await?;
    Ok(Json(json!({ "status": "schema recreated" })))
}
