use axum::{Json, extract::State, response::IntoResponse};

use crate::config::Config;

/// Configuration values the front end needs, never including secrets.
pub async fn public_config(State(config): State<Config>) -> impl IntoResponse {
    Json(config.public())
}
