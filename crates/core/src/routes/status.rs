use crate::AppState;
use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct VerifyResponse {
    status: &'static str,
    message: &'static str,
    environment: String,
    /// Whether an API key is configured, never the key itself.
    #[serde(rename = "apiKey")]
    api_key: &'static str,
    origin: String,
}

pub async fn index_handler() -> &'static str {
    concat!(
        env!("CARGO_PKG_NAME"),
        " ",
        env!("CARGO_PKG_VERSION"),
        " is running."
    )
}

pub async fn health_handler() -> &'static str {
    "OK"
}

pub async fn verify_handler(State(state): State<Arc<AppState>>) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        status: "success",
        message: "Server is running",
        environment: state.settings.environment.clone(),
        api_key: if state.settings.api_key.is_some() {
            "Present"
        } else {
            "Missing"
        },
        origin: state.settings.allowed_origins.to_string(),
    })
}
