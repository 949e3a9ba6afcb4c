mod places;
mod status;

pub use places::*;
pub use status::*;

use crate::AppState;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::borrow::Cow;
use tracing::warn;
use url::Url;

#[derive(Serialize)]
pub struct ErrorResponse {
    error: Cow<'static, str>,
}

/// Routes that forward to the upstream, each with its own failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    TextSearch,
    Photo,
}

impl Route {
    const fn failure_message(self) -> &'static str {
        match self {
            Self::TextSearch => "Failed to fetch place data",
            Self::Photo => "Failed to fetch photo",
        }
    }

    fn failure(self, source: impl Into<anyhow::Error>) -> GatewayError {
        GatewayError::Upstream {
            route: self,
            source: source.into(),
        }
    }

    fn request_failure(self, err: reqwest::Error) -> GatewayError {
        // Upstream URLs carry the API key so they must never reach the logs.
        self.failure(err.without_url())
    }
}

/// Errors that can be returned from any route.
///
/// Upstream failures never relay their cause to the client, only the route's fixed message.
#[derive(Debug)]
pub enum GatewayError {
    MissingParameter(&'static str),
    Upstream {
        route: Route,
        source: anyhow::Error,
    },
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingParameter(name) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: Cow::Owned(format!("Missing required query parameter '{name}'")),
                }),
            )
                .into_response(),
            Self::Upstream { route, source } => {
                warn!("{}: {source:#}", route.failure_message());
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: Cow::Borrowed(route.failure_message()),
                    }),
                )
                    .into_response()
            }
        }
    }
}

/// A query parameter that must be present and non-empty.
fn required<'a>(name: &'static str, value: Option<&'a str>) -> Result<&'a str, GatewayError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(GatewayError::MissingParameter(name))
}

/// A query parameter that is forwarded only when it has a value.
fn optional(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Send a GET request to the upstream, treating any unsuccessful status code as a failure.
async fn send_upstream(
    state: &AppState,
    route: Route,
    url: Url,
) -> Result<reqwest::Response, GatewayError> {
    state
        .http_client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|err| route.request_failure(err))
}

/// Refuse to relay anything that contains the API key.
fn ensure_key_absent<'a>(
    state: &AppState,
    route: Route,
    parts: impl IntoIterator<Item = &'a [u8]>,
) -> Result<(), GatewayError> {
    let Some(key) = &state.settings.api_key else {
        return Ok(());
    };
    if parts.into_iter().any(|part| key.is_contained_in(part)) {
        return Err(route.failure(anyhow::anyhow!(
            "upstream response contained the API key"
        )));
    }
    Ok(())
}
