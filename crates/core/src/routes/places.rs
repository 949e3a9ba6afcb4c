use super::{GatewayError, Route, ensure_key_absent, optional, required, send_upstream};
use crate::{
    AppState,
    upstream::{self, PhotoLookup, TextSearch},
};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderValue, header},
    response::Response,
};
use bytes::Bytes;
use futures::StreamExt;
use mime::{APPLICATION_JSON, APPLICATION_OCTET_STREAM};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct TextSearchQueryParams {
    /// Free-form text to search for.
    pub query: Option<String>,

    /// Point to bias results around, as `lat,lng`.
    pub location: Option<String>,

    /// Distance in meters around `location` to bias results within.
    pub radius: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PhotoQueryParams {
    /// Maximum width of the returned photo.
    pub maxwidth: Option<String>,

    /// Reference to the photo, obtained from a previous text search.
    pub photo_reference: Option<String>,
}

pub async fn text_search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TextSearchQueryParams>,
) -> Result<Response, GatewayError> {
    const ROUTE: Route = Route::TextSearch;

    let search = TextSearch {
        query: required("query", params.query.as_deref())?,
        location: optional(params.location.as_deref()),
        radius: optional(params.radius.as_deref()),
    };
    let url = upstream::text_search_url(
        &state.settings.upstream_settings.base_url,
        state.settings.api_key.as_ref(),
        &search,
    )
    .map_err(|err| ROUTE.failure(err))?;

    debug!(
        "Forwarding text search (location: {}, radius: {})",
        search.location.is_some(),
        search.radius.is_some()
    );
    let response = send_upstream(&state, ROUTE, url).await?;
    let body = response
        .bytes()
        .await
        .map_err(|err| ROUTE.request_failure(err))?;

    // Relayed verbatim, but it must at least be JSON.
    serde_json::from_slice::<serde::de::IgnoredAny>(&body).map_err(|err| ROUTE.failure(err))?;
    ensure_key_absent(&state, ROUTE, [&body[..]])?;

    let mut response = Response::new(Body::from(body));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(APPLICATION_JSON.essence_str())
            .expect("header value from mime essence string should always be valid"),
    );
    Ok(response)
}

pub async fn photo_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PhotoQueryParams>,
) -> Result<Response, GatewayError> {
    const ROUTE: Route = Route::Photo;

    let lookup = PhotoLookup {
        maxwidth: required("maxwidth", params.maxwidth.as_deref())?,
        photo_reference: required("photo_reference", params.photo_reference.as_deref())?,
    };
    let url = upstream::photo_url(
        &state.settings.upstream_settings.base_url,
        state.settings.api_key.as_ref(),
        &lookup,
    )
    .map_err(|err| ROUTE.failure(err))?;

    debug!("Forwarding photo request (maxwidth: {})", lookup.maxwidth);
    let response = send_upstream(&state, ROUTE, url).await?;
    let max_content_length = state.settings.photo_settings.max_content_length;

    // Fail early on the reported size, the actual size is enforced while downloading.
    if let Some(content_length) = response.content_length()
        && content_length > max_content_length
    {
        return Err(ROUTE.failure(anyhow::anyhow!(
            "photo of {content_length} bytes exceeds the maximum of {max_content_length} bytes"
        )));
    }

    // The upstream's Content-Type is relayed as-is.
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| {
            HeaderValue::from_str(APPLICATION_OCTET_STREAM.essence_str())
                .expect("header value from mime essence string should always be valid")
        });
    let cache_control = response.headers().get(header::CACHE_CONTROL).cloned();

    let body = {
        let mut buffer = Vec::with_capacity(
            response
                .content_length()
                .map(|len| len.min(max_content_length) as usize)
                .unwrap_or_default(),
        );
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| ROUTE.request_failure(err))?;
            if buffer.len() as u64 + chunk.len() as u64 > max_content_length {
                return Err(ROUTE.failure(anyhow::anyhow!(
                    "photo exceeded the maximum of {max_content_length} bytes whilst downloading"
                )));
            }
            buffer.extend_from_slice(&chunk);
        }
        Bytes::from(buffer)
    };

    ensure_key_absent(
        &state,
        ROUTE,
        [
            &body[..],
            content_type.as_bytes(),
            cache_control.as_ref().map_or(&[][..], HeaderValue::as_bytes),
        ],
    )?;

    let mut response = Response::new(Body::from(body));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    if let Some(cache_control) = cache_control {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, cache_control);
    }
    Ok(response)
}
