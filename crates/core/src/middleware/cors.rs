use crate::AllowedOrigins;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Build the CORS layer that limits which browser origins may call the server.
///
/// Requests from origins that are not allowed are still processed, but no
/// `Access-Control-Allow-Origin` header is returned so the browser refuses the response.
pub fn build_cors_layer(allowed_origins: &AllowedOrigins) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET]);
    match allowed_origins {
        AllowedOrigins::Any => {
            warn!("CORS is configured to allow any origin to make cross-origin requests.");
            layer.allow_origin(Any)
        }
        AllowedOrigins::Exact(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid allowed origin '{origin}'");
                        None
                    }
                })
                .collect();
            layer.allow_origin(origins)
        }
    }
}
