//! Crate for Placegate, a gateway that injects a server-held API key into requests
//! made to a places API so that the key is never exposed to browser clients.

#[cfg(feature = "rustls-tls")]
#[cfg(feature = "native-tls")]
compile_error!("You can only enable one TLS backend");

pub extern crate url;

mod http_client;
mod middleware;
mod routes;
mod secret;
mod upstream;


pub use secret::ApiKey;

use anyhow::{Result, ensure};
use axum::{Router, http::StatusCode, middleware as axum_middleware, routing::get};
use core::{fmt, net::SocketAddr, time::Duration};
use http_client::{BuildHttpClientArgs, HttpClient, build_http_client};
use reqwest::Proxy;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower_http::{
    catch_panic::CatchPanicLayer,
    timeout::TimeoutLayer,
    trace::{self, TraceLayer},
};
use tracing::{Level, info, warn};
use url::Url;

/// # Example
/// ```rust,no_run
/// use std::net::{SocketAddr, IpAddr, Ipv4Addr};
/// use placegate::{ApiKey, PlacegateServer, ServerSettings};
///
/// # #[tokio::main]
/// # async fn main() {
/// let server = PlacegateServer::new(ServerSettings {
///     api_key: Some(ApiKey::new("my-api-key")),
///     ..Default::default()
/// })
/// .unwrap();
/// server.start(&SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 3000)).await.unwrap();
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PlacegateServer {
    router_inner: Router,
}

/// Settings to run the Placegate server with.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// How long a request can take to be processed before it is abandoned
    /// and an error is sent to the client.
    pub request_timeout: Duration,

    /// Label for the deployment this server is running in (e.g. `development` or `production`).
    ///
    /// Only reported back by the verification route.
    pub environment: String,

    /// The key attached to every request made to the upstream API.
    ///
    /// When this is unset requests are still forwarded, but the upstream will reject them.
    pub api_key: Option<ApiKey>,

    /// Origins that browsers are allowed to call this server from.
    pub allowed_origins: AllowedOrigins,

    /// See [`UpstreamSettings`].
    pub upstream_settings: UpstreamSettings,

    /// See [`PhotoSettings`].
    pub photo_settings: PhotoSettings,
}

/// Configuration options used when making any call to the upstream API regardless of route.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// Base URL of the upstream places API, endpoint paths are appended to it.
    pub base_url: Url,

    /// How long to wait for a request to the upstream to complete before it's abandoned
    /// and considered failed.
    pub request_timeout: Duration,

    /// The maximum amount of redirects to follow when making a request to the upstream before abandoning the request.
    pub max_redirects: usize,

    /// Whether to allow invalid/expired/forged TLS certificates when making upstream requests.
    ///
    /// **Enabling this is dangerous and is usually not necessary.**
    pub allow_invalid_certs: bool,

    /// The proxy to send all upstream requests through.
    pub request_proxy: Option<Url>,
}

/// Configuration options used for the photo route.
#[derive(Debug, Clone)]
pub struct PhotoSettings {
    /// The maximum size of a photo that can be relayed.
    /// Anything larger than this value will not be sent and an error will be shown instead.
    pub max_content_length: u64,
}

/// Origins permitted to make cross-origin requests to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Any origin is allowed.
    Any,
    /// Only the listed origins are allowed.
    Exact(Box<[String]>),
}

impl AllowedOrigins {
    /// Build from a list of origins, where a `*` entry allows any origin.
    pub fn from_list(origins: impl IntoIterator<Item = String>) -> Self {
        let origins: Vec<String> = origins
            .into_iter()
            .map(|o| o.trim().to_owned())
            .filter(|o| !o.is_empty())
            .collect();
        if origins.iter().any(|o| o == "*") {
            return Self::Any;
        }
        Self::Exact(origins.into_boxed_slice())
    }
}

impl fmt::Display for AllowedOrigins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(origins) => f.write_str(&origins.join(",")),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            environment: String::from("development"),
            api_key: None,
            allowed_origins: AllowedOrigins::Exact(Box::new([String::from(
                "http://localhost:5173",
            )])),
            upstream_settings: UpstreamSettings::default(),
            photo_settings: PhotoSettings::default(),
        }
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse(upstream::DEFAULT_BASE_URL)
                .expect("default upstream url should be valid"),
            request_timeout: Duration::from_secs(10),
            max_redirects: 5,
            allow_invalid_certs: false,
            request_proxy: None,
        }
    }
}

impl Default for PhotoSettings {
    fn default() -> Self {
        Self {
            max_content_length: 20_000_000,
        }
    }
}

#[derive(Debug)]
struct AppState {
    http_client: HttpClient,
    settings: ServerSettings,
}

impl PlacegateServer {
    /// Create a new server with the provided settings.
    pub fn new(settings: ServerSettings) -> Result<Self> {
        ensure!(
            !settings.upstream_settings.base_url.cannot_be_a_base(),
            "upstream url '{}' cannot be used as a base url",
            settings.upstream_settings.base_url
        );
        // The upstream deadline has to fire first so that slow upstreams are reported
        // through the route's own failure response.
        ensure!(
            settings.request_timeout > settings.upstream_settings.request_timeout,
            "request timeout ({:?}) must be longer than the upstream request timeout ({:?})",
            settings.request_timeout,
            settings.upstream_settings.request_timeout
        );
        if settings.api_key.is_none() {
            warn!("No upstream API key has been configured, upstream requests will be rejected.");
        }

        let router = Router::new()
            .route("/", get(routes::index_handler))
            .route("/health", get(routes::health_handler))
            .route("/verify", get(routes::verify_handler))
            .route("/api/places/textsearch", get(routes::text_search_handler))
            .route("/api/places/photo", get(routes::photo_handler))
            .layer(middleware::build_cors_layer(&settings.allowed_origins))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                settings.request_timeout,
            ))
            .layer(CatchPanicLayer::new())
            .layer(axum_middleware::from_fn(middleware::header_middleware))
            .with_state(Arc::new(AppState {
                http_client: build_http_client(BuildHttpClientArgs {
                    allow_invalid_certs: settings.upstream_settings.allow_invalid_certs,
                    max_redirects: settings.upstream_settings.max_redirects,
                    request_timeout: settings.upstream_settings.request_timeout,
                    proxy: settings
                        .upstream_settings
                        .request_proxy
                        .as_ref()
                        .map(|p| Proxy::all(p.as_str()))
                        .transpose()?,
                })?,
                settings,
            }));

        Ok(Self {
            router_inner: router,
        })
    }

    /// Get the [`Router`] backing this server, for embedding it into another service.
    pub fn router(&self) -> Router {
        self.router_inner.clone()
    }

    /// Start the server and expose it locally on the provided [`SocketAddr`].
    pub async fn start(self, address: &SocketAddr) -> Result<()> {
        let tcp_listener = TcpListener::bind(&address).await?;
        info!("Listening on http://{}", tcp_listener.local_addr()?);
        axum::serve(tcp_listener, self.router_inner)
            .with_graceful_shutdown(Self::shutdown_signal())
            .await?;
        Ok(())
    }

    // https://github.com/tokio-rs/axum/blob/15917c6dbcb4a48707a20e9cfd021992a279a662/examples/graceful-shutdown/src/main.rs#L55
    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }
}
