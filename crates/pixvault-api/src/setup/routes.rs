//! Route configuration and setup

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use pixvault_core::Config;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let body_limit = config.max_request_body_bytes();
    let http_concurrency_limit = config.server.http_concurrency_limit;
    tracing::info!(
        body_limit_bytes = body_limit,
        http_concurrency_limit = http_concurrency_limit,
        "HTTP limits configured"
    );

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/upload/image", post(handlers::upload::upload_image))
        .route("/upload/images", post(handlers::upload::upload_images));
    let app = media_routes(app, &state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Serve locally stored objects under the path the signer addresses them by.
#[cfg(feature = "storage-local")]
fn media_routes(app: Router<Arc<AppState>>, state: &AppState) -> Router<Arc<AppState>> {
    if state.local_media.is_none() {
        return app;
    }
    let path = format!("{}/{{container}}/{{name}}", state.uploads.signer().endpoint_path());
    tracing::info!(path = %path, "Serving locally stored media");
    app.route(&path, get(handlers::media::get_media))
}

#[cfg(not(feature = "storage-local"))]
fn media_routes(app: Router<Arc<AppState>>, _state: &AppState) -> Router<Arc<AppState>> {
    app
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let origins = &config.server.cors_origins;
    let cors = if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}
