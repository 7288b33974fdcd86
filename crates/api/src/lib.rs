//! Urbanova API Server Library

pub mod config;
pub mod error;
mod routes;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::FromRef;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use urbanova_core::services::ConciergeServices;

#[derive(Clone)]
pub struct AppState {
    pub services: ConciergeServices,
}

impl AppState {
    pub fn new(services: ConciergeServices) -> Self {
        Self { services }
    }
}

impl FromRef<AppState> for ConciergeServices {
    fn from_ref(state: &AppState) -> Self {
        state.services.clone()
    }
}

fn cors_layer(cors_origin: &str) -> Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if cors_origin == "*" {
        return Ok(layer.allow_origin(Any));
    }
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin '{cors_origin}'"))?;
    Ok(layer.allow_origin(origin))
}

/// Create the application router
pub fn create_router(state: AppState, cors_origin: &str) -> Result<Router> {
    Ok(Router::new()
        .merge(routes::health::routes())
        .nest(
            "/api",
            routes::appointments::routes()
                .merge(routes::ics::routes())
                .merge(routes::kyc::routes()),
        )
        .layer(cors_layer(cors_origin)?)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let user_agent = request
                        .headers()
                        .get(axum::http::header::USER_AGENT)
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("unknown");

                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        user_agent = %user_agent,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %response.status(),
                            "finished processing request"
                        );
                    },
                ),
        )
        .with_state(state))
}

/// Run the API server until the listener fails
pub async fn run_api(state: AppState, config: &config::Config) -> Result<()> {
    let app = create_router(state, &config.cors_allowed_origin)?;
    let addr = format!("{}:{}", config.host, config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
