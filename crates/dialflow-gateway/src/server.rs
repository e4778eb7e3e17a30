// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use dialflow_core::DialflowError;
use dialflow_dispatch::CampaignDispatcher;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Dispatcher backing every campaign route.
    pub dispatcher: CampaignDispatcher,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Health state for the unauthenticated endpoint.
    pub health: HealthState,
}

/// Gateway server configuration (mirrors GatewayConfig from dialflow-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Builds the gateway router.
///
/// Routes:
/// - GET  /health (public)
/// - POST /v1/campaigns (with auth)
/// - GET  /v1/campaigns (with auth)
/// - GET  /v1/campaigns/{id} (with auth)
/// - GET  /v1/campaigns/{id}/results (with auth)
/// - POST /v1/campaigns/{id}/pause | resume | cancel (with auth)
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    // Unauthenticated public route (health for systemd and load balancers).
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .with_state(state.clone());

    // Routes requiring authentication.
    let api_routes = Router::new()
        .route(
            "/v1/campaigns",
            post(handlers::post_campaigns).get(handlers::get_campaigns),
        )
        .route("/v1/campaigns/{id}", get(handlers::get_campaign))
        .route(
            "/v1/campaigns/{id}/results",
            get(handlers::get_campaign_results),
        )
        .route("/v1/campaigns/{id}/pause", post(handlers::post_pause))
        .route("/v1/campaigns/{id}/resume", post(handlers::post_resume))
        .route("/v1/campaigns/{id}/cancel", post(handlers::post_cancel))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server.
///
/// Binds to the configured host:port and serves until the `shutdown`
/// future resolves, then finishes in-flight requests and returns.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DialflowError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DialflowError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| DialflowError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
