pub mod auth;
pub mod config;
pub mod error;
pub mod helpers;
mod routes;
pub mod security;
mod validation;

use axum::{
    Router,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::TokenKeys;
use crate::config::{AppEnv, Config};

pub struct AppState {
    pub db: inventory_db::Database,
    pub tokens: TokenKeys,
    pub app_env: AppEnv,
}

/// Create the application router with the given database and configuration
pub fn create_app(db: inventory_db::Database, config: &Config) -> Router {
    let state = Arc::new(AppState {
        db,
        tokens: TokenKeys::new(&config.jwt_secret, config.jwt_expiration),
        app_env: config.app_env,
    });

    // Public account routes, rate limited per client IP against credential stuffing
    let auth_routes = Router::new()
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login));

    let mut governor = GovernorConfigBuilder::default();
    governor
        .per_second(config.rate_limit_auth_period_secs)
        .burst_size(config.rate_limit_auth_burst);

    // Peer address unless a trusted proxy supplies the client IP
    let limited = if config.trust_proxy_headers {
        governor
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .map(|limits| auth_routes.clone().layer(GovernorLayer::new(limits)))
    } else {
        governor
            .finish()
            .map(|limits| auth_routes.clone().layer(GovernorLayer::new(limits)))
    };

    let auth_routes = limited.unwrap_or_else(|| {
        tracing::warn!("auth rate limit disabled: period and burst must be non-zero");
        auth_routes
    });

    // Everything under /api/servers requires a bearer token
    let server_routes = Router::new()
        .route(
            "/api/servers",
            post(routes::servers::create).get(routes::servers::list),
        )
        .route(
            "/api/servers/{id}",
            get(routes::servers::get)
                .put(routes::servers::update)
                .delete(routes::servers::delete),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let router = Router::new()
        .route("/health", get(routes::health))
        .merge(auth_routes)
        .merge(server_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(RequestBodyLimitLayer::new(config.request_body_limit))
        .layer(middleware::map_response(error::envelope_layer_rejections));

    security::with_security_headers(router, config.app_env)
        .layer(security::cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
