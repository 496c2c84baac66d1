//! CORS policy per deployment mode, and the response headers every reply carries.

use std::time::Duration;

use axum::Router;
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::Method;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{AppEnv, Config};

const PRODUCTION_ORIGINS: &[&str] = &[
    "https://yourdomain.com",
    "https://app.yourdomain.com",
    "https://api.yourdomain.com",
];

const STAGING_ORIGINS: &[&str] = &[
    "https://staging.yourdomain.com",
    "https://alpha.yourdomain.com",
    "http://localhost:3000",
    "http://localhost:3001",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:3001",
];

const DEVELOPMENT_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:3001",
    "http://localhost:8080",
    "http://localhost:5000",
    "http://localhost:5173", // Vite
    "http://localhost:5174",
];

/// Which origins may call the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    /// Any origin, credentials disabled
    Any,
    List(Vec<String>),
}

/// Resolve the allowed origins for the configured mode.
pub fn resolve_origins(config: &Config) -> CorsOrigins {
    let base = |defaults: &[&str]| -> Vec<String> {
        config
            .allowed_origins
            .clone()
            .unwrap_or_else(|| defaults.iter().map(|s| s.to_string()).collect())
    };

    match config.app_env {
        AppEnv::Production => {
            let mut origins = base(PRODUCTION_ORIGINS);
            origins.extend(config.custom_domains.iter().cloned());
            CorsOrigins::List(clean_origins(origins))
        }
        AppEnv::Staging => {
            let mut origins = base(STAGING_ORIGINS);
            origins.extend(config.preview_domains.iter().cloned());
            CorsOrigins::List(origins)
        }
        AppEnv::Development if config.cors_allow_all => CorsOrigins::Any,
        AppEnv::Development => CorsOrigins::List(
            DEVELOPMENT_ORIGINS.iter().map(|s| s.to_string()).collect(),
        ),
    }
}

/// Trim origins, drop empty ones and anything that is not http(s).
pub fn clean_origins(origins: Vec<String>) -> Vec<String> {
    origins
        .into_iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .filter(|o| {
            let ok = o.starts_with("http://") || o.starts_with("https://");
            if !ok {
                tracing::warn!(origin = %o, "Invalid origin format (missing http/https), skipping");
            }
            ok
        })
        .collect()
}

pub fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-csrf-token"),
            header::ACCEPT,
            header::ACCEPT_LANGUAGE,
            HeaderName::from_static("x-forwarded-for"),
            HeaderName::from_static("x-real-ip"),
        ])
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
        ])
        .max_age(Duration::from_secs(12 * 3600));

    match resolve_origins(config) {
        CorsOrigins::Any => {
            tracing::info!(mode = %config.app_env, "CORS configured: allowing any origin");
            layer.allow_origin(AllowOrigin::any())
        }
        CorsOrigins::List(origins) => {
            tracing::info!(mode = %config.app_env, ?origins, "CORS configured");
            let values: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(origin = %o, "origin is not a valid header value, skipping");
                        None
                    }
                })
                .collect();
            layer
                .allow_origin(AllowOrigin::list(values))
                .allow_credentials(true)
        }
    }
}

/// Attach the standard security headers. HSTS only in production.
pub fn with_security_headers<S>(router: Router<S>, app_env: AppEnv) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let router = router
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self'"),
        ));

    if app_env == AppEnv::Production {
        router.layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains; preload"),
        ))
    } else {
        router
    }
}
