pub(crate) mod auth;
pub(crate) mod servers;

use crate::AppState;
use crate::error::AppError;

use axum::extract::State;
use axum::Json;
use axum_macros::FromRequest;
use serde::Serialize;
use std::sync::Arc;

/// `axum::Json` whose rejections use the API error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub(crate) struct ApiJson<T>(pub T);

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    env: &'static str,
    time: i64,
}

pub(crate) async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        env: state.app_env.as_str(),
        time: crate::helpers::now().timestamp(),
    })
}
