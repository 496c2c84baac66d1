//! CRUD over the server inventory. Every route here sits behind `require_auth`.

use crate::AppState;
use crate::auth::{AuthUser, hash_password};
use crate::error::AppError;
use crate::helpers::now;
use crate::routes::ApiJson;
use crate::validation::{self, ValidationError};

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_macros::debug_handler;
use chrono::{DateTime, Utc};
use inventory_db::{DbError, Server, ServerFields};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Full server payload, used by both create and PUT.
///
/// PUT replaces the whole record, so every required field has to be sent
/// again; anything omitted is a validation error, not "unchanged".
#[derive(Default, Deserialize)]
#[serde(default)]
pub(crate) struct ServerRequest {
    project_name: String,
    project_purpose: String,
    environment: String,
    vm_name: String,
    cpu: Option<i64>,
    ram: Option<i64>,
    storage: Option<i64>,
    total_cost: Option<f64>,
    os_version: String,
    ip: String,
    hostname: String,
    username: String,
    password: String,
    server_no: String,
    created_by: String,
    remarks: Option<String>,
    delete_date: Option<DateTime<Utc>>,
}

/// Numeric fields once they are known to be present and positive.
struct Sizing {
    cpu: i64,
    ram: i64,
    storage: i64,
    total_cost: f64,
}

impl ServerRequest {
    fn validate(&self) -> Result<Sizing, ValidationError> {
        for (field, value) in [
            ("project_name", &self.project_name),
            ("project_purpose", &self.project_purpose),
            ("environment", &self.environment),
            ("vm_name", &self.vm_name),
            ("os_version", &self.os_version),
            ("ip", &self.ip),
            ("hostname", &self.hostname),
            ("username", &self.username),
            ("password", &self.password),
            ("server_no", &self.server_no),
            ("created_by", &self.created_by),
        ] {
            validation::require_text(field, value)?;
        }

        Ok(Sizing {
            cpu: validation::require_positive("cpu", self.cpu)?,
            ram: validation::require_positive("ram", self.ram)?,
            storage: validation::require_positive("storage", self.storage)?,
            total_cost: validation::require_amount("total_cost", self.total_cost)?,
        })
    }

    fn into_fields(self, sizing: Sizing, password_hash: String) -> ServerFields {
        ServerFields {
            project_name: self.project_name,
            purpose: self.project_purpose,
            environment: self.environment,
            vm_name: self.vm_name,
            cpu: sizing.cpu,
            ram: sizing.ram,
            storage: sizing.storage,
            total_cost: sizing.total_cost,
            os_version: self.os_version,
            ip: self.ip,
            hostname: self.hostname,
            username: self.username,
            password_hash,
            server_no: self.server_no,
            created_by: self.created_by,
            remarks: self.remarks,
            delete_date: self.delete_date,
        }
    }

    /// Validate, then hash the VM password.
    async fn into_validated_fields(self) -> Result<ServerFields, AppError> {
        let sizing = self.validate()?;
        let password_hash = hash_password(self.password.clone()).await?;
        Ok(self.into_fields(sizing, password_hash))
    }
}

#[derive(Deserialize)]
pub(crate) struct ListQuery {
    page: Option<String>,
    limit: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct ServerList {
    servers: Vec<Server>,
    total: u64,
    page: u64,
    limit: u64,
}

#[derive(Serialize)]
pub(crate) struct MessageResponse {
    message: &'static str,
}

#[debug_handler]
pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<ServerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let fields = payload.into_validated_fields().await?;

    let server = state
        .db
        .insert_server(fields, now())
        .await
        .map_err(AppError::storage("Failed to create server"))?;

    tracing::info!(server_id = %server.id, user = %user.username, "created server");
    Ok((StatusCode::CREATED, Json(server)))
}

#[debug_handler]
pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pagination = validation::parse_pagination(query.page.as_deref(), query.limit.as_deref())?;

    let servers = state
        .db
        .list_servers(pagination.skip(), pagination.limit)
        .await
        .map_err(AppError::storage("Failed to fetch servers"))?;

    let total = state
        .db
        .count_servers()
        .await
        .map_err(AppError::storage("Failed to count servers"))?;

    Ok(Json(ServerList {
        servers,
        total,
        page: pagination.page,
        limit: pagination.limit,
    }))
}

#[debug_handler]
pub(crate) async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = validation::parse_server_id(&id)?;

    let server = state
        .db
        .get_server(id)
        .await
        .map_err(AppError::storage("Failed to fetch server"))?
        .ok_or(DbError::ServerNotFound)?;

    Ok(Json(server))
}

/// PUT: full replacement. The id comes from the path; any id in the body is ignored.
#[debug_handler]
pub(crate) async fn update(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ServerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = validation::parse_server_id(&id)?;
    let fields = payload.into_validated_fields().await?;

    let server = state
        .db
        .replace_server(id, fields, now())
        .await
        .map_err(AppError::storage("Failed to update server"))?;

    tracing::info!(server_id = %server.id, user = %user.username, "updated server");
    Ok(Json(server))
}

#[debug_handler]
pub(crate) async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = validation::parse_server_id(&id)?;

    state
        .db
        .delete_server(id)
        .await
        .map_err(AppError::storage("Failed to delete server"))?;

    tracing::info!(server_id = %id, user_id = %user.id, user = %user.username, "deleted server");
    Ok(Json(MessageResponse {
        message: "Server deleted successfully",
    }))
}
