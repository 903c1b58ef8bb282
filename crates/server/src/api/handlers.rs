use super::{ApiError, ApiResult, AppState};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tenantops_core::service::{CreateTenantParams, TenantServiceError};
use tenantops_core::service::OperationServiceError;
use tenantops_core::{Operation, OperationId, TenantId};

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    pub region: String,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub isolation_group_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTenantResponse {
    pub tenant_id: i64,
    pub operation_id: i64,
    pub status: &'static str,
}

pub async fn create_tenant(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTenantRequest>,
) -> ApiResult<Json<CreateTenantResponse>> {
    let (tenant_id, operation_id) = state
        .tenant_service
        .create(CreateTenantParams {
            name: req.name,
            region: req.region,
            tier: req.tier,
            isolation_group_id: req.isolation_group_id,
        })
        .await
        .map_err(tenant_service_error)?;

    Ok(Json(CreateTenantResponse { tenant_id: tenant_id.0, operation_id: operation_id.0, status: "pending" }))
}

#[derive(Debug, Serialize)]
pub struct DeleteTenantResponse {
    pub tenant_id: i64,
    pub operation_id: i64,
    pub status: &'static str,
}

pub async fn delete_tenant(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<i64>,
) -> ApiResult<Json<DeleteTenantResponse>> {
    let (operation_id, tenant_id) =
        state.tenant_service.delete(TenantId(tenant_id)).await.map_err(tenant_service_error)?;

    Ok(Json(DeleteTenantResponse { tenant_id: tenant_id.0, operation_id: operation_id.0, status: "pending" }))
}

#[derive(Debug, Serialize)]
pub struct OperationResponse {
    #[serde(flatten)]
    pub operation: Operation,
    pub progress: Option<u8>,
}

pub async fn get_operation(
    State(state): State<Arc<AppState>>,
    Path(operation_id): Path<i64>,
) -> ApiResult<Json<OperationResponse>> {
    let operation = state
        .operation_service
        .get_by_id(OperationId(operation_id))
        .await
        .map_err(operation_service_error)?;
    let progress = operation.progress().ok();

    Ok(Json(OperationResponse { operation, progress }))
}

fn tenant_service_error(e: TenantServiceError) -> ApiError {
    match e {
        TenantServiceError::Validation(inner) => ApiError::new(StatusCode::BAD_REQUEST, inner.to_string()),
        TenantServiceError::AlreadyExists => ApiError::new(StatusCode::CONFLICT, e.to_string()),
        TenantServiceError::NotFound => ApiError::new(StatusCode::NOT_FOUND, e.to_string()),
        TenantServiceError::Internal(_) => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
    }
}

fn operation_service_error(e: OperationServiceError) -> ApiError {
    match e {
        OperationServiceError::NotFound => ApiError::new(StatusCode::NOT_FOUND, e.to_string()),
        OperationServiceError::Internal(_) => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
    }
}
