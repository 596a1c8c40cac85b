//! Operation catalog and request handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use tally_core::{Operation, OperationRequest, Page, Paginator};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

/// Operation list query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListOperationsQuery {
    /// Case-insensitive type prefix, e.g. `add`.
    pub operation_type: Option<String>,
    /// 1-indexed page (default: 1).
    pub page: Option<String>,
    /// Page size (default: 10).
    pub per_page: Option<String>,
}

/// List the operation catalog.
pub async fn list_operations(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<ListOperationsQuery>,
) -> Result<Json<Page<Operation>>, ApiError> {
    let paginator = Paginator::from_params(query.page.as_deref(), query.per_page.as_deref())?;
    let operations = state.catalog.list(query.operation_type.as_deref())?;

    Ok(Json(paginator.paginate(operations)))
}

/// Accepted request response.
#[derive(Debug, Serialize)]
pub struct OperationRequestResponse {
    /// Id of the record settlement will write; poll `/v1/records/{record_id}`.
    pub record_id: String,
    /// Transport message id.
    pub message_id: String,
}

/// Request an operation. Settlement happens asynchronously.
pub async fn request_operation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(request): ApiJson<OperationRequest>,
) -> Result<(StatusCode, Json<OperationRequestResponse>), ApiError> {
    let admitted = state.admission.admit(auth.user_id, &request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(OperationRequestResponse {
            record_id: admitted.record_id.to_string(),
            message_id: admitted.message_id,
        }),
    ))
}
