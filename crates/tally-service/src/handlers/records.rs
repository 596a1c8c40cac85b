//! Record handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use tally_core::{Page, Paginator, Record, RecordFilter};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::AppState;

/// Record list query parameters.
///
/// Date and balance bounds are epoch milliseconds and credits respectively.
/// When both kinds are given only the date bounds apply.
#[derive(Debug, Default, Deserialize)]
pub struct ListRecordsQuery {
    /// Inclusive lower date bound.
    pub date_start: Option<String>,
    /// Inclusive upper date bound.
    pub date_end: Option<String>,
    /// Inclusive lower balance bound.
    pub balance_start: Option<String>,
    /// Inclusive upper balance bound.
    pub balance_end: Option<String>,
    /// 1-indexed page (default: 1).
    pub page: Option<String>,
    /// Page size (default: 10).
    pub per_page: Option<String>,
    /// Also list soft-deleted records.
    #[serde(default)]
    pub include_deleted: bool,
}

/// List the caller's records, newest first.
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListRecordsQuery>,
) -> Result<Json<Page<Record>>, ApiError> {
    let filter = RecordFilter::from_params(
        query.date_start.as_deref(),
        query.date_end.as_deref(),
        query.balance_start.as_deref(),
        query.balance_end.as_deref(),
    )?;
    let paginator = Paginator::from_params(query.page.as_deref(), query.per_page.as_deref())?;

    let records = state
        .records
        .list(&auth.user_id, filter, query.include_deleted)?;

    Ok(Json(paginator.paginate(records)))
}

/// Get one of the caller's records.
pub async fn get_record(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(record_id): Path<String>,
) -> Result<Json<Record>, ApiError> {
    Ok(Json(state.records.get(&auth.user_id, &record_id)?))
}

/// Soft-delete one of the caller's records.
pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(record_id): Path<String>,
) -> Result<Json<Record>, ApiError> {
    Ok(Json(state.records.soft_delete(&auth.user_id, &record_id)?))
}
