use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        CreateTransferRequest, ReceiveTransferRequest, Transfer, TransferDetail, TransferKind,
        TransferStatus,
    },
    services::reorder::ReorderReport,
    AppState,
};

#[derive(Deserialize)]
pub struct TransferFilters {
    pub status: Option<TransferStatus>,
    pub warehouse_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ReorderCheckRequest {
    pub warehouse_id: Option<Uuid>,
    pub requested_by: Uuid,
}

pub async fn create_transfer(
    State(state): State<AppState>,
    Json(form): Json<CreateTransferRequest>,
) -> Result<(StatusCode, Json<TransferDetail>), ApiError> {
    let detail = state.transfers.create(form, TransferKind::Manual).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn transfers_list(
    State(state): State<AppState>,
    Query(filters): Query<TransferFilters>,
) -> Result<Json<Vec<Transfer>>, ApiError> {
    let transfers = state
        .transfers
        .list(filters.status, filters.warehouse_id)
        .await?;
    Ok(Json(transfers))
}

pub async fn transfer_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransferDetail>, ApiError> {
    Ok(Json(state.transfers.get(id).await?))
}

pub async fn approve_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transfer>, ApiError> {
    Ok(Json(state.transfers.approve(id).await?))
}

pub async fn dispatch_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transfer>, ApiError> {
    Ok(Json(state.transfers.dispatch(id).await?))
}

pub async fn receive_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<ReceiveTransferRequest>,
) -> Result<Json<TransferDetail>, ApiError> {
    Ok(Json(state.transfers.receive(id, form).await?))
}

pub async fn cancel_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transfer>, ApiError> {
    Ok(Json(state.transfers.cancel(id).await?))
}

pub async fn reorder_check(
    State(state): State<AppState>,
    Json(form): Json<ReorderCheckRequest>,
) -> Result<Json<ReorderReport>, ApiError> {
    let report = state
        .reorder
        .check_reorder_points(form.warehouse_id, form.requested_by)
        .await?;
    Ok(Json(report))
}
