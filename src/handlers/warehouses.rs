use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{CreateWarehouse, Warehouse},
    services::catalog,
    AppState,
};

#[derive(Deserialize)]
pub struct AssignStaffRequest {
    pub user_id: Uuid,
}

#[derive(Serialize, FromRow)]
pub struct StaffAssignment {
    pub user_id: Uuid,
    pub warehouse_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Serialize, FromRow)]
pub struct StaffMember {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub assigned_at: DateTime<Utc>,
}

pub async fn warehouses_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<Warehouse>>, ApiError> {
    let warehouses = sqlx::query_as::<_, Warehouse>("SELECT * FROM warehouses ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(warehouses))
}

pub async fn warehouse_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Warehouse>, ApiError> {
    let warehouse = sqlx::query_as::<_, Warehouse>("SELECT * FROM warehouses WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("warehouse {} not found", id)))?;
    Ok(Json(warehouse))
}

pub async fn create_warehouse(
    State(state): State<AppState>,
    Json(form): Json<CreateWarehouse>,
) -> Result<(StatusCode, Json<Warehouse>), ApiError> {
    if form.name.trim().is_empty() {
        return Err(ApiError::Validation("warehouse name is required".to_string()));
    }

    let mut conn = state.db.acquire().await?;
    if let Some(user_id) = form.created_by {
        catalog::active_user(&mut conn, user_id).await?;
    }

    let warehouse = sqlx::query_as::<_, Warehouse>(
        "INSERT INTO warehouses (name, location, is_main, created_by) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(form.name.trim())
    .bind(&form.location)
    .bind(form.is_main)
    .bind(form.created_by)
    .fetch_one(&mut *conn)
    .await?;

    Ok((StatusCode::CREATED, Json(warehouse)))
}

/// Assign a user to work at a warehouse. Assigning the same pair twice is a
/// no-op, not an error.
pub async fn assign_staff(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
    Json(form): Json<AssignStaffRequest>,
) -> Result<(StatusCode, Json<StaffAssignment>), ApiError> {
    let mut tx = state.db.begin().await?;

    catalog::active_warehouse(&mut tx, warehouse_id).await?;
    catalog::active_user(&mut tx, form.user_id).await?;

    sqlx::query(
        "INSERT INTO warehouse_staff (user_id, warehouse_id) VALUES ($1, $2) \
         ON CONFLICT (user_id, warehouse_id) DO NOTHING",
    )
    .bind(form.user_id)
    .bind(warehouse_id)
    .execute(&mut *tx)
    .await?;

    let assignment = sqlx::query_as::<_, StaffAssignment>(
        "SELECT user_id, warehouse_id, assigned_at FROM warehouse_staff \
         WHERE user_id = $1 AND warehouse_id = $2",
    )
    .bind(form.user_id)
    .bind(warehouse_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn staff_list(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
) -> Result<Json<Vec<StaffMember>>, ApiError> {
    let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM warehouses WHERE id = $1")
        .bind(warehouse_id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(ApiError::NotFound(format!(
            "warehouse {} not found",
            warehouse_id
        )));
    }

    let staff = sqlx::query_as::<_, StaffMember>(
        "SELECT u.id AS user_id, u.email, u.first_name, u.last_name, ws.assigned_at \
         FROM warehouse_staff ws \
         JOIN users u ON u.id = ws.user_id \
         WHERE ws.warehouse_id = $1 \
         ORDER BY u.last_name, u.first_name",
    )
    .bind(warehouse_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(staff))
}
