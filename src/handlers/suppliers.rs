use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{CreateSupplier, Supplier, UpdateSupplier},
    AppState,
};

pub async fn suppliers_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<Supplier>>, ApiError> {
    let suppliers = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(suppliers))
}

pub async fn supplier_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Supplier>, ApiError> {
    let supplier = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("supplier {} not found", id)))?;
    Ok(Json(supplier))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Json(form): Json<CreateSupplier>,
) -> Result<(StatusCode, Json<Supplier>), ApiError> {
    if form.name.trim().is_empty() {
        return Err(ApiError::Validation("supplier name is required".to_string()));
    }

    let supplier = sqlx::query_as::<_, Supplier>(
        "INSERT INTO suppliers (name, contact_name, email, phone, address) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(form.name.trim())
    .bind(&form.contact_name)
    .bind(&form.email)
    .bind(&form.phone)
    .bind(&form.address)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<UpdateSupplier>,
) -> Result<Json<Supplier>, ApiError> {
    if form.name.trim().is_empty() {
        return Err(ApiError::Validation("supplier name is required".to_string()));
    }

    let supplier = sqlx::query_as::<_, Supplier>(
        "UPDATE suppliers SET \
            name = $2, \
            contact_name = $3, \
            email = $4, \
            phone = $5, \
            address = $6, \
            is_active = COALESCE($7, is_active), \
            updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(form.name.trim())
    .bind(&form.contact_name)
    .bind(&form.email)
    .bind(&form.phone)
    .bind(&form.address)
    .bind(form.is_active)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("supplier {} not found", id)))?;

    Ok(Json(supplier))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted: Option<Uuid> =
        sqlx::query_scalar("DELETE FROM suppliers WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;
    if deleted.is_none() {
        return Err(ApiError::NotFound(format!("supplier {} not found", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
