use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{CreateProduct, Product, UpdateProduct},
    AppState,
};

fn validate_thresholds(reorder_point: Option<i32>, min_stock_level: Option<i32>) -> Result<(), ApiError> {
    if reorder_point.is_some_and(|v| v < 0) {
        return Err(ApiError::Validation(
            "reorder_point must not be negative".to_string(),
        ));
    }
    if min_stock_level.is_some_and(|v| v < 0) {
        return Err(ApiError::Validation(
            "min_stock_level must not be negative".to_string(),
        ));
    }
    Ok(())
}

pub async fn products_list(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(products))
}

pub async fn product_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product {} not found", id)))?;
    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(form): Json<CreateProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    if form.name.trim().is_empty() {
        return Err(ApiError::Validation("product name is required".to_string()));
    }
    if form.sku.trim().is_empty() {
        return Err(ApiError::Validation("sku is required".to_string()));
    }
    validate_thresholds(form.reorder_point, form.min_stock_level)?;

    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products \
         (name, sku, description, reorder_point, min_stock_level, purchase_price, selling_price, preferred_supplier_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(form.name.trim())
    .bind(form.sku.trim())
    .bind(&form.description)
    .bind(form.reorder_point)
    .bind(form.min_stock_level)
    .bind(form.purchase_price)
    .bind(form.selling_price)
    .bind(form.preferred_supplier_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Validation("a product with this sku already exists".to_string())
        }
        _ => ApiError::from(e),
    })?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<UpdateProduct>,
) -> Result<Json<Product>, ApiError> {
    if form.name.trim().is_empty() {
        return Err(ApiError::Validation("product name is required".to_string()));
    }
    validate_thresholds(form.reorder_point, form.min_stock_level)?;

    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET \
            name = $2, \
            description = $3, \
            reorder_point = $4, \
            min_stock_level = $5, \
            purchase_price = $6, \
            selling_price = $7, \
            preferred_supplier_id = $8, \
            is_active = COALESCE($9, is_active), \
            updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(form.name.trim())
    .bind(&form.description)
    .bind(form.reorder_point)
    .bind(form.min_stock_level)
    .bind(form.purchase_price)
    .bind(form.selling_price)
    .bind(form.preferred_supplier_id)
    .bind(form.is_active)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("product {} not found", id)))?;

    Ok(Json(product))
}
