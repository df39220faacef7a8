use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::inventory::{
        MovementType, ReceiveStockRequest, StockLevel, StockLevelDisplay, StockMovement,
    },
    services::catalog,
    services::ledger::NewMovement,
    AppState,
};

#[derive(Deserialize)]
pub struct StockFilters {
    pub warehouse_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
}

pub async fn stock_list(
    State(state): State<AppState>,
    Query(filters): Query<StockFilters>,
) -> Result<Json<Vec<StockLevelDisplay>>, ApiError> {
    let levels = sqlx::query_as::<_, StockLevelDisplay>(
        "SELECT s.warehouse_id, w.name AS warehouse_name, \
                s.product_id, p.name AS product_name, p.sku, \
                s.quantity_on_hand, s.updated_at \
         FROM stock_levels s \
         JOIN warehouses w ON w.id = s.warehouse_id \
         JOIN products p ON p.id = s.product_id \
         WHERE ($1::uuid IS NULL OR s.warehouse_id = $1) \
           AND ($2::uuid IS NULL OR s.product_id = $2) \
         ORDER BY w.name, p.name",
    )
    .bind(filters.warehouse_id)
    .bind(filters.product_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(levels))
}

pub async fn movements_list(
    State(state): State<AppState>,
    Query(filters): Query<StockFilters>,
) -> Result<Json<Vec<StockMovement>>, ApiError> {
    let movements = sqlx::query_as::<_, StockMovement>(
        "SELECT * FROM stock_movements \
         WHERE ($1::uuid IS NULL OR from_warehouse_id = $1 OR to_warehouse_id = $1) \
           AND ($2::uuid IS NULL OR product_id = $2) \
         ORDER BY moved_at DESC",
    )
    .bind(filters.warehouse_id)
    .bind(filters.product_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(movements))
}

/// Book received goods into a warehouse, typically against a purchase order.
/// The ledger adjustment and the movement record commit together.
pub async fn receive_stock(
    State(state): State<AppState>,
    Json(form): Json<ReceiveStockRequest>,
) -> Result<Json<StockLevel>, ApiError> {
    if form.quantity <= 0 {
        return Err(ApiError::Validation(
            "received quantity must be positive".to_string(),
        ));
    }

    let mut tx = state.db.begin().await?;

    catalog::active_warehouse(&mut tx, form.warehouse_id).await?;
    catalog::active_product(&mut tx, form.product_id).await?;
    if let Some(user_id) = form.received_by {
        catalog::active_user(&mut tx, user_id).await?;
    }

    state
        .ledger
        .adjust(&mut tx, form.warehouse_id, form.product_id, form.quantity)
        .await?;
    state
        .ledger
        .record_movement(
            &mut tx,
            NewMovement {
                product_id: form.product_id,
                from_warehouse_id: None,
                to_warehouse_id: Some(form.warehouse_id),
                quantity: form.quantity,
                movement_type: MovementType::Receipt,
                reference_id: form.reference.clone(),
                moved_by: form.received_by,
            },
        )
        .await?;

    let level = sqlx::query_as::<_, StockLevel>(
        "SELECT * FROM stock_levels WHERE warehouse_id = $1 AND product_id = $2",
    )
    .bind(form.warehouse_id)
    .bind(form.product_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    log::info!(
        "received {} of product {} at warehouse {} (ref {:?})",
        form.quantity,
        form.product_id,
        form.warehouse_id,
        form.reference
    );
    Ok(Json(level))
}
