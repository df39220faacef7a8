//! Read-only lookups against the identity and catalog tables. The transfer
//! workflow consumes these as existence/activity checks; it never creates or
//! mutates the underlying rows.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::inventory::{Product, Warehouse};
use crate::models::user::User;

pub async fn active_warehouse(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Warehouse, ApiError> {
    sqlx::query_as::<_, Warehouse>("SELECT * FROM warehouses WHERE id = $1 AND is_active = TRUE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("warehouse {} not found or inactive", id)))
}

pub async fn active_product(conn: &mut PgConnection, id: Uuid) -> Result<Product, ApiError> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND is_active = TRUE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product {} not found or inactive", id)))
}

pub async fn active_user(conn: &mut PgConnection, id: Uuid) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active = TRUE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {} not found or inactive", id)))
}

/// The designated replenishment source. There is at most one by convention;
/// if several are flagged the oldest wins.
pub async fn main_warehouse(conn: &mut PgConnection) -> Result<Option<Warehouse>, ApiError> {
    let warehouse = sqlx::query_as::<_, Warehouse>(
        "SELECT * FROM warehouses WHERE is_main = TRUE AND is_active = TRUE \
         ORDER BY created_at LIMIT 1",
    )
    .fetch_optional(&mut *conn)
    .await?;
    Ok(warehouse)
}
