use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::Database;
use crate::error::ApiError;
use crate::models::transfer::{
    CreateTransferRequest, TransferDetail, TransferItemRequest, TransferKind,
};
use crate::services::catalog;
use crate::services::transfers::TransferService;

/// Threshold used when a product configures neither a reorder point nor a
/// minimum stock level.
pub const DEFAULT_REORDER_POINT: i32 = 10;

/// Floor on replenishment quantity, so a barely-under-threshold product does
/// not generate a trivial transfer.
pub const MIN_REPLENISH_QTY: i32 = 10;

/// How much to move for a low-stock product.
pub fn replenishment_qty(threshold: i32, current: i32) -> i32 {
    (threshold - current).max(MIN_REPLENISH_QTY)
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LowStockItem {
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_on_hand: i32,
    pub threshold: i32,
}

#[derive(Debug, Serialize)]
pub struct LocationSummary {
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub low_stock_items: usize,
    pub transfer_id: Option<Uuid>,
    pub skipped_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReorderReport {
    pub low_stock_count: usize,
    pub transfers_created: usize,
    pub locations: Vec<LocationSummary>,
    pub low_stock: Vec<LowStockItem>,
    pub transfers: Vec<TransferDetail>,
}

/// Scans stock levels against reorder thresholds and synthesizes replenishment
/// transfers from the main warehouse. Invoked synchronously per request; it is
/// not a background scheduler.
#[derive(Clone)]
pub struct ReorderMonitor {
    db: Database,
    transfers: TransferService,
}

impl ReorderMonitor {
    pub fn new(db: Database, transfers: TransferService) -> Self {
        Self { db, transfers }
    }

    /// Find every (warehouse, product) pair at or under its reorder threshold
    /// and create one auto-approved transfer per affected warehouse.
    ///
    /// A failure at one location (no main warehouse, pre-flight stock check)
    /// skips that location and the scan continues.
    pub async fn check_reorder_points(
        &self,
        warehouse_id: Option<Uuid>,
        requested_by: Uuid,
    ) -> Result<ReorderReport, ApiError> {
        let mut conn = self.db.acquire().await?;
        catalog::active_user(&mut conn, requested_by).await?;
        if let Some(id) = warehouse_id {
            catalog::active_warehouse(&mut conn, id).await?;
        }

        let low_stock = sqlx::query_as::<_, LowStockItem>(
            "SELECT w.id AS warehouse_id, w.name AS warehouse_name, \
                    p.id AS product_id, p.name AS product_name, \
                    s.quantity_on_hand, \
                    COALESCE(p.reorder_point, p.min_stock_level, $1) AS threshold \
             FROM stock_levels s \
             JOIN warehouses w ON w.id = s.warehouse_id \
             JOIN products p ON p.id = s.product_id \
             WHERE w.is_active = TRUE \
               AND w.is_main = FALSE \
               AND p.is_active = TRUE \
               AND ($2::uuid IS NULL OR w.id = $2) \
               AND s.quantity_on_hand <= COALESCE(p.reorder_point, p.min_stock_level, $1) \
             ORDER BY w.id, p.name",
        )
        .bind(DEFAULT_REORDER_POINT)
        .bind(warehouse_id)
        .fetch_all(&mut *conn)
        .await?;

        let main = catalog::main_warehouse(&mut conn).await?;
        drop(conn);

        // Rows are ordered by warehouse, so grouping is a single pass.
        let mut groups: Vec<(Uuid, String, Vec<LowStockItem>)> = Vec::new();
        for row in &low_stock {
            match groups.last_mut() {
                Some((id, _, items)) if *id == row.warehouse_id => items.push(row.clone()),
                _ => groups.push((
                    row.warehouse_id,
                    row.warehouse_name.clone(),
                    vec![row.clone()],
                )),
            }
        }

        let mut locations = Vec::new();
        let mut transfers = Vec::new();
        for (warehouse_id, warehouse_name, items) in groups {
            let Some(main) = &main else {
                log::warn!(
                    "reorder: skipping warehouse {} - no main warehouse configured",
                    warehouse_id
                );
                locations.push(LocationSummary {
                    warehouse_id,
                    warehouse_name,
                    low_stock_items: items.len(),
                    transfer_id: None,
                    skipped_reason: Some("no main warehouse configured".to_string()),
                });
                continue;
            };

            let req = CreateTransferRequest {
                source_warehouse_id: main.id,
                dest_warehouse_id: warehouse_id,
                requested_by,
                items: items
                    .iter()
                    .map(|item| TransferItemRequest {
                        product_id: item.product_id,
                        quantity: replenishment_qty(item.threshold, item.quantity_on_hand),
                    })
                    .collect(),
            };

            match self.transfers.create(req, TransferKind::Auto).await {
                Ok(detail) => {
                    locations.push(LocationSummary {
                        warehouse_id,
                        warehouse_name,
                        low_stock_items: items.len(),
                        transfer_id: Some(detail.transfer.id),
                        skipped_reason: None,
                    });
                    transfers.push(detail);
                }
                // A database failure is not a per-location condition; stop the scan.
                Err(err @ ApiError::Database(_)) => return Err(err),
                Err(err) => {
                    log::warn!(
                        "reorder: skipping warehouse {}: {}",
                        warehouse_id,
                        err
                    );
                    locations.push(LocationSummary {
                        warehouse_id,
                        warehouse_name,
                        low_stock_items: items.len(),
                        transfer_id: None,
                        skipped_reason: Some(err.to_string()),
                    });
                }
            }
        }

        Ok(ReorderReport {
            low_stock_count: low_stock.len(),
            transfers_created: transfers.len(),
            locations,
            low_stock,
            transfers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replenishes_up_to_threshold() {
        // reorder point 20, 2 on hand -> move 18
        assert_eq!(replenishment_qty(20, 2), 18);
    }

    #[test]
    fn small_deficits_get_the_minimum_batch() {
        assert_eq!(replenishment_qty(10, 8), MIN_REPLENISH_QTY);
        assert_eq!(replenishment_qty(10, 10), MIN_REPLENISH_QTY);
    }

    #[test]
    fn large_deficits_exceed_the_minimum_batch() {
        assert_eq!(replenishment_qty(100, 5), 95);
    }

    #[test]
    fn quantity_is_always_positive() {
        // current above threshold cannot happen in the scan, but the floor
        // still yields a usable quantity
        assert!(replenishment_qty(5, 50) > 0);
    }
}
