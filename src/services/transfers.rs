use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::Database;
use crate::error::ApiError;
use crate::models::inventory::MovementType;
use crate::models::transfer::{
    CreateTransferRequest, ReceiveTransferRequest, Transfer, TransferDetail, TransferItemDetail,
    TransferKind, TransferStatus,
};
use crate::services::catalog;
use crate::services::ledger::{NewMovement, StockLedger};

/// The transfer workflow: request creation with pre-flight stock checks, and
/// the approve/dispatch/receive/cancel lifecycle with its stock effects.
///
/// Every operation runs as a single transaction; a failure at any point rolls
/// back all writes made so far, so readers never observe a partially-applied
/// transfer.
#[derive(Clone)]
pub struct TransferService {
    db: Database,
    ledger: StockLedger,
}

impl TransferService {
    pub fn new(db: Database, ledger: StockLedger) -> Self {
        Self { db, ledger }
    }

    /// Validate and create a transfer with its line items.
    ///
    /// Stock at the source is checked per item but not yet moved; the
    /// decrement happens at dispatch. Auto transfers (reorder-driven) are
    /// created already approved.
    pub async fn create(
        &self,
        req: CreateTransferRequest,
        kind: TransferKind,
    ) -> Result<TransferDetail, ApiError> {
        req.validate()?;

        let mut tx = self.db.begin().await?;

        let source = catalog::active_warehouse(&mut tx, req.source_warehouse_id).await?;
        catalog::active_warehouse(&mut tx, req.dest_warehouse_id).await?;
        catalog::active_user(&mut tx, req.requested_by).await?;

        for item in &req.items {
            let product = catalog::active_product(&mut tx, item.product_id).await?;
            let available = self.ledger.quantity(&mut tx, source.id, product.id).await?;
            if available < item.quantity {
                return Err(ApiError::InsufficientStock {
                    product_id: product.id,
                    requested: item.quantity,
                    available,
                });
            }
        }

        let (status, approved_at) = match kind {
            TransferKind::Manual => (TransferStatus::Pending, None),
            TransferKind::Auto => (TransferStatus::Approved, Some(Utc::now())),
        };

        let transfer_id = Uuid::new_v4();
        let transfer = sqlx::query_as::<_, Transfer>(
            "INSERT INTO transfers \
             (id, source_warehouse_id, dest_warehouse_id, requested_by, status, request_type, approved_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING *",
        )
        .bind(transfer_id)
        .bind(req.source_warehouse_id)
        .bind(req.dest_warehouse_id)
        .bind(req.requested_by)
        .bind(status)
        .bind(kind)
        .bind(approved_at)
        .fetch_one(&mut *tx)
        .await?;

        for item in &req.items {
            sqlx::query(
                "INSERT INTO transfer_items (id, transfer_id, product_id, quantity_requested) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(transfer_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        let items = Self::load_items(&mut tx, transfer_id).await?;
        tx.commit().await?;

        log::info!(
            "created {} transfer {} ({} -> {}, {} items)",
            kind_label(kind),
            transfer_id,
            req.source_warehouse_id,
            req.dest_warehouse_id,
            items.len()
        );
        Ok(TransferDetail { transfer, items })
    }

    pub async fn approve(&self, id: Uuid) -> Result<Transfer, ApiError> {
        let mut tx = self.db.begin().await?;
        let transfer = Self::lock_transfer(&mut tx, id).await?;
        Self::ensure_transition(&transfer, TransferStatus::Approved, "approve")?;

        let updated = sqlx::query_as::<_, Transfer>(
            "UPDATE transfers SET status = $2, approved_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(TransferStatus::Approved)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        log::info!("approved transfer {}", id);
        Ok(updated)
    }

    /// Move an approved transfer in transit, decrementing source stock for
    /// every line item. Any failed decrement rolls the whole dispatch back.
    pub async fn dispatch(&self, id: Uuid) -> Result<Transfer, ApiError> {
        let mut tx = self.db.begin().await?;
        let transfer = Self::lock_transfer(&mut tx, id).await?;
        Self::ensure_transition(&transfer, TransferStatus::InTransit, "dispatch")?;

        let items = Self::load_items(&mut tx, id).await?;
        for item in &items {
            self.ledger
                .adjust(
                    &mut tx,
                    transfer.source_warehouse_id,
                    item.product_id,
                    -item.quantity_requested,
                )
                .await?;
            self.ledger
                .record_movement(
                    &mut tx,
                    NewMovement {
                        product_id: item.product_id,
                        from_warehouse_id: Some(transfer.source_warehouse_id),
                        to_warehouse_id: Some(transfer.dest_warehouse_id),
                        quantity: item.quantity_requested,
                        movement_type: MovementType::TransferOut,
                        reference_id: Some(transfer.id.to_string()),
                        moved_by: Some(transfer.requested_by),
                    },
                )
                .await?;
        }

        let updated = sqlx::query_as::<_, Transfer>(
            "UPDATE transfers SET status = $2, dispatched_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(TransferStatus::InTransit)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        log::info!("dispatched transfer {} ({} items)", id, items.len());
        Ok(updated)
    }

    /// Complete an in-transit transfer, incrementing destination stock.
    ///
    /// Callers may override the received quantity per line item (keyed by
    /// item id); an override must lie within `0..=quantity_requested`.
    /// Without an override the full requested quantity is received. A zero
    /// received quantity performs no destination adjustment.
    pub async fn receive(
        &self,
        id: Uuid,
        req: ReceiveTransferRequest,
    ) -> Result<TransferDetail, ApiError> {
        let mut tx = self.db.begin().await?;
        let transfer = Self::lock_transfer(&mut tx, id).await?;
        Self::ensure_transition(&transfer, TransferStatus::Completed, "receive")?;

        let items = Self::load_items(&mut tx, id).await?;

        let mut overrides: HashMap<Uuid, i32> = HashMap::new();
        for over in req.items.unwrap_or_default() {
            overrides.insert(over.item_id, over.quantity);
        }
        for item_id in overrides.keys() {
            if !items.iter().any(|item| item.id == *item_id) {
                return Err(ApiError::Validation(format!(
                    "line item {} does not belong to transfer {}",
                    item_id, id
                )));
            }
        }

        for item in &items {
            let received = overrides
                .get(&item.id)
                .copied()
                .unwrap_or(item.quantity_requested);
            if received < 0 || received > item.quantity_requested {
                return Err(ApiError::Validation(format!(
                    "received quantity {} for item {} must be between 0 and {}",
                    received, item.id, item.quantity_requested
                )));
            }

            if received > 0 {
                self.ledger
                    .adjust(&mut tx, transfer.dest_warehouse_id, item.product_id, received)
                    .await?;
                self.ledger
                    .record_movement(
                        &mut tx,
                        NewMovement {
                            product_id: item.product_id,
                            from_warehouse_id: Some(transfer.source_warehouse_id),
                            to_warehouse_id: Some(transfer.dest_warehouse_id),
                            quantity: received,
                            movement_type: MovementType::TransferIn,
                            reference_id: Some(transfer.id.to_string()),
                            moved_by: Some(transfer.requested_by),
                        },
                    )
                    .await?;
            }

            sqlx::query("UPDATE transfer_items SET quantity_received = $1 WHERE id = $2")
                .bind(received)
                .bind(item.id)
                .execute(&mut *tx)
                .await?;
        }

        let updated = sqlx::query_as::<_, Transfer>(
            "UPDATE transfers SET status = $2, received_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(TransferStatus::Completed)
        .fetch_one(&mut *tx)
        .await?;
        let items = Self::load_items(&mut tx, id).await?;
        tx.commit().await?;

        log::info!("received transfer {} ({} items)", id, items.len());
        Ok(TransferDetail {
            transfer: updated,
            items,
        })
    }

    /// Cancel a transfer that has not yet shipped. No stock was moved for a
    /// pending or approved transfer, so there is nothing to put back.
    pub async fn cancel(&self, id: Uuid) -> Result<Transfer, ApiError> {
        let mut tx = self.db.begin().await?;
        let transfer = Self::lock_transfer(&mut tx, id).await?;
        Self::ensure_transition(&transfer, TransferStatus::Cancelled, "cancel")?;

        let updated = sqlx::query_as::<_, Transfer>(
            "UPDATE transfers SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(TransferStatus::Cancelled)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        log::info!("cancelled transfer {}", id);
        Ok(updated)
    }

    pub async fn get(&self, id: Uuid) -> Result<TransferDetail, ApiError> {
        let transfer = sqlx::query_as::<_, Transfer>("SELECT * FROM transfers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("transfer {} not found", id)))?;

        let items = sqlx::query_as::<_, TransferItemDetail>(ITEMS_QUERY)
            .bind(id)
            .fetch_all(&self.db)
            .await?;

        Ok(TransferDetail { transfer, items })
    }

    pub async fn list(
        &self,
        status: Option<TransferStatus>,
        warehouse_id: Option<Uuid>,
    ) -> Result<Vec<Transfer>, ApiError> {
        let transfers = sqlx::query_as::<_, Transfer>(
            "SELECT * FROM transfers \
             WHERE ($1::transfer_status IS NULL OR status = $1) \
               AND ($2::uuid IS NULL OR source_warehouse_id = $2 OR dest_warehouse_id = $2) \
             ORDER BY created_at DESC",
        )
        .bind(status)
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;
        Ok(transfers)
    }

    async fn lock_transfer(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Transfer, ApiError> {
        sqlx::query_as::<_, Transfer>("SELECT * FROM transfers WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("transfer {} not found", id)))
    }

    fn ensure_transition(
        transfer: &Transfer,
        next: TransferStatus,
        action: &str,
    ) -> Result<(), ApiError> {
        if !transfer.status.can_transition(next) {
            let message = if transfer.status.is_terminal() {
                format!(
                    "cannot {} transfer {}: already {}",
                    action, transfer.id, transfer.status
                )
            } else {
                format!(
                    "cannot {} transfer {} in status {}",
                    action, transfer.id, transfer.status
                )
            };
            return Err(ApiError::InvalidState(message));
        }
        Ok(())
    }

    async fn load_items(
        tx: &mut Transaction<'_, Postgres>,
        transfer_id: Uuid,
    ) -> Result<Vec<TransferItemDetail>, ApiError> {
        let items = sqlx::query_as::<_, TransferItemDetail>(ITEMS_QUERY)
            .bind(transfer_id)
            .fetch_all(&mut **tx)
            .await?;
        Ok(items)
    }
}

const ITEMS_QUERY: &str = "SELECT ti.id, ti.product_id, p.name AS product_name, p.sku, \
            ti.quantity_requested, ti.quantity_received \
     FROM transfer_items ti \
     JOIN products p ON p.id = ti.product_id \
     WHERE ti.transfer_id = $1 \
     ORDER BY p.name";

fn kind_label(kind: TransferKind) -> &'static str {
    match kind {
        TransferKind::Manual => "manual",
        TransferKind::Auto => "auto",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_in(status: TransferStatus) -> Transfer {
        Transfer {
            id: Uuid::new_v4(),
            source_warehouse_id: Uuid::new_v4(),
            dest_warehouse_id: Uuid::new_v4(),
            requested_by: Uuid::new_v4(),
            status,
            request_type: TransferKind::Manual,
            created_at: Utc::now(),
            approved_at: None,
            dispatched_at: None,
            received_at: None,
        }
    }

    #[test]
    fn transition_guard_accepts_legal_moves() {
        let transfer = transfer_in(TransferStatus::Pending);
        assert!(
            TransferService::ensure_transition(&transfer, TransferStatus::Approved, "approve")
                .is_ok()
        );
        let transfer = transfer_in(TransferStatus::InTransit);
        assert!(
            TransferService::ensure_transition(&transfer, TransferStatus::Completed, "receive")
                .is_ok()
        );
    }

    #[test]
    fn transition_guard_rejects_skipped_states() {
        let transfer = transfer_in(TransferStatus::Pending);
        let err =
            TransferService::ensure_transition(&transfer, TransferStatus::Completed, "receive")
                .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));
    }

    #[test]
    fn terminal_transfers_report_already_finalized() {
        let transfer = transfer_in(TransferStatus::Cancelled);
        let err =
            TransferService::ensure_transition(&transfer, TransferStatus::Cancelled, "cancel")
                .unwrap_err();
        assert!(err.to_string().contains("already cancelled"));

        let transfer = transfer_in(TransferStatus::Completed);
        let err =
            TransferService::ensure_transition(&transfer, TransferStatus::Cancelled, "cancel")
                .unwrap_err();
        assert!(err.to_string().contains("already completed"));
    }
}
