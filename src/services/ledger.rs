use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::inventory::MovementType;

/// Authoritative accessor for per-(warehouse, product) stock quantities.
///
/// All mutations go through [`StockLedger::adjust`] inside the caller's
/// transaction; the row is locked with `SELECT ... FOR UPDATE` so concurrent
/// adjustments to the same pair serialize and the non-negativity invariant
/// holds under parallel requests.
#[derive(Debug, Clone, Copy)]
pub struct StockLedger;

/// What a valid adjustment will write.
#[derive(Debug, PartialEq, Eq)]
enum LedgerWrite {
    Insert(i32),
    Update(i32),
}

#[derive(Debug, PartialEq, Eq)]
enum LedgerViolation {
    /// Reducing stock that was never recorded.
    Untracked,
    /// The delta would drive the quantity negative.
    Insufficient { available: i32 },
}

fn next_quantity(current: Option<i32>, delta: i32) -> Result<LedgerWrite, LedgerViolation> {
    match current {
        None if delta <= 0 => Err(LedgerViolation::Untracked),
        None => Ok(LedgerWrite::Insert(delta)),
        Some(available) if available + delta < 0 => {
            Err(LedgerViolation::Insufficient { available })
        }
        Some(available) => Ok(LedgerWrite::Update(available + delta)),
    }
}

/// A stock movement to record in the audit trail.
#[derive(Debug)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub from_warehouse_id: Option<Uuid>,
    pub to_warehouse_id: Option<Uuid>,
    pub quantity: i32,
    pub movement_type: MovementType,
    pub reference_id: Option<String>,
    pub moved_by: Option<Uuid>,
}

impl StockLedger {
    /// Current quantity on hand for a pair; a missing row reads as 0.
    pub async fn quantity(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        warehouse_id: Uuid,
        product_id: Uuid,
    ) -> Result<i32, ApiError> {
        let current: Option<i32> = sqlx::query_scalar(
            "SELECT quantity_on_hand FROM stock_levels WHERE warehouse_id = $1 AND product_id = $2",
        )
        .bind(warehouse_id)
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(current.unwrap_or(0))
    }

    /// Apply `delta` to the pair's quantity within the caller's transaction.
    ///
    /// Returns the new quantity. Fails without writing if the delta would
    /// drive the quantity negative, or if it is non-positive against a pair
    /// that has no recorded stock.
    pub async fn adjust(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        warehouse_id: Uuid,
        product_id: Uuid,
        delta: i32,
    ) -> Result<i32, ApiError> {
        let current: Option<i32> = sqlx::query_scalar(
            "SELECT quantity_on_hand FROM stock_levels \
             WHERE warehouse_id = $1 AND product_id = $2 FOR UPDATE",
        )
        .bind(warehouse_id)
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?;

        let write = next_quantity(current, delta).map_err(|violation| match violation {
            LedgerViolation::Untracked => ApiError::InvalidAdjustment(format!(
                "no stock recorded for product {} at warehouse {}",
                product_id, warehouse_id
            )),
            LedgerViolation::Insufficient { available } => ApiError::InsufficientStock {
                product_id,
                requested: -delta,
                available,
            },
        })?;

        let new_quantity = match write {
            LedgerWrite::Insert(quantity) => {
                sqlx::query(
                    "INSERT INTO stock_levels (warehouse_id, product_id, quantity_on_hand) \
                     VALUES ($1, $2, $3)",
                )
                .bind(warehouse_id)
                .bind(product_id)
                .bind(quantity)
                .execute(&mut **tx)
                .await?;
                quantity
            }
            LedgerWrite::Update(quantity) => {
                sqlx::query(
                    "UPDATE stock_levels SET quantity_on_hand = $3, updated_at = NOW() \
                     WHERE warehouse_id = $1 AND product_id = $2",
                )
                .bind(warehouse_id)
                .bind(product_id)
                .bind(quantity)
                .execute(&mut **tx)
                .await?;
                quantity
            }
        };

        Ok(new_quantity)
    }

    /// Append a row to the stock movement audit trail.
    pub async fn record_movement(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        movement: NewMovement,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO stock_movements \
             (id, product_id, from_warehouse_id, to_warehouse_id, quantity, movement_type, reference_id, moved_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::new_v4())
        .bind(movement.product_id)
        .bind(movement.from_warehouse_id)
        .bind(movement.to_warehouse_id)
        .bind(movement.quantity)
        .bind(movement.movement_type)
        .bind(movement.reference_id)
        .bind(movement.moved_by)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_delta_creates_missing_row() {
        assert_eq!(next_quantity(None, 7), Ok(LedgerWrite::Insert(7)));
    }

    #[test]
    fn non_positive_delta_on_missing_row_is_rejected() {
        assert_eq!(next_quantity(None, 0), Err(LedgerViolation::Untracked));
        assert_eq!(next_quantity(None, -3), Err(LedgerViolation::Untracked));
    }

    #[test]
    fn delta_applies_to_existing_row() {
        assert_eq!(next_quantity(Some(15), -10), Ok(LedgerWrite::Update(5)));
        assert_eq!(next_quantity(Some(5), 10), Ok(LedgerWrite::Update(15)));
        assert_eq!(next_quantity(Some(3), 0), Ok(LedgerWrite::Update(3)));
    }

    #[test]
    fn quantity_never_goes_negative() {
        assert_eq!(
            next_quantity(Some(3), -10),
            Err(LedgerViolation::Insufficient { available: 3 })
        );
        // Draining to exactly zero is fine
        assert_eq!(next_quantity(Some(10), -10), Ok(LedgerWrite::Update(0)));
    }

    #[test]
    fn failed_adjustment_reports_available_quantity() {
        match next_quantity(Some(2), -9) {
            Err(LedgerViolation::Insufficient { available }) => assert_eq!(available, 2),
            other => panic!("expected insufficiency, got {:?}", other),
        }
    }
}
