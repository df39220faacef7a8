use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use crate::error::ApiError;

/// Transfer lifecycle states.
///
/// Legal transitions:
/// `pending -> approved -> in_transit -> completed`, with `cancelled`
/// reachable from `pending` or `approved` only. `completed` and `cancelled`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transfer_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Approved,
    InTransit,
    Completed,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Approved => "approved",
            TransferStatus::InTransit => "in_transit",
            TransferStatus::Completed => "completed",
            TransferStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Cancelled)
    }

    /// The transition table. Anything not listed here is illegal.
    pub fn can_transition(&self, next: TransferStatus) -> bool {
        use TransferStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Approved, InTransit)
                | (InTransit, Completed)
                | (Pending, Cancelled)
                | (Approved, Cancelled)
        )
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the transfer came to exist. Auto transfers are created by the reorder
/// monitor and start out already approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Manual,
    Auto,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Transfer {
    pub id: Uuid,
    pub source_warehouse_id: Uuid,
    pub dest_warehouse_id: Uuid,
    pub requested_by: Uuid,
    pub status: TransferStatus,
    pub request_type: TransferKind,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct TransferItemDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub quantity_requested: i32,
    pub quantity_received: i32,
}

#[derive(Debug, Serialize)]
pub struct TransferDetail {
    #[serde(flatten)]
    pub transfer: Transfer,
    pub items: Vec<TransferItemDetail>,
}

#[derive(Debug, Deserialize)]
pub struct TransferItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub source_warehouse_id: Uuid,
    pub dest_warehouse_id: Uuid,
    pub requested_by: Uuid,
    pub items: Vec<TransferItemRequest>,
}

impl CreateTransferRequest {
    /// Field-level validation, applied before any lookups run.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.source_warehouse_id == self.dest_warehouse_id {
            return Err(ApiError::Validation(
                "source and destination warehouse must differ".to_string(),
            ));
        }
        if self.items.is_empty() {
            return Err(ApiError::Validation(
                "transfer must contain at least one item".to_string(),
            ));
        }
        for item in &self.items {
            if item.quantity <= 0 {
                return Err(ApiError::Validation(format!(
                    "quantity for product {} must be positive",
                    item.product_id
                )));
            }
        }
        Ok(())
    }
}

/// Per-item received-quantity override supplied at receipt time.
#[derive(Debug, Deserialize)]
pub struct ReceivedOverride {
    pub item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReceiveTransferRequest {
    pub items: Option<Vec<ReceivedOverride>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions() {
        use TransferStatus::*;
        assert!(Pending.can_transition(Approved));
        assert!(Approved.can_transition(InTransit));
        assert!(InTransit.can_transition(Completed));
        assert!(Pending.can_transition(Cancelled));
        assert!(Approved.can_transition(Cancelled));
    }

    #[test]
    fn illegal_transitions() {
        use TransferStatus::*;
        // No skipping forward
        assert!(!Pending.can_transition(InTransit));
        assert!(!Pending.can_transition(Completed));
        assert!(!Approved.can_transition(Completed));
        // No moving backwards
        assert!(!Approved.can_transition(Pending));
        assert!(!InTransit.can_transition(Approved));
        // In-transit stock is already moving; it cannot be cancelled
        assert!(!InTransit.can_transition(Cancelled));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        use TransferStatus::*;
        for next in [Pending, Approved, InTransit, Completed, Cancelled] {
            assert!(!Completed.can_transition(next));
            assert!(!Cancelled.can_transition(next));
        }
        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!Approved.is_terminal());
        assert!(!InTransit.is_terminal());
    }

    #[test]
    fn self_transitions_are_illegal() {
        use TransferStatus::*;
        for status in [Pending, Approved, InTransit, Completed, Cancelled] {
            assert!(!status.can_transition(status));
        }
    }

    fn request(source: Uuid, dest: Uuid, items: Vec<TransferItemRequest>) -> CreateTransferRequest {
        CreateTransferRequest {
            source_warehouse_id: source,
            dest_warehouse_id: dest,
            requested_by: Uuid::new_v4(),
            items,
        }
    }

    #[test]
    fn rejects_same_source_and_destination() {
        let w = Uuid::new_v4();
        let req = request(
            w,
            w,
            vec![TransferItemRequest {
                product_id: Uuid::new_v4(),
                quantity: 1,
            }],
        );
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn rejects_empty_item_list() {
        let req = request(Uuid::new_v4(), Uuid::new_v4(), vec![]);
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn rejects_non_positive_quantities() {
        for qty in [0, -5] {
            let req = request(
                Uuid::new_v4(),
                Uuid::new_v4(),
                vec![TransferItemRequest {
                    product_id: Uuid::new_v4(),
                    quantity: qty,
                }],
            );
            assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
        }
    }

    #[test]
    fn accepts_well_formed_request() {
        let req = request(
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![
                TransferItemRequest {
                    product_id: Uuid::new_v4(),
                    quantity: 10,
                },
                TransferItemRequest {
                    product_id: Uuid::new_v4(),
                    quantity: 1,
                },
            ],
        );
        assert!(req.validate().is_ok());
    }

    #[test]
    fn status_round_trips_through_serde() {
        let json = serde_json::to_string(&TransferStatus::InTransit).unwrap();
        assert_eq!(json, "\"in_transit\"");
        let back: TransferStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TransferStatus::InTransit);
    }
}
