use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub is_main: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWarehouse {
    pub name: String,
    pub location: Option<String>,
    #[serde(default)]
    pub is_main: bool,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub reorder_point: Option<i32>,
    pub min_stock_level: Option<i32>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub preferred_supplier_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub reorder_point: Option<i32>,
    pub min_stock_level: Option<i32>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub preferred_supplier_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProduct {
    pub name: String,
    pub description: Option<String>,
    pub reorder_point: Option<i32>,
    pub min_stock_level: Option<i32>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub preferred_supplier_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSupplier {
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSupplier {
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct StockLevel {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub quantity_on_hand: i32,
    pub updated_at: DateTime<Utc>,
}

/// Stock level joined with warehouse/product names for listing endpoints.
#[derive(Debug, Serialize, FromRow)]
pub struct StockLevelDisplay {
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub quantity_on_hand: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "movement_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Receipt,
    TransferOut,
    TransferIn,
}

#[derive(Debug, Serialize, FromRow)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub from_warehouse_id: Option<Uuid>,
    pub to_warehouse_id: Option<Uuid>,
    pub quantity: i32,
    pub movement_type: MovementType,
    pub reference_id: Option<String>,
    pub moved_by: Option<Uuid>,
    pub moved_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveStockRequest {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// External reference, typically a purchase order number.
    pub reference: Option<String>,
    pub received_by: Option<Uuid>,
}
