mod database;
mod error;
mod handlers;
mod models;
mod services;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use dotenvy::dotenv;
use std::env;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use database::{create_database_pool, Database};
use services::{ReorderMonitor, StockLedger, TransferService};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub ledger: StockLedger,
    pub transfers: TransferService,
    pub reorder: ReorderMonitor,
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    // Initialize database
    let database_url = env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set");

    let db = create_database_pool(&database_url).await
        .expect("Failed to connect to database");

    // Build the application router
    let app = create_router(db);

    // Get port from environment or use default
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    log::info!("stockflow server starting on http://{}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn create_router(db: Database) -> Router {
    let ledger = StockLedger;
    let transfers = TransferService::new(db.clone(), ledger);
    let reorder = ReorderMonitor::new(db.clone(), transfers.clone());
    let state = AppState {
        db,
        ledger,
        transfers,
        reorder,
    };

    Router::new()
        .route("/health", get(handlers::health))

        // Users
        .route("/api/users", get(handlers::users::users_list))
        .route("/api/users", post(handlers::users::create_user))

        // Warehouses and staff assignment
        .route("/api/warehouses", get(handlers::warehouses::warehouses_list))
        .route("/api/warehouses", post(handlers::warehouses::create_warehouse))
        .route("/api/warehouses/:id", get(handlers::warehouses::warehouse_detail))
        .route("/api/warehouses/:id/staff", get(handlers::warehouses::staff_list))
        .route("/api/warehouses/:id/staff", post(handlers::warehouses::assign_staff))

        // Products
        .route("/api/products", get(handlers::products::products_list))
        .route("/api/products", post(handlers::products::create_product))
        .route("/api/products/:id", get(handlers::products::product_detail))
        .route("/api/products/:id", put(handlers::products::update_product))

        // Suppliers
        .route("/api/suppliers", get(handlers::suppliers::suppliers_list))
        .route("/api/suppliers", post(handlers::suppliers::create_supplier))
        .route("/api/suppliers/:id", get(handlers::suppliers::supplier_detail))
        .route("/api/suppliers/:id", put(handlers::suppliers::update_supplier))
        .route("/api/suppliers/:id", delete(handlers::suppliers::delete_supplier))

        // Stock levels and receiving
        .route("/api/stock", get(handlers::stock::stock_list))
        .route("/api/stock/movements", get(handlers::stock::movements_list))
        .route("/api/stock/receipts", post(handlers::stock::receive_stock))

        // Transfer workflow
        .route("/api/transfers", get(handlers::transfers::transfers_list))
        .route("/api/transfers", post(handlers::transfers::create_transfer))
        .route("/api/transfers/reorder-check", post(handlers::transfers::reorder_check))
        .route("/api/transfers/:id", get(handlers::transfers::transfer_detail))
        .route("/api/transfers/:id/approve", post(handlers::transfers::approve_transfer))
        .route("/api/transfers/:id/dispatch", post(handlers::transfers::dispatch_transfer))
        .route("/api/transfers/:id/receive", post(handlers::transfers::receive_transfer))
        .route("/api/transfers/:id/cancel", post(handlers::transfers::cancel_transfer))

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
        )
        .with_state(state)
}
