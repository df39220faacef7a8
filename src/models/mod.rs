pub mod inventory;
pub mod transfer;
pub mod user;

// Re-export only the types the handlers use directly
pub use inventory::{
    CreateProduct, CreateSupplier, CreateWarehouse, Product, Supplier, UpdateProduct,
    UpdateSupplier, Warehouse,
};
pub use transfer::{
    CreateTransferRequest, ReceiveTransferRequest, Transfer, TransferDetail, TransferKind,
    TransferStatus,
};
pub use user::{CreateUser, User};
