pub mod catalog;
pub mod ledger;
pub mod reorder;
pub mod transfers;

pub use ledger::StockLedger;
pub use reorder::ReorderMonitor;
pub use transfers::TransferService;
