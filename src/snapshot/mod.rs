//! Builds the denormalized per-item view of accounts, liabilities, and
//! transactions that the dashboard renders.

mod builder;
mod fetch;

pub use builder::{AccountRecord, ItemSnapshot, TransactionRecord, build_item_snapshot};
pub use fetch::FetchOutcome;
