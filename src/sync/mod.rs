//! Incremental transaction sync: the cursor store, the sync loop, and the
//! endpoints that drive them.

mod core;
mod cursor;
mod endpoints;

pub use core::{SyncOutcome, sync_item};
pub use cursor::{create_cursor_table, get_cursor, upsert_cursor};
pub(crate) use endpoints::{
    refresh_transactions_endpoint, sync_all_endpoint, sync_item_endpoint,
};
