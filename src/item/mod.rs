//! Linked institution connections and the endpoints that manage them.

mod core;
mod exchange_endpoint;
mod link_endpoints;
mod list_endpoint;

pub use core::{Item, create_item_table, get_item, insert_item, list_items};
pub(crate) use exchange_endpoint::exchange_public_token_endpoint;
pub(crate) use link_endpoints::{
    LinkState, create_link_token_endpoint, create_update_link_token_endpoint,
};
pub(crate) use list_endpoint::list_items_endpoint;
