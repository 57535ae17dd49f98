//! Produces and serves the materialized dashboard JSON consumed by the
//! static frontend.

mod core;
mod endpoints;

pub use core::{build_dashboard, write_dashboard};
pub(crate) use endpoints::{refresh_dashboard_endpoint, serve_dashboard_endpoint};
