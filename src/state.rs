//! Implements a struct that holds the state of the REST server.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;

use crate::plaid::AggregationApi;

/// How many days of transaction history a snapshot covers by default.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 365;

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState<C>
where
    C: AggregationApi + Clone,
{
    /// The facade over the financial data aggregation API.
    pub client: C,
    /// The database connection holding linked items and their sync cursors.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Where the materialized dashboard JSON file is written.
    pub dashboard_path: PathBuf,
    /// The shared secret that guards the dashboard refresh endpoint.
    pub refresh_secret: String,
    /// How many days of transaction history to include in each snapshot.
    pub lookback_days: i64,
}

impl<C> AppState<C>
where
    C: AggregationApi + Clone,
{
    /// Create a new [AppState].
    pub fn new(
        client: C,
        db_connection: Arc<Mutex<Connection>>,
        dashboard_path: PathBuf,
        refresh_secret: &str,
        lookback_days: i64,
    ) -> Self {
        Self {
            client,
            db_connection,
            dashboard_path,
            refresh_secret: refresh_secret.to_owned(),
            lookback_days,
        }
    }
}
