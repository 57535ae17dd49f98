//! Defines the endpoints that rebuild and serve the dashboard file.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    dashboard::{build_dashboard, write_dashboard},
    item::list_items,
    plaid::AggregationApi,
};

/// The request header carrying the dashboard refresh secret.
pub const REFRESH_SECRET_HEADER: &str = "x-refresh-secret";

/// The state needed to rebuild and serve the dashboard file.
#[derive(Debug, Clone)]
pub struct DashboardState<C> {
    /// The facade over the financial data aggregation API.
    pub client: C,
    /// The database connection holding the linked items.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Where the dashboard file lives.
    pub dashboard_path: PathBuf,
    /// The shared secret that guards the refresh endpoint.
    pub refresh_secret: String,
    /// How many days of transaction history each snapshot covers.
    pub lookback_days: i64,
}

impl<C> FromRef<AppState<C>> for DashboardState<C>
where
    C: AggregationApi + Clone,
{
    fn from_ref(state: &AppState<C>) -> Self {
        Self {
            client: state.client.clone(),
            db_connection: state.db_connection.clone(),
            dashboard_path: state.dashboard_path.clone(),
            refresh_secret: state.refresh_secret.clone(),
            lookback_days: state.lookback_days,
        }
    }
}

/// A route handler that rebuilds the dashboard file.
///
/// The caller must present the configured secret in the
/// [REFRESH_SECRET_HEADER] header; without it the file is left untouched.
/// The comparison is not constant-time, which is acceptable for a
/// single-operator local deployment.
pub async fn refresh_dashboard_endpoint<C>(
    State(state): State<DashboardState<C>>,
    headers: HeaderMap,
) -> Result<Json<Value>, Error>
where
    C: AggregationApi + Clone,
{
    let presented = headers
        .get(REFRESH_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    if presented != Some(state.refresh_secret.as_str()) {
        return Err(Error::Unauthorized);
    }

    let items = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        list_items(&connection)?
    };

    let contents = build_dashboard(&state.client, &items, state.lookback_days).await?;
    write_dashboard(&state.dashboard_path, &contents)?;

    tracing::info!(
        "dashboard refreshed: {} accounts, {} transactions, {} failed items",
        contents.accounts.len(),
        contents.transactions.len(),
        contents.errors.len()
    );

    Ok(Json(json!({
        "last_updated": contents.last_updated,
        "accounts": contents.accounts.len(),
        "transactions": contents.transactions.len(),
        "errors": contents.errors,
    })))
}

/// A route handler that serves the current dashboard file.
///
/// Returns 404 until the first successful refresh has written the file.
pub async fn serve_dashboard_endpoint<C>(
    State(state): State<DashboardState<C>>,
) -> Result<Response, Error>
where
    C: AggregationApi + Clone,
{
    let bytes = tokio::fs::read(&state.dashboard_path)
        .await
        .map_err(|error| match error.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound,
            _ => Error::DashboardFileError(error.to_string()),
        })?;

    Ok(([(header::CONTENT_TYPE, "application/json")], bytes).into_response())
}
