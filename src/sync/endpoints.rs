//! Defines the endpoints that sync and refresh transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    item::{Item, get_item, list_items},
    plaid::{AggregationApi, RemovedTransaction, SourceTransaction},
    sync::{get_cursor, sync_item, upsert_cursor},
};

/// The state needed to sync transactions for linked items.
#[derive(Debug, Clone)]
pub struct SyncState<C> {
    /// The facade over the financial data aggregation API.
    pub client: C,
    /// The database connection holding items and cursors.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl<C> FromRef<AppState<C>> for SyncState<C>
where
    C: AggregationApi + Clone,
{
    fn from_ref(state: &AppState<C>) -> Self {
        Self {
            client: state.client.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for syncing a single item.
#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    /// Overrides the stored checkpoint for this pass only.
    pub cursor: Option<String>,
}

/// The response body for syncing a single item.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    /// The item that was synced.
    pub item_id: String,
    /// Transactions added since the checkpoint.
    pub added: Vec<SourceTransaction>,
    /// Transactions modified since the checkpoint.
    pub modified: Vec<SourceTransaction>,
    /// Transactions removed since the checkpoint.
    pub removed: Vec<RemovedTransaction>,
    /// The newly persisted checkpoint.
    pub cursor: String,
}

/// A route handler that syncs one item's transactions to "caught up".
///
/// The new cursor is persisted only when the whole loop succeeds, so a
/// failed pass resumes from the previous checkpoint on the next attempt.
pub async fn sync_item_endpoint<C>(
    State(state): State<SyncState<C>>,
    Path(item_id): Path<String>,
    request: Option<Json<SyncRequest>>,
) -> Result<Json<SyncResponse>, Error>
where
    C: AggregationApi + Clone,
{
    let (item, stored_cursor) = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        let item = get_item(&connection, &item_id)?;
        let cursor = get_cursor(&connection, &item_id)?;
        (item, cursor)
    };

    let starting_cursor = request
        .and_then(|Json(request)| request.cursor)
        .or(stored_cursor);

    let outcome = sync_item(&state.client, &item, starting_cursor).await?;

    {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        upsert_cursor(&connection, &item_id, &outcome.next_cursor)?;
    }

    Ok(Json(SyncResponse {
        item_id,
        added: outcome.added,
        modified: outcome.modified,
        removed: outcome.removed,
        cursor: outcome.next_cursor,
    }))
}

/// One item's entry in the sync-all response.
#[derive(Debug, Serialize)]
pub struct SyncAllEntry {
    /// The item this entry describes.
    pub item_id: String,
    /// The institution name, for display in logs and the client.
    pub institution_name: Option<String>,
    /// The number of transactions added.
    pub added: usize,
    /// The number of transactions modified.
    pub modified: usize,
    /// The number of transactions removed.
    pub removed: usize,
    /// Why the item failed to sync, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A route handler that syncs every linked item.
///
/// Each item is synced inside its own error boundary: one item's failure is
/// recorded in its own entry and never aborts the remaining items.
pub async fn sync_all_endpoint<C>(
    State(state): State<SyncState<C>>,
) -> Result<Json<Value>, Error>
where
    C: AggregationApi + Clone,
{
    let items = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        list_items(&connection)?
    };

    let mut entries = Vec::with_capacity(items.len());

    for item in items {
        entries.push(sync_one_of_many(&state, &item).await);
    }

    Ok(Json(json!({ "items": entries })))
}

async fn sync_one_of_many<C>(state: &SyncState<C>, item: &Item) -> SyncAllEntry
where
    C: AggregationApi + Clone,
{
    let entry = |added, modified, removed, error| SyncAllEntry {
        item_id: item.item_id.clone(),
        institution_name: item.institution_name.clone(),
        added,
        modified,
        removed,
        error,
    };

    let stored_cursor = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => return entry(0, 0, 0, Some("sync_failed".to_owned())),
        };
        match get_cursor(&connection, &item.item_id) {
            Ok(cursor) => cursor,
            Err(error) => {
                tracing::error!("could not load the cursor for item {}: {error}", item.item_id);
                return entry(0, 0, 0, Some("sync_failed".to_owned()));
            }
        }
    };

    let outcome = match sync_item(&state.client, item, stored_cursor).await {
        Ok(outcome) => outcome,
        Err(error) => {
            tracing::error!("could not sync item {}: {error}", item.item_id);
            return entry(0, 0, 0, Some("sync_failed".to_owned()));
        }
    };

    let persisted = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => return entry(0, 0, 0, Some("sync_failed".to_owned())),
        };
        upsert_cursor(&connection, &item.item_id, &outcome.next_cursor)
    };

    if let Err(error) = persisted {
        tracing::error!("could not persist the cursor for item {}: {error}", item.item_id);
        return entry(0, 0, 0, Some("sync_failed".to_owned()));
    }

    entry(
        outcome.added.len(),
        outcome.modified.len(),
        outcome.removed.len(),
        None,
    )
}

/// A route handler that asks the source for a fresh pull on every item.
///
/// Refreshing is best-effort: items whose refresh request fails are listed
/// in the response and the rest proceed.
pub async fn refresh_transactions_endpoint<C>(
    State(state): State<SyncState<C>>,
) -> Result<Json<Value>, Error>
where
    C: AggregationApi + Clone,
{
    let items = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        list_items(&connection)?
    };

    let mut refreshed = 0;
    let mut failed = Vec::new();

    for item in items {
        match state.client.transactions_refresh(&item.access_token).await {
            Ok(()) => refreshed += 1,
            Err(error) => {
                tracing::warn!("could not refresh item {}: {error}", item.item_id);
                failed.push(item.item_id);
            }
        }
    }

    Ok(Json(json!({ "refreshed": refreshed, "failed": failed })))
}
