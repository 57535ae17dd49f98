//! An endpoint that lists recurring transaction streams for every linked item.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    item::{Item, list_items},
    plaid::{AggregationApi, RecurringStreams},
};

/// The state needed to list recurring transactions.
#[derive(Debug, Clone)]
pub struct RecurringState<C> {
    /// The facade over the financial data aggregation API.
    pub client: C,
    /// The database connection holding the linked items.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl<C> FromRef<AppState<C>> for RecurringState<C>
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

/// One item's recurring streams, or the reason they could not be fetched.
#[derive(Debug, Serialize)]
pub struct ItemRecurring {
    /// The item this entry describes.
    pub item_id: String,
    /// The institution name, for display.
    pub institution_name: Option<String>,
    /// Streams of money coming in.
    pub inflow_streams: Vec<Value>,
    /// Streams of money going out.
    pub outflow_streams: Vec<Value>,
    /// Why the fetch failed, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A route handler that lists recurring transaction streams for every item.
///
/// The upstream recurring endpoint requires explicit account ids, so each
/// item's accounts are listed first and all of their ids passed along.
pub async fn list_recurring_endpoint<C>(
    State(state): State<RecurringState<C>>,
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
        entries.push(recurring_for_item(&state.client, item).await);
    }

    Ok(Json(json!({ "items": entries })))
}

async fn recurring_for_item<C>(client: &C, item: Item) -> ItemRecurring
where
    C: AggregationApi,
{
    match fetch_recurring(client, &item.access_token).await {
        Ok(streams) => ItemRecurring {
            item_id: item.item_id,
            institution_name: item.institution_name,
            inflow_streams: streams.inflow_streams,
            outflow_streams: streams.outflow_streams,
            error: None,
        },
        Err(error) => {
            tracing::error!(
                "could not list recurring transactions for item {}: {error}",
                item.item_id
            );
            ItemRecurring {
                item_id: item.item_id,
                institution_name: item.institution_name,
                inflow_streams: Vec::new(),
                outflow_streams: Vec::new(),
                error: Some("recurring_failed".to_owned()),
            }
        }
    }
}

async fn fetch_recurring<C>(client: &C, access_token: &str) -> Result<RecurringStreams, Error>
where
    C: AggregationApi,
{
    let accounts = client.accounts(access_token).await?;
    let account_ids: Vec<String> = accounts
        .into_iter()
        .map(|account| account.account_id)
        .collect();

    client.recurring_transactions(access_token, &account_ids).await
}
