//! Defines the endpoint that lists the linked items.

use std::sync::{Arc, Mutex};

use axum::{Json, extract::{FromRef, State}};
use rusqlite::Connection;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;

use crate::{AppState, Error, item::list_items, plaid::AggregationApi};

/// The state needed to list the linked items.
#[derive(Debug, Clone)]
pub struct ItemState {
    /// The database connection holding the linked items.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl<C> FromRef<AppState<C>> for ItemState
where
    C: AggregationApi + Clone,
{
    fn from_ref(state: &AppState<C>) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A linked item as shown to the client, without its credential.
#[derive(Debug, Serialize)]
pub struct ItemSummary {
    /// The opaque identifier the aggregation API assigned to the connection.
    pub item_id: String,
    /// The institution name reported when the item was linked.
    pub institution_name: Option<String>,
    /// When the item was linked, as an RFC 3339 timestamp.
    pub created_at: String,
}

/// A route handler that lists every linked item.
///
/// Access tokens are never included in the response.
pub async fn list_items_endpoint(
    State(state): State<ItemState>,
) -> Result<Json<Vec<ItemSummary>>, Error> {
    let items = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        list_items(&connection)?
    };

    let summaries = items
        .into_iter()
        .map(|item| {
            let created_at = item
                .created_at
                .format(&Rfc3339)
                .map_err(|error| Error::TimestampError(error.to_string()))?;

            Ok(ItemSummary {
                item_id: item.item_id,
                institution_name: item.institution_name,
                created_at,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(Json(summaries))
}
