//! Read-through endpoints that list accounts, balances, and liabilities for
//! every linked item.
//!
//! These handlers isolate failures per item: an item the source cannot
//! answer for gets its own entry with an error marker instead of aborting
//! the rest.

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
    plaid::{AggregationApi, LiabilityRecords, SourceAccount},
};

/// The state needed to list account data for linked items.
#[derive(Debug, Clone)]
pub struct AccountState<C> {
    /// The facade over the financial data aggregation API.
    pub client: C,
    /// The database connection holding the linked items.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl<C> FromRef<AppState<C>> for AccountState<C>
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

/// One item's accounts, or the reason they could not be fetched.
#[derive(Debug, Serialize)]
pub struct ItemAccounts {
    /// The item this entry describes.
    pub item_id: String,
    /// The institution name, for display.
    pub institution_name: Option<String>,
    /// The item's accounts, empty when the fetch failed.
    pub accounts: Vec<SourceAccount>,
    /// Why the fetch failed, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One item's liabilities, or the reason they could not be fetched.
#[derive(Debug, Serialize)]
pub struct ItemLiabilities {
    /// The item this entry describes.
    pub item_id: String,
    /// The institution name, for display.
    pub institution_name: Option<String>,
    /// The item's liabilities, empty when the fetch failed.
    pub liabilities: LiabilityRecords,
    /// Why the fetch failed, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn load_items(db_connection: &Arc<Mutex<Connection>>) -> Result<Vec<Item>, Error> {
    let connection = db_connection.lock().map_err(|_| Error::DatabaseLockError)?;

    list_items(&connection)
}

/// A route handler that lists every item's accounts.
pub async fn list_accounts_endpoint<C>(
    State(state): State<AccountState<C>>,
) -> Result<Json<Value>, Error>
where
    C: AggregationApi + Clone,
{
    let items = load_items(&state.db_connection)?;
    let mut entries = Vec::with_capacity(items.len());

    for item in items {
        let entry = match state.client.accounts(&item.access_token).await {
            Ok(accounts) => ItemAccounts {
                item_id: item.item_id,
                institution_name: item.institution_name,
                accounts,
                error: None,
            },
            Err(error) => {
                tracing::error!("could not list accounts for item {}: {error}", item.item_id);
                ItemAccounts {
                    item_id: item.item_id,
                    institution_name: item.institution_name,
                    accounts: Vec::new(),
                    error: Some("accounts_failed".to_owned()),
                }
            }
        };
        entries.push(entry);
    }

    Ok(Json(json!({ "items": entries })))
}

/// A route handler that lists every item's accounts with balances.
///
/// Uses the same primary-then-fallback pattern as the snapshot builder:
/// when fresh balances cannot be fetched, the plain accounts are returned
/// with each balances object defaulted to empty.
pub async fn list_balances_endpoint<C>(
    State(state): State<AccountState<C>>,
) -> Result<Json<Value>, Error>
where
    C: AggregationApi + Clone,
{
    let items = load_items(&state.db_connection)?;
    let mut entries = Vec::with_capacity(items.len());

    for item in items {
        entries.push(balances_for_item(&state.client, item).await);
    }

    Ok(Json(json!({ "items": entries })))
}

async fn balances_for_item<C>(client: &C, item: Item) -> ItemAccounts
where
    C: AggregationApi,
{
    match client.accounts_with_balances(&item.access_token).await {
        Ok(accounts) => ItemAccounts {
            item_id: item.item_id,
            institution_name: item.institution_name,
            accounts,
            error: None,
        },
        Err(error) => {
            tracing::warn!(
                "could not fetch balances for item {}, falling back to accounts only: {error}",
                item.item_id
            );

            match client.accounts(&item.access_token).await {
                Ok(mut accounts) => {
                    for account in &mut accounts {
                        account.balances = Some(json!({}));
                    }
                    ItemAccounts {
                        item_id: item.item_id,
                        institution_name: item.institution_name,
                        accounts,
                        error: None,
                    }
                }
                Err(error) => {
                    tracing::error!(
                        "could not fetch accounts for item {}: {error}",
                        item.item_id
                    );
                    ItemAccounts {
                        item_id: item.item_id,
                        institution_name: item.institution_name,
                        accounts: Vec::new(),
                        error: Some("accounts_failed".to_owned()),
                    }
                }
            }
        }
    }
}

/// A route handler that lists every item's liabilities.
pub async fn list_liabilities_endpoint<C>(
    State(state): State<AccountState<C>>,
) -> Result<Json<Value>, Error>
where
    C: AggregationApi + Clone,
{
    let items = load_items(&state.db_connection)?;
    let mut entries = Vec::with_capacity(items.len());

    for item in items {
        let entry = match state.client.liabilities(&item.access_token).await {
            Ok(liabilities) => ItemLiabilities {
                item_id: item.item_id,
                institution_name: item.institution_name,
                liabilities,
                error: None,
            },
            Err(error) => {
                tracing::error!(
                    "could not list liabilities for item {}: {error}",
                    item.item_id
                );
                ItemLiabilities {
                    item_id: item.item_id,
                    institution_name: item.institution_name,
                    liabilities: LiabilityRecords::default(),
                    error: Some("liabilities_failed".to_owned()),
                }
            }
        };
        entries.push(entry);
    }

    Ok(Json(json!({ "items": entries })))
}
