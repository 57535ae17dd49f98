//! An endpoint that enriches caller-supplied transactions with categories and
//! merchant data.

use axum::{
    Json,
    extract::{FromRef, State},
};
use serde::Deserialize;
use serde_json::Value;

use crate::{AppState, Error, plaid::AggregationApi};

/// The state needed to enrich transactions.
#[derive(Debug, Clone)]
pub struct EnrichState<C> {
    /// The facade over the financial data aggregation API.
    pub client: C,
}

impl<C> FromRef<AppState<C>> for EnrichState<C>
where
    C: AggregationApi + Clone,
{
    fn from_ref(state: &AppState<C>) -> Self {
        Self {
            client: state.client.clone(),
        }
    }
}

/// The transactions to enrich and the account type they belong to.
#[derive(Debug, Deserialize)]
pub struct EnrichRequest {
    /// The account type the transactions come from, defaults to "depository".
    pub account_type: Option<String>,
    /// The raw transactions to enrich.
    pub transactions: Option<Vec<Value>>,
}

/// A route handler that passes raw transactions through the enrichment API.
pub async fn enrich_transactions_endpoint<C>(
    State(state): State<EnrichState<C>>,
    request: Option<Json<EnrichRequest>>,
) -> Result<Json<Value>, Error>
where
    C: AggregationApi + Clone,
{
    let request = request.ok_or(Error::MissingField("transactions"))?.0;
    let transactions = request
        .transactions
        .ok_or(Error::MissingField("transactions"))?;
    let account_type = request
        .account_type
        .unwrap_or_else(|| "depository".to_owned());

    let enriched = state
        .client
        .enrich_transactions(&account_type, transactions)
        .await?;

    Ok(Json(enriched))
}
