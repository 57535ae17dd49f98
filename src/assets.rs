//! Endpoints for creating, fetching, and deleting asset reports.
//!
//! Asset reports are point-in-time statements the aggregation API generates
//! over one or more access tokens. Creation returns a token that the other
//! handlers pass back verbatim, nothing about the report is stored locally.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::header,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    item::list_items,
    plaid::AggregationApi,
};

/// How many days of history an asset report covers when the caller does not
/// say otherwise.
const DEFAULT_DAYS_REQUESTED: u32 = 60;

/// The state needed to manage asset reports.
#[derive(Debug, Clone)]
pub struct AssetReportState<C> {
    /// The facade over the financial data aggregation API.
    pub client: C,
    /// The database connection holding the linked items.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl<C> FromRef<AppState<C>> for AssetReportState<C>
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

/// The options accepted when creating an asset report.
#[derive(Debug, Deserialize)]
pub struct CreateAssetReportRequest {
    /// How many days of history to include.
    pub days_requested: Option<u32>,
}

/// A route handler that requests an asset report covering every linked item.
pub async fn create_asset_report_endpoint<C>(
    State(state): State<AssetReportState<C>>,
    request: Option<Json<CreateAssetReportRequest>>,
) -> Result<Json<Value>, Error>
where
    C: AggregationApi + Clone,
{
    let access_tokens: Vec<String> = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        list_items(&connection)?
            .into_iter()
            .map(|item| item.access_token)
            .collect()
    };

    if access_tokens.is_empty() {
        return Err(Error::NoLinkedItems);
    }

    let days_requested = request
        .and_then(|Json(request)| request.days_requested)
        .unwrap_or(DEFAULT_DAYS_REQUESTED);

    let handle = state
        .client
        .create_asset_report(&access_tokens, days_requested)
        .await?;

    tracing::info!("created asset report {}", handle.asset_report_id);

    Ok(Json(json!({
        "asset_report_token": handle.asset_report_token,
        "asset_report_id": handle.asset_report_id,
    })))
}

/// A route handler that fetches a previously created asset report.
pub async fn get_asset_report_endpoint<C>(
    State(state): State<AssetReportState<C>>,
    Path(asset_report_token): Path<String>,
) -> Result<Json<Value>, Error>
where
    C: AggregationApi + Clone,
{
    let report = state.client.asset_report(&asset_report_token).await?;

    Ok(Json(report))
}

/// A route handler that deletes a previously created asset report.
pub async fn remove_asset_report_endpoint<C>(
    State(state): State<AssetReportState<C>>,
    Path(asset_report_token): Path<String>,
) -> Result<Json<Value>, Error>
where
    C: AggregationApi + Clone,
{
    state.client.remove_asset_report(&asset_report_token).await?;

    Ok(Json(json!({ "removed": true })))
}

/// A route handler that downloads an asset report as a PDF.
pub async fn asset_report_pdf_endpoint<C>(
    State(state): State<AssetReportState<C>>,
    Path(asset_report_token): Path<String>,
) -> Result<impl IntoResponse, Error>
where
    C: AggregationApi + Clone,
{
    let bytes = state.client.asset_report_pdf(&asset_report_token).await?;

    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes))
}
