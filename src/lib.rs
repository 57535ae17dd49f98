//! Ledgerlink is the backend for a personal finance dashboard.
//!
//! It brokers calls between a browser client and a financial data
//! aggregation API, keeps the credentials and sync checkpoints for each
//! linked institution in a local SQLite database, and materializes a
//! combined JSON snapshot on disk for a static frontend to render.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod account;
mod assets;
mod dashboard;
mod db;
mod endpoints;
mod enrich;
mod item;
mod plaid;
mod recurring;
mod routing;
mod snapshot;
mod state;
mod sync;

#[cfg(test)]
pub(crate) mod test_utils;

pub use db::initialize as initialize_db;
pub use item::Item;
pub use plaid::{AggregationApi, PlaidClient, PlaidConfig};
pub use routing::build_router;
pub use snapshot::{ItemSnapshot, build_item_snapshot};
pub use state::{AppState, DEFAULT_LOOKBACK_DAYS};
pub use sync::{SyncOutcome, sync_item};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request referred to an item ID that is not in the database.
    #[error("no item with the ID \"{0}\" has been linked")]
    UnknownItem(String),

    /// The request body was missing a required field.
    #[error("the request is missing the required field \"{0}\"")]
    MissingField(&'static str),

    /// There are no linked items to perform the operation over.
    #[error("no items have been linked")]
    NoLinkedItems,

    /// The dashboard refresh secret was missing or did not match.
    #[error("the refresh secret is missing or incorrect")]
    Unauthorized,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the resource
    /// has been created, e.g., the dashboard file has been written at least
    /// once before it can be served.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A call to the aggregation API failed and no fallback applied.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("the aggregation API call failed: {0}")]
    Upstream(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JsonError(String),

    /// The dashboard file could not be read or written.
    #[error("could not read or write the dashboard file: {0}")]
    DashboardFileError(String),

    /// The refresh timestamp could not be formatted.
    #[error("could not format the refresh timestamp: {0}")]
    TimestampError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => Error::SqlError(error),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Upstream(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JsonError(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Error::UnknownItem(_) => (StatusCode::NOT_FOUND, "unknown_item"),
            Error::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            Error::MissingField(_) => (StatusCode::BAD_REQUEST, "missing_field"),
            Error::NoLinkedItems => (StatusCode::BAD_REQUEST, "no_items"),
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Error::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }

        let body = Json(json!({
            "error": code,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod error_response_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::Error;

    #[test]
    fn caller_errors_map_to_4xx() {
        let cases = [
            (Error::MissingField("public_token"), StatusCode::BAD_REQUEST),
            (
                Error::UnknownItem("item-404".to_owned()),
                StatusCode::NOT_FOUND,
            ),
            (Error::NoLinkedItems, StatusCode::BAD_REQUEST),
            (Error::Unauthorized, StatusCode::UNAUTHORIZED),
        ];

        for (error, want_status) in cases {
            let response = error.into_response();
            assert_eq!(response.status(), want_status);
        }
    }

    #[test]
    fn upstream_errors_map_to_bad_gateway() {
        let response = Error::Upstream("HTTP 500".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn sql_errors_are_not_shown_as_client_errors() {
        let response = Error::DatabaseLockError.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn no_rows_converts_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }
}
