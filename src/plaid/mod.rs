//! A facade over the financial data aggregation API.
//!
//! The rest of the application talks to the source through the
//! [AggregationApi] trait so that handlers and the snapshot builder can be
//! tested against a canned implementation. [PlaidClient] is the production
//! implementation that forwards each operation over HTTPS.

mod client;
mod types;

pub use client::{PlaidClient, PlaidConfig};
pub use types::{
    AssetReportHandle, ExchangedToken, LiabilityRecords, RecurringStreams, RemovedTransaction,
    SourceAccount, SourceTransaction, SyncPage, TransactionsPage,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::Error;

/// The outbound operations the application needs from the aggregation API.
///
/// Implementations should treat request and response shapes as opaque where
/// the application merely forwards them, and only type the fields the
/// snapshot builder and sync loop reshape.
#[async_trait]
pub trait AggregationApi: Send + Sync {
    /// Create a link token for linking a new institution.
    async fn create_link_token(&self) -> Result<String, Error>;

    /// Create a link token that puts an existing item into update mode.
    async fn create_update_link_token(&self, access_token: &str) -> Result<String, Error>;

    /// Exchange a public token for the item's long-lived credentials.
    async fn exchange_public_token(&self, public_token: &str) -> Result<ExchangedToken, Error>;

    /// Fetch the item's accounts together with their current balances.
    async fn accounts_with_balances(
        &self,
        access_token: &str,
    ) -> Result<Vec<SourceAccount>, Error>;

    /// Fetch the item's accounts without requesting fresh balances.
    async fn accounts(&self, access_token: &str) -> Result<Vec<SourceAccount>, Error>;

    /// Fetch the item's credit, student loan, and mortgage liabilities.
    async fn liabilities(&self, access_token: &str) -> Result<LiabilityRecords, Error>;

    /// Fetch one page of the item's transaction history for a date window.
    async fn transactions_page(
        &self,
        access_token: &str,
        start_date: &str,
        end_date: &str,
        count: usize,
        offset: usize,
    ) -> Result<TransactionsPage, Error>;

    /// Fetch the next batch of incremental transaction changes.
    ///
    /// `cursor` of `None` asks for the item's full history from the
    /// beginning.
    async fn transactions_sync(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<SyncPage, Error>;

    /// Ask the source to pull fresh transactions for the item.
    async fn transactions_refresh(&self, access_token: &str) -> Result<(), Error>;

    /// Fetch the recurring transaction streams for a set of accounts.
    async fn recurring_transactions(
        &self,
        access_token: &str,
        account_ids: &[String],
    ) -> Result<RecurringStreams, Error>;

    /// Request an asset report covering the given credentials.
    async fn create_asset_report(
        &self,
        access_tokens: &[String],
        days_requested: u32,
    ) -> Result<AssetReportHandle, Error>;

    /// Fetch a previously requested asset report as JSON.
    async fn asset_report(&self, asset_report_token: &str) -> Result<Value, Error>;

    /// Remove a previously requested asset report.
    async fn remove_asset_report(&self, asset_report_token: &str) -> Result<(), Error>;

    /// Fetch a previously requested asset report as a PDF document.
    async fn asset_report_pdf(&self, asset_report_token: &str) -> Result<Vec<u8>, Error>;

    /// Enrich transactions that were not sourced through a linked item.
    async fn enrich_transactions(
        &self,
        account_type: &str,
        transactions: Vec<Value>,
    ) -> Result<Value, Error>;
}
