//! The request and response shapes shared with the aggregation API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The credentials returned by a public token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangedToken {
    /// The long-lived credential used for all later calls for this item.
    pub access_token: String,
    /// The opaque identifier the source assigned to the connection.
    pub item_id: String,
}

/// An account as reported by the aggregation API.
///
/// Only the fields the snapshot builder reshapes are typed; the balances are
/// forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAccount {
    /// The source's identifier for the account.
    pub account_id: String,
    /// The account name shown in the institution's own UI.
    #[serde(default)]
    pub name: Option<String>,
    /// The institution's official name for the product.
    #[serde(default)]
    pub official_name: Option<String>,
    /// The last few digits of the account number.
    #[serde(default)]
    pub mask: Option<String>,
    /// The broad account type, e.g. "depository" or "credit".
    #[serde(default, rename = "type")]
    pub account_type: Option<String>,
    /// The account subtype, e.g. "checking".
    #[serde(default)]
    pub subtype: Option<String>,
    /// The balances object, absent when balances were not requested.
    #[serde(default)]
    pub balances: Option<Value>,
}

/// A transaction as reported by the aggregation API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTransaction {
    /// The source's identifier for the transaction.
    pub transaction_id: String,
    /// The account the transaction was posted to.
    pub account_id: String,
    /// The amount, positive for money leaving the account.
    pub amount: f64,
    /// The posting date as an ISO 8601 calendar date.
    pub date: String,
    /// The transaction description.
    #[serde(default)]
    pub name: Option<String>,
    /// The cleaned-up merchant name, when the source recognised one.
    #[serde(default)]
    pub merchant_name: Option<String>,
    /// The payee, reported for some transfer-like transactions.
    #[serde(default)]
    pub payee: Option<String>,
    /// The source's category hierarchy, broadest first.
    #[serde(default)]
    pub category: Option<Vec<String>>,
}

/// One page of an item's transaction history.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionsPage {
    /// The transactions on this page.
    pub transactions: Vec<SourceTransaction>,
    /// The total number of transactions in the requested window.
    pub total: usize,
}

/// A transaction removed upstream, reported during an incremental sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedTransaction {
    /// The identifier of the transaction that no longer exists.
    pub transaction_id: String,
}

/// One response from the incremental transaction sync endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncPage {
    /// Transactions added since the request cursor.
    #[serde(default)]
    pub added: Vec<SourceTransaction>,
    /// Transactions modified since the request cursor.
    #[serde(default)]
    pub modified: Vec<SourceTransaction>,
    /// Transactions removed since the request cursor.
    #[serde(default)]
    pub removed: Vec<RemovedTransaction>,
    /// The checkpoint to use for the next request.
    pub next_cursor: String,
    /// Whether another request is needed to catch up.
    pub has_more: bool,
}

/// The liability records reported for an item, grouped by sub-type.
///
/// Individual records are forwarded verbatim; the only field the application
/// inspects is each record's `account_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiabilityRecords {
    /// Credit card liabilities.
    #[serde(default)]
    pub credit: Vec<Value>,
    /// Student loan liabilities.
    #[serde(default)]
    pub student: Vec<Value>,
    /// Mortgage liabilities.
    #[serde(default)]
    pub mortgage: Vec<Value>,
}

impl LiabilityRecords {
    /// Flatten the sub-type lists into a map keyed by account ID.
    ///
    /// Records without an `account_id` field are dropped, as they cannot be
    /// matched to an account.
    pub fn by_account(&self) -> HashMap<String, Value> {
        self.credit
            .iter()
            .chain(&self.student)
            .chain(&self.mortgage)
            .filter_map(|record| {
                let account_id = record.get("account_id")?.as_str()?;
                Some((account_id.to_owned(), record.clone()))
            })
            .collect()
    }
}

/// Recurring inflow and outflow streams for a set of accounts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecurringStreams {
    /// Streams of money coming in, e.g. salary.
    #[serde(default)]
    pub inflow_streams: Vec<Value>,
    /// Streams of money going out, e.g. subscriptions.
    #[serde(default)]
    pub outflow_streams: Vec<Value>,
}

/// The identifiers returned when an asset report is requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetReportHandle {
    /// The token used to fetch or remove the report.
    pub asset_report_token: String,
    /// The source's identifier for the report.
    pub asset_report_id: String,
}
