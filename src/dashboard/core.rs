use std::path::Path;

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    Error,
    item::Item,
    plaid::AggregationApi,
    snapshot::{AccountRecord, TransactionRecord, build_item_snapshot},
};

/// The error marker recorded for an item whose snapshot could not be built.
const SNAPSHOT_FAILED: &str = "snapshot_failed";

/// Marks an item whose snapshot could not be built during a refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemError {
    /// The item that failed.
    pub item_id: String,
    /// The institution name, for display.
    pub institution: Option<String>,
    /// The error marker.
    pub error: String,
}

/// The complete dashboard file consumed by the static frontend.
///
/// Each refresh writes a full replacement; no history is retained.
#[derive(Debug, Serialize)]
pub struct DashboardContents {
    /// When the refresh ran, as an RFC 3339 timestamp.
    pub last_updated: String,
    /// Every item's reshaped accounts, concatenated.
    pub accounts: Vec<AccountRecord>,
    /// Every item's reshaped transactions, concatenated.
    pub transactions: Vec<TransactionRecord>,
    /// The items whose snapshot could not be built this run.
    pub errors: Vec<ItemError>,
}

/// Build the combined dashboard view across every linked item.
///
/// For each item the source is first asked for a fresh pull (best-effort,
/// failures logged and ignored), then a snapshot is built. An item whose
/// snapshot failed contributes nothing to the account and transaction lists
/// and is recorded in `errors` instead; it is never removed.
pub async fn build_dashboard<C>(
    client: &C,
    items: &[Item],
    lookback_days: i64,
) -> Result<DashboardContents, Error>
where
    C: AggregationApi,
{
    let mut accounts = Vec::new();
    let mut transactions = Vec::new();
    let mut errors = Vec::new();

    for item in items {
        if let Err(error) = client.transactions_refresh(&item.access_token).await {
            tracing::warn!(
                "could not request a fresh pull for item {}: {error}",
                item.item_id
            );
        }

        let snapshot = build_item_snapshot(client, item, lookback_days).await;

        match snapshot.error {
            Some(marker) => {
                tracing::error!(
                    "snapshot for item {} failed with \"{marker}\"",
                    item.item_id
                );
                errors.push(ItemError {
                    item_id: item.item_id.clone(),
                    institution: item.institution_name.clone(),
                    error: SNAPSHOT_FAILED.to_owned(),
                });
            }
            None => {
                accounts.extend(snapshot.accounts);
                transactions.extend(snapshot.transactions);
            }
        }
    }

    let last_updated = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|error| Error::TimestampError(error.to_string()))?;

    Ok(DashboardContents {
        last_updated,
        accounts,
        transactions,
        errors,
    })
}

/// Write `contents` as the complete replacement of the dashboard file.
///
/// The write is not atomic; the system is designed for single-operator
/// local use where a torn write can be repaired by refreshing again.
///
/// # Errors
/// Returns an [Error::JsonError] if the contents could not be serialized,
/// or an [Error::DashboardFileError] if the file could not be written.
pub fn write_dashboard(path: &Path, contents: &DashboardContents) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(contents)?;

    std::fs::write(path, json).map_err(|error| Error::DashboardFileError(error.to_string()))
}

#[cfg(test)]
mod dashboard_tests {
    use serde_json::Value;

    use crate::test_utils::{FakeApi, checking_account, coffee_transaction, get_test_item};

    use super::{build_dashboard, write_dashboard};

    #[tokio::test]
    async fn zero_items_produces_an_empty_dashboard() {
        let api = FakeApi::default();

        let contents = build_dashboard(&api, &[], 365).await.unwrap();

        assert!(contents.accounts.is_empty());
        assert!(contents.transactions.is_empty());
        assert!(contents.errors.is_empty());
        assert!(!contents.last_updated.is_empty());
    }

    #[tokio::test]
    async fn concatenates_accounts_and_transactions_across_items() {
        let api = FakeApi::default()
            .with_accounts(vec![checking_account("acc-1"), checking_account("acc-2")])
            .with_transactions(vec![coffee_transaction("txn-1")]);
        let mut other_item = get_test_item();
        other_item.item_id = "item-2".to_owned();
        let items = [get_test_item(), other_item];

        let contents = build_dashboard(&api, &items, 365).await.unwrap();

        assert_eq!(contents.accounts.len(), 4);
        assert_eq!(contents.transactions.len(), 2);
        assert!(contents.errors.is_empty());
    }

    #[tokio::test]
    async fn failed_item_is_recorded_and_the_rest_proceed() {
        // Both the balances call and the accounts fallback fail, which is
        // terminal for every item in this fake, so each item lands in
        // `errors` rather than contributing empty accounts.
        let api = FakeApi::default()
            .with_balances_failure()
            .with_accounts_failure();
        let items = [get_test_item()];

        let contents = build_dashboard(&api, &items, 365).await.unwrap();

        assert!(contents.accounts.is_empty());
        assert_eq!(contents.errors.len(), 1);
        assert_eq!(contents.errors[0].item_id, "item-1");
        assert_eq!(contents.errors[0].error, "snapshot_failed");
    }

    #[tokio::test]
    async fn refresh_failure_does_not_stop_the_snapshot() {
        let api = FakeApi::default()
            .with_accounts(vec![checking_account("acc-1")])
            .with_refresh_failure_for("access-1");
        let items = [get_test_item()];

        let contents = build_dashboard(&api, &items, 365).await.unwrap();

        assert_eq!(contents.accounts.len(), 1);
        assert!(contents.errors.is_empty());
    }

    #[tokio::test]
    async fn written_file_is_valid_json_with_the_expected_shape() {
        let api = FakeApi::default().with_accounts(vec![checking_account("acc-1")]);
        let items = [get_test_item()];
        let contents = build_dashboard(&api, &items, 365).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");

        write_dashboard(&path, &contents).unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(written["last_updated"].is_string());
        assert_eq!(written["accounts"].as_array().unwrap().len(), 1);
        assert_eq!(written["transactions"].as_array().unwrap().len(), 0);
        assert_eq!(written["errors"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn refresh_fully_replaces_the_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");

        let api = FakeApi::default()
            .with_accounts(vec![checking_account("acc-1"), checking_account("acc-2")]);
        let items = [get_test_item()];
        let contents = build_dashboard(&api, &items, 365).await.unwrap();
        write_dashboard(&path, &contents).unwrap();

        let empty = build_dashboard(&api, &[], 365).await.unwrap();
        write_dashboard(&path, &empty).unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            written["accounts"].as_array().unwrap().len(),
            0,
            "the file must be a full replacement, not an append"
        );
    }
}
