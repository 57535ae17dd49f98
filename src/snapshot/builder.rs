use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Value, json};
use time::{Date, Duration, OffsetDateTime};

use crate::{
    item::Item,
    plaid::{AggregationApi, SourceAccount, SourceTransaction},
    snapshot::FetchOutcome,
};

/// How many transactions to request per page when walking the full history.
const TRANSACTION_PAGE_SIZE: usize = 500;

/// The error marker set when an item's accounts could not be fetched at all.
const ACCOUNTS_FAILED: &str = "accounts_failed";

/// A reshaped account ready for the dashboard frontend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRecord {
    /// The institution the account belongs to.
    pub institution: Option<String>,
    /// The best available human-readable name for the account.
    pub display_name: String,
    /// The institution-qualified name used to label transactions.
    pub nickname: String,
    /// The last few digits of the account number.
    pub mask: Option<String>,
    /// The broad account type, e.g. "depository".
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    /// The account subtype, e.g. "checking".
    pub subtype: Option<String>,
    /// The balances object; empty when balances could not be fetched.
    pub balances: Value,
    /// The matched liability record, or null when there is none.
    pub liability: Option<Value>,
}

/// A reshaped transaction ready for the dashboard frontend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    /// The posting date as an ISO 8601 calendar date.
    pub date: String,
    /// The best available description of the transaction.
    pub name: String,
    /// The amount, positive for money coming in.
    pub amount: f64,
    /// The source's category hierarchy, broadest first.
    pub category: Vec<String>,
    /// The institution the transaction belongs to.
    pub institution: Option<String>,
    /// The nickname of the account the transaction was posted to.
    pub account: Option<String>,
}

/// The combined financial state of one linked item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSnapshot {
    /// The item's reshaped accounts.
    pub accounts: Vec<AccountRecord>,
    /// The item's reshaped transactions, most of a year of history.
    pub transactions: Vec<TransactionRecord>,
    /// Set only when the accounts step failed outright.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemSnapshot {
    fn failed(marker: &str) -> Self {
        Self {
            accounts: Vec::new(),
            transactions: Vec::new(),
            error: Some(marker.to_owned()),
        }
    }
}

/// Build the dashboard view of one item, degrading gracefully per source.
///
/// The accounts step falls back from accounts-with-balances to plain
/// accounts, and only a double failure is terminal for the item. The
/// liabilities step and the transaction history walk are best-effort: their
/// failures are logged and the snapshot proceeds with what it has.
pub async fn build_item_snapshot<C>(client: &C, item: &Item, lookback_days: i64) -> ItemSnapshot
where
    C: AggregationApi,
{
    let accounts = match fetch_accounts(client, item).await.into_value() {
        Some(accounts) => accounts,
        None => return ItemSnapshot::failed(ACCOUNTS_FAILED),
    };

    let liabilities = match client.liabilities(&item.access_token).await {
        Ok(records) => records.by_account(),
        Err(error) => {
            tracing::warn!(
                "could not fetch liabilities for item {}: {error}",
                item.item_id
            );
            HashMap::new()
        }
    };

    let transactions = fetch_transaction_history(client, item, lookback_days).await;

    let account_records: Vec<AccountRecord> = accounts
        .iter()
        .map(|account| reshape_account(account, item, &liabilities))
        .collect();

    let nicknames: HashMap<&str, &str> = accounts
        .iter()
        .zip(&account_records)
        .map(|(source, record)| (source.account_id.as_str(), record.nickname.as_str()))
        .collect();

    let transaction_records = transactions
        .iter()
        .map(|transaction| reshape_transaction(transaction, item, &nicknames))
        .collect();

    ItemSnapshot {
        accounts: account_records,
        transactions: transaction_records,
        error: None,
    }
}

/// The accounts step: balances first, plain accounts as the fallback.
async fn fetch_accounts<C>(client: &C, item: &Item) -> FetchOutcome<Vec<SourceAccount>>
where
    C: AggregationApi,
{
    match client.accounts_with_balances(&item.access_token).await {
        Ok(accounts) => FetchOutcome::Primary(accounts),
        Err(error) => {
            tracing::warn!(
                "could not fetch balances for item {}, falling back to accounts only: {error}",
                item.item_id
            );

            match client.accounts(&item.access_token).await {
                Ok(mut accounts) => {
                    for account in &mut accounts {
                        account.balances = None;
                    }
                    FetchOutcome::Fallback(accounts)
                }
                Err(error) => {
                    tracing::error!(
                        "could not fetch accounts for item {}: {error}",
                        item.item_id
                    );
                    FetchOutcome::Failed
                }
            }
        }
    }
}

/// Walk the item's transaction history for the lookback window.
///
/// Pages are requested sequentially, advancing the offset by the number of
/// transactions accumulated so far, until the accumulated count reaches the
/// server-reported total. A failure mid-walk keeps the partial result.
async fn fetch_transaction_history<C>(
    client: &C,
    item: &Item,
    lookback_days: i64,
) -> Vec<SourceTransaction>
where
    C: AggregationApi,
{
    let end_date = OffsetDateTime::now_utc().date();
    let start_date = end_date
        .checked_sub(Duration::days(lookback_days))
        .unwrap_or(Date::MIN);
    let (start, end) = (start_date.to_string(), end_date.to_string());

    let mut fetched: Vec<SourceTransaction> = Vec::new();

    loop {
        let page = match client
            .transactions_page(
                &item.access_token,
                &start,
                &end,
                TRANSACTION_PAGE_SIZE,
                fetched.len(),
            )
            .await
        {
            Ok(page) => page,
            Err(error) => {
                tracing::warn!(
                    "transaction history for item {} stopped early at {} transactions: {error}",
                    item.item_id,
                    fetched.len()
                );
                break;
            }
        };

        // A source that reports a total it never serves must not loop us
        // forever.
        if page.transactions.is_empty() {
            break;
        }

        let total = page.total;
        fetched.extend(page.transactions);

        if fetched.len() >= total {
            break;
        }
    }

    fetched
}

fn reshape_account(
    account: &SourceAccount,
    item: &Item,
    liabilities: &HashMap<String, Value>,
) -> AccountRecord {
    let display_name = account
        .name
        .clone()
        .or_else(|| account.official_name.clone())
        .or_else(|| account.mask.clone())
        .unwrap_or_else(|| account.account_id.clone());

    let nickname = match &item.institution_name {
        Some(institution) => format!("{institution} {display_name}"),
        None => display_name.clone(),
    };

    AccountRecord {
        institution: item.institution_name.clone(),
        display_name,
        nickname,
        mask: account.mask.clone(),
        account_type: account.account_type.clone(),
        subtype: account.subtype.clone(),
        balances: account.balances.clone().unwrap_or_else(|| json!({})),
        liability: liabilities.get(&account.account_id).cloned(),
    }
}

fn reshape_transaction(
    transaction: &SourceTransaction,
    item: &Item,
    nicknames: &HashMap<&str, &str>,
) -> TransactionRecord {
    let name = transaction
        .name
        .clone()
        .or_else(|| transaction.merchant_name.clone())
        .or_else(|| transaction.payee.clone())
        .unwrap_or_else(|| "Unknown".to_owned());

    TransactionRecord {
        date: transaction.date.clone(),
        name,
        // The source reports money leaving the account as positive; the
        // dashboard wants credits positive and debits negative.
        amount: -transaction.amount,
        category: transaction.category.clone().unwrap_or_default(),
        institution: item.institution_name.clone(),
        account: nicknames
            .get(transaction.account_id.as_str())
            .map(|nickname| (*nickname).to_owned()),
    }
}
