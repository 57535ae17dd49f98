//! A canned [AggregationApi] implementation and fixtures shared by the
//! endpoint and snapshot tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::{
    Error,
    item::Item,
    plaid::{
        AggregationApi, AssetReportHandle, ExchangedToken, LiabilityRecords, RecurringStreams,
        SourceAccount, SourceTransaction, SyncPage, TransactionsPage,
    },
};

/// Create an in-memory database with the application schema applied.
pub fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("could not create in-memory SQLite database");
    crate::db::initialize(&connection).expect("could not initialize database schema");
    connection
}

/// A linked item with predictable credentials.
pub fn get_test_item() -> Item {
    Item {
        item_id: "item-1".to_owned(),
        access_token: "access-1".to_owned(),
        institution_name: Some("Test Bank".to_owned()),
        created_at: OffsetDateTime::now_utc(),
    }
}

/// A checking account with every optional field populated.
pub fn checking_account(account_id: &str) -> SourceAccount {
    SourceAccount {
        account_id: account_id.to_owned(),
        name: Some("Everyday Checking".to_owned()),
        official_name: Some("Everyday Checking Plus".to_owned()),
        mask: Some("1234".to_owned()),
        account_type: Some("depository".to_owned()),
        subtype: Some("checking".to_owned()),
        balances: Some(json!({ "available": 100.0, "current": 110.0 })),
    }
}

/// A small debit posted to the account "acc-1".
pub fn coffee_transaction(transaction_id: &str) -> SourceTransaction {
    SourceTransaction {
        transaction_id: transaction_id.to_owned(),
        account_id: "acc-1".to_owned(),
        amount: 4.5,
        date: "2025-06-01".to_owned(),
        name: Some("Coffee Collective".to_owned()),
        merchant_name: Some("Coffee Collective".to_owned()),
        payee: None,
        category: Some(vec!["Food and Drink".to_owned(), "Coffee".to_owned()]),
    }
}

/// A canned aggregation API for testing handlers and the snapshot builder.
///
/// Failure switches make the named operation return [Error::Upstream], the
/// `*_for` variants only for a matching access token. Sync responses come
/// from a queue shared across clones; once the queue is drained the fake
/// behaves like a caught-up source that echoes the request cursor.
#[derive(Debug, Clone, Default)]
pub struct FakeApi {
    accounts: Vec<SourceAccount>,
    transactions: Vec<SourceTransaction>,
    credit_liabilities: Vec<Value>,
    sync_pages: Arc<Mutex<VecDeque<SyncPage>>>,
    page_requests: Arc<Mutex<usize>>,
    fail_balances: bool,
    fail_accounts: bool,
    fail_accounts_for: Option<String>,
    fail_liabilities: bool,
    fail_transactions_at_offset: Option<usize>,
    transaction_total_override: Option<usize>,
    fail_sync_for: Option<String>,
    fail_refresh_for: Option<String>,
}

impl FakeApi {
    /// Set the accounts served by both account operations.
    pub fn with_accounts(mut self, accounts: Vec<SourceAccount>) -> Self {
        self.accounts = accounts;
        self
    }

    /// Set the transaction history served page by page.
    pub fn with_transactions(mut self, transactions: Vec<SourceTransaction>) -> Self {
        self.transactions = transactions;
        self
    }

    /// Make the accounts-with-balances operation fail.
    pub fn with_balances_failure(mut self) -> Self {
        self.fail_balances = true;
        self
    }

    /// Make the plain accounts operation fail for every item.
    pub fn with_accounts_failure(mut self) -> Self {
        self.fail_accounts = true;
        self
    }

    /// Make the account operations fail for one access token only.
    pub fn with_accounts_failure_for(mut self, access_token: &str) -> Self {
        self.fail_accounts_for = Some(access_token.to_owned());
        self
    }

    /// Make the liabilities operation fail.
    pub fn with_liabilities_failure(mut self) -> Self {
        self.fail_liabilities = true;
        self
    }

    /// Add a credit liability record.
    pub fn with_credit_liability(mut self, record: Value) -> Self {
        self.credit_liabilities.push(record);
        self
    }

    /// Make transaction page requests fail once the offset reaches `offset`.
    pub fn with_transactions_failure_at_offset(mut self, offset: usize) -> Self {
        self.fail_transactions_at_offset = Some(offset);
        self
    }

    /// Report this total instead of the real transaction count.
    pub fn with_transaction_total_override(mut self, total: usize) -> Self {
        self.transaction_total_override = Some(total);
        self
    }

    /// Queue the pages returned by successive sync calls.
    pub fn with_sync_pages(self, pages: Vec<SyncPage>) -> Self {
        *self.sync_pages.lock().unwrap() = pages.into();
        self
    }

    /// Make sync calls fail for one access token.
    pub fn with_sync_failure_for(mut self, access_token: &str) -> Self {
        self.fail_sync_for = Some(access_token.to_owned());
        self
    }

    /// Make refresh calls fail for one access token.
    pub fn with_refresh_failure_for(mut self, access_token: &str) -> Self {
        self.fail_refresh_for = Some(access_token.to_owned());
        self
    }

    /// How many transaction pages have been requested so far.
    pub fn transaction_page_requests(&self) -> usize {
        *self.page_requests.lock().unwrap()
    }

    fn accounts_failure_matches(&self, access_token: &str) -> bool {
        self.fail_accounts
            || self
                .fail_accounts_for
                .as_deref()
                .is_some_and(|token| token == access_token)
    }
}

#[async_trait]
impl AggregationApi for FakeApi {
    async fn create_link_token(&self) -> Result<String, Error> {
        Ok("link-sandbox-token".to_owned())
    }

    async fn create_update_link_token(&self, access_token: &str) -> Result<String, Error> {
        Ok(format!("link-update-{access_token}"))
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<ExchangedToken, Error> {
        Ok(ExchangedToken {
            access_token: format!("access-{public_token}"),
            item_id: format!("item-{public_token}"),
        })
    }

    async fn accounts_with_balances(
        &self,
        access_token: &str,
    ) -> Result<Vec<SourceAccount>, Error> {
        if self.fail_balances || self.accounts_failure_matches(access_token) {
            return Err(Error::Upstream("balances unavailable".to_owned()));
        }

        Ok(self.accounts.clone())
    }

    async fn accounts(&self, access_token: &str) -> Result<Vec<SourceAccount>, Error> {
        if self.accounts_failure_matches(access_token) {
            return Err(Error::Upstream("accounts unavailable".to_owned()));
        }

        Ok(self.accounts.clone())
    }

    async fn liabilities(&self, _access_token: &str) -> Result<LiabilityRecords, Error> {
        if self.fail_liabilities {
            return Err(Error::Upstream("liabilities unavailable".to_owned()));
        }

        Ok(LiabilityRecords {
            credit: self.credit_liabilities.clone(),
            student: Vec::new(),
            mortgage: Vec::new(),
        })
    }

    async fn transactions_page(
        &self,
        _access_token: &str,
        _start_date: &str,
        _end_date: &str,
        count: usize,
        offset: usize,
    ) -> Result<TransactionsPage, Error> {
        *self.page_requests.lock().unwrap() += 1;

        if self
            .fail_transactions_at_offset
            .is_some_and(|fail_at| offset >= fail_at)
        {
            return Err(Error::Upstream("transactions unavailable".to_owned()));
        }

        let start = offset.min(self.transactions.len());
        let end = (offset + count).min(self.transactions.len());

        Ok(TransactionsPage {
            transactions: self.transactions[start..end].to_vec(),
            total: self
                .transaction_total_override
                .unwrap_or(self.transactions.len()),
        })
    }

    async fn transactions_sync(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<SyncPage, Error> {
        if self
            .fail_sync_for
            .as_deref()
            .is_some_and(|token| token == access_token)
        {
            return Err(Error::Upstream("sync unavailable".to_owned()));
        }

        if let Some(page) = self.sync_pages.lock().unwrap().pop_front() {
            return Ok(page);
        }

        Ok(SyncPage {
            added: Vec::new(),
            modified: Vec::new(),
            removed: Vec::new(),
            next_cursor: cursor.unwrap_or("cursor-0").to_owned(),
            has_more: false,
        })
    }

    async fn transactions_refresh(&self, access_token: &str) -> Result<(), Error> {
        if self
            .fail_refresh_for
            .as_deref()
            .is_some_and(|token| token == access_token)
        {
            return Err(Error::Upstream("refresh unavailable".to_owned()));
        }

        Ok(())
    }

    async fn recurring_transactions(
        &self,
        _access_token: &str,
        _account_ids: &[String],
    ) -> Result<RecurringStreams, Error> {
        Ok(RecurringStreams::default())
    }

    async fn create_asset_report(
        &self,
        _access_tokens: &[String],
        _days_requested: u32,
    ) -> Result<AssetReportHandle, Error> {
        Ok(AssetReportHandle {
            asset_report_token: "assets-sandbox-token".to_owned(),
            asset_report_id: "assets-report-1".to_owned(),
        })
    }

    async fn asset_report(&self, asset_report_token: &str) -> Result<Value, Error> {
        Ok(json!({ "asset_report_token": asset_report_token, "items": [] }))
    }

    async fn remove_asset_report(&self, _asset_report_token: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn asset_report_pdf(&self, _asset_report_token: &str) -> Result<Vec<u8>, Error> {
        Ok(b"%PDF-1.4 fake report".to_vec())
    }

    async fn enrich_transactions(
        &self,
        _account_type: &str,
        transactions: Vec<Value>,
    ) -> Result<Value, Error> {
        Ok(json!({ "enriched_transactions": transactions }))
    }
}
