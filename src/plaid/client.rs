//! The production HTTPS client for the aggregation API.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::{
    Error,
    plaid::{
        AggregationApi, AssetReportHandle, ExchangedToken, LiabilityRecords, RecurringStreams,
        SourceAccount, SyncPage, TransactionsPage,
    },
};

/// Connection settings for the aggregation API.
#[derive(Debug, Clone)]
pub struct PlaidConfig {
    /// The base URL of the API environment, e.g. the sandbox.
    pub base_url: String,
    /// The client ID injected into every request body.
    pub client_id: String,
    /// The API secret injected into every request body.
    pub secret: String,
    /// The products requested when creating a link token.
    pub products: Vec<String>,
    /// The country codes requested when creating a link token.
    pub country_codes: Vec<String>,
}

/// Forwards [AggregationApi] operations to the real API over HTTPS.
///
/// Every operation is a JSON POST with the client credentials added to the
/// request body, which is the source's authentication convention.
#[derive(Debug, Clone)]
pub struct PlaidClient {
    client: reqwest::Client,
    config: PlaidConfig,
}

impl PlaidClient {
    /// Create a new client for the given API environment.
    pub fn new(config: PlaidConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn authenticate(&self, mut body: Value) -> Value {
        if let Value::Object(fields) = &mut body {
            fields.insert(
                "client_id".to_owned(),
                Value::String(self.config.client_id.clone()),
            );
            fields.insert(
                "secret".to_owned(),
                Value::String(self.config.secret.clone()),
            );
        }

        body
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, Error> {
        let response = self
            .client
            .post(self.endpoint_url(path))
            .json(&self.authenticate(body))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("{path} returned HTTP {status}: {body}")));
        }

        Ok(response.json().await?)
    }

    async fn post_bytes(&self, path: &str, body: Value) -> Result<Vec<u8>, Error> {
        let response = self
            .client
            .post(self.endpoint_url(path))
            .json(&self.authenticate(body))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("{path} returned HTTP {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Pull `key` out of a response body and deserialize it.
fn take_field<T: DeserializeOwned>(mut response: Value, key: &str) -> Result<T, Error> {
    let field = response
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| Error::Upstream(format!("response is missing the field \"{key}\"")))?;

    serde_json::from_value(field)
        .map_err(|error| Error::Upstream(format!("could not parse the field \"{key}\": {error}")))
}

#[async_trait]
impl AggregationApi for PlaidClient {
    async fn create_link_token(&self) -> Result<String, Error> {
        let response = self
            .post(
                "/link/token/create",
                json!({
                    "client_name": "ledgerlink",
                    "user": { "client_user_id": "ledgerlink" },
                    "language": "en",
                    "products": self.config.products,
                    "country_codes": self.config.country_codes,
                }),
            )
            .await?;

        take_field(response, "link_token")
    }

    async fn create_update_link_token(&self, access_token: &str) -> Result<String, Error> {
        let response = self
            .post(
                "/link/token/create",
                json!({
                    "client_name": "ledgerlink",
                    "user": { "client_user_id": "ledgerlink" },
                    "language": "en",
                    "country_codes": self.config.country_codes,
                    "access_token": access_token,
                }),
            )
            .await?;

        take_field(response, "link_token")
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<ExchangedToken, Error> {
        let response = self
            .post(
                "/item/public_token/exchange",
                json!({ "public_token": public_token }),
            )
            .await?;

        serde_json::from_value(response)
            .map_err(|error| Error::Upstream(format!("could not parse the exchange: {error}")))
    }

    async fn accounts_with_balances(
        &self,
        access_token: &str,
    ) -> Result<Vec<SourceAccount>, Error> {
        let response = self
            .post("/accounts/balance/get", json!({ "access_token": access_token }))
            .await?;

        take_field(response, "accounts")
    }

    async fn accounts(&self, access_token: &str) -> Result<Vec<SourceAccount>, Error> {
        let response = self
            .post("/accounts/get", json!({ "access_token": access_token }))
            .await?;

        take_field(response, "accounts")
    }

    async fn liabilities(&self, access_token: &str) -> Result<LiabilityRecords, Error> {
        let response = self
            .post("/liabilities/get", json!({ "access_token": access_token }))
            .await?;

        take_field(response, "liabilities")
    }

    async fn transactions_page(
        &self,
        access_token: &str,
        start_date: &str,
        end_date: &str,
        count: usize,
        offset: usize,
    ) -> Result<TransactionsPage, Error> {
        let response = self
            .post(
                "/transactions/get",
                json!({
                    "access_token": access_token,
                    "start_date": start_date,
                    "end_date": end_date,
                    "options": { "count": count, "offset": offset },
                }),
            )
            .await?;

        let total = take_field(response.clone(), "total_transactions")?;
        let transactions = take_field(response, "transactions")?;

        Ok(TransactionsPage {
            transactions,
            total,
        })
    }

    async fn transactions_sync(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<SyncPage, Error> {
        let mut body = json!({ "access_token": access_token });
        if let (Value::Object(fields), Some(cursor)) = (&mut body, cursor) {
            fields.insert("cursor".to_owned(), Value::String(cursor.to_owned()));
        }

        let response = self.post("/transactions/sync", body).await?;

        serde_json::from_value(response)
            .map_err(|error| Error::Upstream(format!("could not parse the sync page: {error}")))
    }

    async fn transactions_refresh(&self, access_token: &str) -> Result<(), Error> {
        self.post("/transactions/refresh", json!({ "access_token": access_token }))
            .await?;

        Ok(())
    }

    async fn recurring_transactions(
        &self,
        access_token: &str,
        account_ids: &[String],
    ) -> Result<RecurringStreams, Error> {
        let response = self
            .post(
                "/transactions/recurring/get",
                json!({ "access_token": access_token, "account_ids": account_ids }),
            )
            .await?;

        serde_json::from_value(response).map_err(|error| {
            Error::Upstream(format!("could not parse the recurring streams: {error}"))
        })
    }

    async fn create_asset_report(
        &self,
        access_tokens: &[String],
        days_requested: u32,
    ) -> Result<AssetReportHandle, Error> {
        let response = self
            .post(
                "/asset_report/create",
                json!({ "access_tokens": access_tokens, "days_requested": days_requested }),
            )
            .await?;

        serde_json::from_value(response).map_err(|error| {
            Error::Upstream(format!("could not parse the asset report handle: {error}"))
        })
    }

    async fn asset_report(&self, asset_report_token: &str) -> Result<Value, Error> {
        self.post(
            "/asset_report/get",
            json!({ "asset_report_token": asset_report_token }),
        )
        .await
    }

    async fn remove_asset_report(&self, asset_report_token: &str) -> Result<(), Error> {
        self.post(
            "/asset_report/remove",
            json!({ "asset_report_token": asset_report_token }),
        )
        .await?;

        Ok(())
    }

    async fn asset_report_pdf(&self, asset_report_token: &str) -> Result<Vec<u8>, Error> {
        self.post_bytes(
            "/asset_report/pdf",
            json!({ "asset_report_token": asset_report_token }),
        )
        .await
    }

    async fn enrich_transactions(
        &self,
        account_type: &str,
        transactions: Vec<Value>,
    ) -> Result<Value, Error> {
        self.post(
            "/transactions/enrich",
            json!({ "account_type": account_type, "transactions": transactions }),
        )
        .await
    }
}
