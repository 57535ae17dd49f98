//! Defines the endpoint that exchanges a public token for item credentials.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{Error, item::{LinkState, insert_item}, plaid::AggregationApi};

/// The request body for exchanging a public token.
#[derive(Debug, Deserialize)]
pub struct ExchangeTokenRequest {
    /// The short-lived token produced by the browser link flow.
    pub public_token: Option<String>,
    /// The institution name from the link metadata, kept for display.
    pub institution_name: Option<String>,
}

/// A route handler that exchanges a public token and stores the new item.
///
/// Exchanging a token for an item that is already linked is silently
/// ignored, so retrying the link flow cannot clobber a stored credential.
pub async fn exchange_public_token_endpoint<C>(
    State(state): State<LinkState<C>>,
    Json(request): Json<ExchangeTokenRequest>,
) -> Result<Json<Value>, Error>
where
    C: AggregationApi + Clone,
{
    let public_token = request
        .public_token
        .ok_or(Error::MissingField("public_token"))?;

    let exchanged = state.client.exchange_public_token(&public_token).await?;

    {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        insert_item(
            &connection,
            &exchanged.item_id,
            &exchanged.access_token,
            request.institution_name.as_deref(),
        )?;
    }

    tracing::info!("linked item {}", exchanged.item_id);

    Ok(Json(json!({ "item_id": exchanged.item_id })))
}

#[cfg(test)]
mod exchange_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, extract::State};

    use crate::{
        Error,
        item::{LinkState, list_items},
        test_utils::{FakeApi, get_test_connection},
    };

    use super::{ExchangeTokenRequest, exchange_public_token_endpoint};

    fn get_test_state() -> LinkState<FakeApi> {
        LinkState {
            client: FakeApi::default(),
            db_connection: Arc::new(Mutex::new(get_test_connection())),
        }
    }

    #[tokio::test]
    async fn exchange_requires_public_token() {
        let state = get_test_state();

        let result = exchange_public_token_endpoint(
            State(state),
            Json(ExchangeTokenRequest {
                public_token: None,
                institution_name: None,
            }),
        )
        .await;

        assert!(matches!(result, Err(Error::MissingField("public_token"))));
    }

    #[tokio::test]
    async fn exchange_stores_the_new_item() {
        let state = get_test_state();

        let Json(body) = exchange_public_token_endpoint(
            State(state.clone()),
            Json(ExchangeTokenRequest {
                public_token: Some("public-1".to_owned()),
                institution_name: Some("Test Bank".to_owned()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(body["item_id"], "item-public-1");

        let connection = state.db_connection.lock().unwrap();
        let items = list_items(&connection).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].access_token, "access-public-1");
        assert_eq!(items[0].institution_name.as_deref(), Some("Test Bank"));
    }

    #[tokio::test]
    async fn repeated_exchange_does_not_duplicate_the_item() {
        let state = get_test_state();
        let request = || {
            Json(ExchangeTokenRequest {
                public_token: Some("public-1".to_owned()),
                institution_name: Some("Test Bank".to_owned()),
            })
        };

        exchange_public_token_endpoint(State(state.clone()), request())
            .await
            .unwrap();
        exchange_public_token_endpoint(State(state.clone()), request())
            .await
            .unwrap();

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(list_items(&connection).unwrap().len(), 1);
    }
}
