//! Defines the endpoints that create link tokens for the browser client.

use std::sync::{Arc, Mutex};

use axum::{Json, extract::{FromRef, State}};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, Error, item::get_item, plaid::AggregationApi};

/// The state needed to create link tokens.
#[derive(Debug, Clone)]
pub struct LinkState<C> {
    /// The facade over the financial data aggregation API.
    pub client: C,
    /// The database connection for looking up linked items.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl<C> FromRef<AppState<C>> for LinkState<C>
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

/// A route handler for creating a link token for linking a new institution.
pub async fn create_link_token_endpoint<C>(
    State(state): State<LinkState<C>>,
) -> Result<Json<Value>, Error>
where
    C: AggregationApi + Clone,
{
    let link_token = state.client.create_link_token().await?;

    Ok(Json(json!({ "link_token": link_token })))
}

/// The request body for creating an update-mode link token.
#[derive(Debug, Deserialize)]
pub struct UpdateLinkTokenRequest {
    /// The item to put into update mode.
    pub item_id: Option<String>,
}

/// A route handler for creating a link token that repairs an existing item.
pub async fn create_update_link_token_endpoint<C>(
    State(state): State<LinkState<C>>,
    Json(request): Json<UpdateLinkTokenRequest>,
) -> Result<Json<Value>, Error>
where
    C: AggregationApi + Clone,
{
    let item_id = request.item_id.ok_or(Error::MissingField("item_id"))?;

    let item = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        get_item(&connection, &item_id)?
    };

    let link_token = state.client.create_update_link_token(&item.access_token).await?;

    Ok(Json(json!({ "link_token": link_token })))
}

#[cfg(test)]
mod link_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, extract::State};

    use crate::{
        Error,
        item::insert_item,
        test_utils::{FakeApi, get_test_connection},
    };

    use super::{LinkState, UpdateLinkTokenRequest, create_link_token_endpoint,
        create_update_link_token_endpoint};

    fn get_test_state() -> LinkState<FakeApi> {
        LinkState {
            client: FakeApi::default(),
            db_connection: Arc::new(Mutex::new(get_test_connection())),
        }
    }

    #[tokio::test]
    async fn create_link_token_returns_token() {
        let state = get_test_state();

        let Json(body) = create_link_token_endpoint(State(state)).await.unwrap();

        assert!(body["link_token"].is_string());
    }

    #[tokio::test]
    async fn update_link_token_requires_item_id() {
        let state = get_test_state();

        let result = create_update_link_token_endpoint(
            State(state),
            Json(UpdateLinkTokenRequest { item_id: None }),
        )
        .await;

        assert!(matches!(result, Err(Error::MissingField("item_id"))));
    }

    #[tokio::test]
    async fn update_link_token_rejects_unknown_item() {
        let state = get_test_state();

        let result = create_update_link_token_endpoint(
            State(state),
            Json(UpdateLinkTokenRequest {
                item_id: Some("item-404".to_owned()),
            }),
        )
        .await;

        assert!(matches!(result, Err(Error::UnknownItem(_))));
    }

    #[tokio::test]
    async fn update_link_token_uses_the_stored_credential() {
        let state = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            insert_item(&connection, "item-1", "access-1", Some("Test Bank")).unwrap();
        }

        let Json(body) = create_update_link_token_endpoint(
            State(state),
            Json(UpdateLinkTokenRequest {
                item_id: Some("item-1".to_owned()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(body["link_token"], "link-update-access-1");
    }
}
