//! Defines the app's routes and request handlers.

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    account::{list_accounts_endpoint, list_balances_endpoint, list_liabilities_endpoint},
    assets::{
        asset_report_pdf_endpoint, create_asset_report_endpoint, get_asset_report_endpoint,
        remove_asset_report_endpoint,
    },
    dashboard::{refresh_dashboard_endpoint, serve_dashboard_endpoint},
    endpoints,
    enrich::enrich_transactions_endpoint,
    item::{
        create_link_token_endpoint, create_update_link_token_endpoint,
        exchange_public_token_endpoint, list_items_endpoint,
    },
    plaid::AggregationApi,
    recurring::list_recurring_endpoint,
    state::AppState,
    sync::{refresh_transactions_endpoint, sync_all_endpoint, sync_item_endpoint},
};

/// Create a router for the app's API.
pub fn build_router<C>(state: AppState<C>) -> Router
where
    C: AggregationApi + Clone + 'static,
{
    Router::new()
        .route(endpoints::CREATE_LINK_TOKEN, post(create_link_token_endpoint::<C>))
        .route(
            endpoints::CREATE_UPDATE_LINK_TOKEN,
            post(create_update_link_token_endpoint::<C>),
        )
        .route(
            endpoints::EXCHANGE_PUBLIC_TOKEN,
            post(exchange_public_token_endpoint::<C>),
        )
        .route(endpoints::ITEMS, get(list_items_endpoint))
        .route(endpoints::SYNC_ITEM, post(sync_item_endpoint::<C>))
        .route(endpoints::SYNC_ALL, post(sync_all_endpoint::<C>))
        .route(
            endpoints::REFRESH_TRANSACTIONS,
            post(refresh_transactions_endpoint::<C>),
        )
        .route(endpoints::RECURRING, get(list_recurring_endpoint::<C>))
        .route(endpoints::ACCOUNTS, get(list_accounts_endpoint::<C>))
        .route(endpoints::BALANCES, get(list_balances_endpoint::<C>))
        .route(endpoints::LIABILITIES, get(list_liabilities_endpoint::<C>))
        .route(endpoints::ASSET_REPORT, post(create_asset_report_endpoint::<C>))
        .route(
            endpoints::ASSET_REPORT_TOKEN,
            get(get_asset_report_endpoint::<C>).delete(remove_asset_report_endpoint::<C>),
        )
        .route(endpoints::ASSET_REPORT_PDF, get(asset_report_pdf_endpoint::<C>))
        .route(endpoints::ENRICH, post(enrich_transactions_endpoint::<C>))
        .route(endpoints::DASHBOARD_JSON, get(serve_dashboard_endpoint::<C>))
        .route(
            endpoints::DASHBOARD_REFRESH,
            post(refresh_dashboard_endpoint::<C>),
        )
        .with_state(state)
}
