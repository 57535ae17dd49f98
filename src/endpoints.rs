//! The API endpoint URIs.

/// The route for creating a link token for linking a new institution.
pub const CREATE_LINK_TOKEN: &str = "/api/link_token";
/// The route for creating a link token that repairs an existing item.
pub const CREATE_UPDATE_LINK_TOKEN: &str = "/api/link_token/update";
/// The route for exchanging a public token for item credentials.
pub const EXCHANGE_PUBLIC_TOKEN: &str = "/api/exchange_public_token";
/// The route for listing the linked items.
pub const ITEMS: &str = "/api/items";
/// The route for syncing the transactions of a single item.
pub const SYNC_ITEM: &str = "/api/items/{item_id}/sync";
/// The route for syncing the transactions of every linked item.
pub const SYNC_ALL: &str = "/api/sync";
/// The route for asking the source for a fresh transaction pull on every item.
pub const REFRESH_TRANSACTIONS: &str = "/api/refresh";
/// The route for listing recurring transaction streams per item.
pub const RECURRING: &str = "/api/recurring";
/// The route for listing accounts per item.
pub const ACCOUNTS: &str = "/api/accounts";
/// The route for listing accounts with balances per item.
pub const BALANCES: &str = "/api/balances";
/// The route for listing liabilities per item.
pub const LIABILITIES: &str = "/api/liabilities";
/// The route for creating an asset report over every linked item.
pub const ASSET_REPORT: &str = "/api/asset_report";
/// The route for fetching or removing an asset report.
pub const ASSET_REPORT_TOKEN: &str = "/api/asset_report/{asset_report_token}";
/// The route for fetching an asset report as a PDF.
pub const ASSET_REPORT_PDF: &str = "/api/asset_report/{asset_report_token}/pdf";
/// The route for enriching externally supplied transactions.
pub const ENRICH: &str = "/api/enrich";
/// The route that serves the materialized dashboard file.
pub const DASHBOARD_JSON: &str = "/dashboard.json";
/// The route that rebuilds the dashboard file, guarded by a shared secret.
pub const DASHBOARD_REFRESH: &str = "/api/dashboard/refresh";
