use std::{
    env::{self},
    fs::OpenOptions,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use ledgerlink::{
    AppState, DEFAULT_LOOKBACK_DAYS, PlaidClient, PlaidConfig, build_router, graceful_shutdown,
    initialize_db,
};

/// The dashboard backend server for ledgerlink.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// File path where the dashboard JSON file is written and served from.
    #[arg(long, default_value = "dashboard.json")]
    dashboard_path: PathBuf,

    /// Base URL of the aggregation API environment.
    #[arg(long, default_value = "https://sandbox.plaid.com")]
    plaid_url: String,

    /// How many days of transaction history each dashboard refresh covers.
    #[arg(long, default_value_t = DEFAULT_LOOKBACK_DAYS)]
    lookback_days: i64,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let client_id = env::var("PLAID_CLIENT_ID")
        .expect("The environment variable 'PLAID_CLIENT_ID' must be set");
    let secret =
        env::var("PLAID_SECRET").expect("The environment variable 'PLAID_SECRET' must be set");
    let refresh_secret =
        env::var("REFRESH_SECRET").expect("The environment variable 'REFRESH_SECRET' must be set");

    let conn = Connection::open(&args.db_path).expect("Could not open the database file.");
    initialize_db(&conn).expect("Could not initialize the database schema.");
    let conn = Arc::new(Mutex::new(conn));

    let client = PlaidClient::new(PlaidConfig {
        base_url: args.plaid_url,
        client_id,
        secret,
        products: vec!["transactions".to_owned(), "liabilities".to_owned()],
        country_codes: vec!["US".to_owned()],
    });

    let app_state = AppState::new(
        client,
        conn,
        args.dashboard_path,
        &refresh_secret,
        args.lookback_days,
    );

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(app_state));

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("Could not start the server.");
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
