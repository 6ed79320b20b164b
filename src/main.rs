// UpDown Parimutuel Prediction Engine - Main Entry Point

use axum::{
    routing::{get, post},
    Router,
};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::error;
use tracing_subscriber::EnvFilter;

use updown_engine::app_state::{AppState, SharedState};
use updown_engine::handlers::*;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("\n═══════════════════════════════════════════════");
    println!("     UpDown Parimutuel Prediction Engine");
    println!("═══════════════════════════════════════════════\n");

    let app_state = match AppState::from_env() {
        Ok(state) => state,
        Err(e) => {
            error!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let state: SharedState = Arc::new(Mutex::new(app_state));

    // Clone state for shutdown handler before moving into router
    let shutdown_state = state.clone();

    let app = Router::new()
        // ===== ENGINE QUERIES =====
        .route("/config", get(get_config).post(update_config))
        .route("/state", get(get_state))
        .route("/round/:epoch", get(get_round))
        .route("/bet/:epoch/:account", get(get_bet))
        .route("/query/permit", post(permit_query))
        // ===== ROUND LIFECYCLE =====
        .route("/genesis", post(start_genesis))
        .route("/bet", post(place_bet))
        .route("/receive", post(receive_tokens))
        .route("/execute", post(execute_round))
        .route("/claim", post(claim))
        .route("/withdraw", post(withdraw))
        .route("/pause", post(pause))
        .route("/unpause", post(unpause))
        // ===== PRIVATE-QUERY AUTH =====
        .route("/viewing_key", post(set_viewing_key))
        .route("/viewing_key/create", post(create_viewing_key))
        .route("/permit/revoke", post(revoke_permit))
        // ===== ORACLE =====
        .route("/oracle/register", post(oracle_register_asset))
        .route("/oracle/feed", post(oracle_feed_price))
        .route("/oracle/config", get(oracle_get_config).post(oracle_update_config))
        .route("/oracle/price", get(oracle_get_price))
        .route("/oracle/feeder", get(oracle_get_feeder))
        // ===== BANK =====
        .route("/balance/:account", get(get_balance))
        .route("/fund", post(fund_account))
        // ===== MISC =====
        .route("/activity", get(get_activity))
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("Listening on http://{}", addr);
    println!("   POST /genesis           - Start the genesis rounds");
    println!("   POST /bet               - Stake on the open round");
    println!("   POST /execute           - Resolve the round in flight");
    println!("   POST /claim             - Claim winnings or refunds");
    println!("   POST /oracle/feed       - Submit prices (feeder only)");
    println!("   GET  /round/:epoch      - Inspect a round");
    println!("   GET  /state             - Engine state\n");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    // Persist state on ctrl-c, then exit
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C handler");

        if let Ok(app_state) = shutdown_state.lock() {
            if let Err(e) = app_state.save_to_disk() {
                error!("failed to save state: {}", e);
            }
        }
        std::process::exit(0);
    });

    axum::serve(listener, app).await.unwrap();
}
