// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use fuo_wallet_server::api::router;
use fuo_wallet_server::config::AppConfig;
use fuo_wallet_server::state::AppState;
use fuo_wallet_server::storage::{Storage, StoragePaths};

#[tokio::main]
async fn main() {
    init_tracing();

    // All required configuration is validated up front; refuse to start
    // with anything missing.
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Configuration error: {error}");
            std::process::exit(1);
        }
    };

    let mut storage = Storage::new(StoragePaths::new(&config.data_dir));
    if let Err(error) = storage.initialize() {
        eprintln!("Failed to initialize storage at {}: {error}", config.data_dir);
        std::process::exit(1);
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");

    let state = match AppState::new(config, storage) {
        Ok(state) => state,
        Err(error) => {
            eprintln!("Failed to initialize application state: {error}");
            std::process::exit(1);
        }
    };

    let app = router(state);

    tracing::info!("FUO Wallet server listening on http://{addr} (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
