mod app;
mod client_ip;
mod config;
mod db_migrations;
mod db_sqlx;
mod db_users;
mod error;
mod routes;
mod services;
mod state;

extern crate self as sqlx;
pub use crate::db_sqlx::{Sqlite, SqlitePool, query, query_as, query_scalar, sqlite};

use std::net::SocketAddr;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::state::{AdminList, AppState, TrustedProxies};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let database_url = config::database_url();
    let connect_options = match SqliteConnectOptions::from_str(&database_url) {
        Ok(options) => options.create_if_missing(true),
        Err(e) => {
            tracing::error!(error = %e, %database_url, "invalid DATABASE_URL");
            return;
        }
    };
    let db_max_connections = config::db_max_connections();
    tracing::info!(db_max_connections, %database_url, "Opening SQLite database...");
    let db = match SqlitePoolOptions::new()
        .max_connections(db_max_connections)
        .connect_with(connect_options)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to open SQLite database");
            return;
        }
    };
    match db_migrations::run(&db).await {
        Ok(migrations) => tracing::info!(migrations, "Database ready and migrations applied"),
        Err(e) => {
            tracing::error!(error = %e, "failed to run migrations");
            return;
        }
    }

    let admins = AdminList::new(config::admin_ips());
    if admins.is_empty() {
        tracing::warn!("OSIRIS_ADMIN_IPS is empty; roster clear is disabled");
    }
    let proxies = TrustedProxies::new(config::trusted_proxies());
    if proxies.is_empty() {
        tracing::info!("OSIRIS_TRUSTED_PROXIES is empty; X-Forwarded-For is ignored");
    }
    let state = AppState::new(db, admins).with_trusted_proxies(proxies);

    tokio::spawn(services::poi_loader::run(state.clone(), config::poi_path()));

    let app = app::build_app(state);

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!("OSiris server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
