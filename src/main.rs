use octosync::api::server::start_server;
use octosync::api::AppState;
use octosync::config::Config;
use octosync::services::{ClientCache, TokenCipher};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config = Config::from_env()?;

    let db = octosync::db::initialize(&config.db_path)
        .await
        .map_err(|e| format!("Database initialization failed: {}", e))?;

    let cipher = TokenCipher::new(&config.token_key).map_err(|e| e.to_string())?;
    let clients = Arc::new(ClientCache::new(
        db.clone(),
        cipher,
        config.github_api.clone(),
    ));

    let state = AppState { db, clients };
    let server = start_server(state, config.port)
        .await
        .map_err(|e| e.to_string())?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for shutdown signal: {}", e))?;

    log::info!("Shutting down");
    server.shutdown().await;
    Ok(())
}
