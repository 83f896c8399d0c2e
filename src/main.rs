use anyhow::Context;
use games_server::api::Api;
use games_server::config_handler::{self, Config};
use games_server::game_store::GameStore;
use games_server::LogResult;
use lazy_static::lazy_static;
use tracing_subscriber::EnvFilter;

lazy_static! {
    pub static ref CONFIG: Config = match config_handler::get_config() {
        Ok(config) => config,
        Err(e) => panic!("[CONFIG] {e:#}"),
    };
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        // Set the RUST_LOG, if it hasn't been explicitly defined
        std::env::set_var("RUST_LOG", "info,tower_http=debug")
    }

    // Configure a custom event formatter
    let format = tracing_subscriber::fmt::format()
        .with_level(true)
        .with_target(false)
        .with_ansi(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .compact();
    tracing_subscriber::fmt()
        .event_format(format)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = GameStore::new(&CONFIG);
    // a broken storage file shouldn't keep the server from starting
    store.write().await.load().await
        .ok_log("[STORE] Failed to load games");

    Api::serve(CONFIG.port, store).await
        .with_context(|| format!("Failed to serve on port {}", CONFIG.port))
}
