mod collab;
mod config;
mod notify;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::info;

use rewards_core::RewardsService;
use rewards_types::AdminRole;

use crate::collab::ChatApi;
use crate::config::Config;
use crate::routes::SharedService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rewards=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(rewards_db::Database::open(&PathBuf::from(&config.db_path))?);

    // Seed default owners
    for owner_id in &config.default_owners {
        db.upsert_admin(*owner_id, AdminRole::Owner)?;
    }
    if !config.default_owners.is_empty() {
        info!("Seeded {} default owners", config.default_owners.len());
    }

    // Collaborators: one chat-platform client serves as both the membership
    // oracle and the messaging sink.
    let chat = Arc::new(ChatApi::new(config.chat_api_url.clone()));

    let service: SharedService = Arc::new(RewardsService::new(
        db,
        chat.clone(),
        chat.clone(),
        config.required_channels.clone(),
        Duration::from_millis(config.oracle_timeout_ms),
    ));

    // Periodic notification task
    if let Some(channel) = config.notify_channel.clone() {
        tokio::spawn(notify::run_notify_loop(
            service.clone(),
            chat,
            channel,
            config.notify_interval_secs,
        ));
    }

    // Routes map one-to-one onto the core operations.
    let app = Router::new()
        .route("/start", post(routes::start))
        .route("/verify", post(routes::verify))
        .route("/claim", post(routes::claim))
        .route("/keys/generate", post(routes::generate_keys))
        .route("/ban", post(routes::ban))
        .route("/unban", post(routes::unban))
        .route("/addowner", post(routes::add_owner))
        .route("/referral", post(routes::referral))
        .route("/users", get(routes::list_users))
        .route("/users/{user_id}", get(routes::account_info))
        .layer(TraceLayer::new_for_http())
        .with_state(service);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Rewards bot listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
