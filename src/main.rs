use std::sync::Arc;

use futures::StreamExt;

use matchpoint::channels::{Messenger, TelegramApi};
use matchpoint::config::BotConfig;
use matchpoint::flow::Engine;
use matchpoint::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export MATCHPOINT_BOT_TOKEN=123456:ABC-...");
        std::process::exit(1);
    });

    eprintln!("🎾 matchpoint v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path);

    // ── Database ─────────────────────────────────────────────────────
    let db_path = std::path::Path::new(&config.db_path);
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(db_path).await.unwrap_or_else(
        |e| {
            eprintln!("Error: Failed to open database at {}: {e}", config.db_path);
            std::process::exit(1);
        },
    ));

    // ── Telegram channel ─────────────────────────────────────────────
    let api = TelegramApi::new(config.bot_token.clone(), config.poll_timeout_secs);
    let bot_username = api.get_me().await.unwrap_or_else(|e| {
        eprintln!("Error: Telegram token check failed: {e}");
        std::process::exit(1);
    });
    eprintln!("   Bot: @{bot_username}");

    let mut updates = api.start();
    let messenger: Arc<dyn Messenger> = Arc::new(api);
    let engine = Arc::new(Engine::new(db, messenger));

    // One task per event: users never contend with each other, and a slow
    // store call for one user must not stall the poll loop.
    while let Some(event) = updates.next().await {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine.handle_event(event).await;
        });
    }

    tracing::info!("Update stream ended; shutting down");
    Ok(())
}
