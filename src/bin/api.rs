use intent_chatbot::{
    api::start_server,
    chat_log::ChatLog,
    config::AppConfig,
    conversational::Chatbot,
    intents::IntentCatalog,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    info!("🤖 Intent Chatbot - API Server");
    info!("📍 Port: {}", config.port);

    // Catalog and model are fixed for the lifetime of the process
    let catalog = IntentCatalog::load(&config.intents_path)?;
    let chatbot = Arc::new(Chatbot::train_with_config(catalog, &config.classifier)?);

    let chat_log = ChatLog::new(&config.chat_log_path);
    chat_log.ensure_exists()?;

    info!("✅ Chatbot trained");
    info!("📡 Starting API server...");

    start_server(chatbot, chat_log, config.port).await?;

    Ok(())
}
