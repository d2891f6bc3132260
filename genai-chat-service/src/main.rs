use dotenvy::dotenv;
use genai_chat_service::config::ChatConfig;
use genai_chat_service::services::metrics;
use genai_chat_service::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before anything reads the environment
    dotenv().ok();

    let otlp_endpoint = std::env::var("OTLP_ENDPOINT").ok();
    init_tracing("genai-chat-service", "info", otlp_endpoint.as_deref());

    // Refuse to start without a usable credential
    let config = ChatConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    metrics::init_metrics();

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        anyhow::anyhow!("Startup error: {}", e)
    })?;

    app.run_until_stopped().await?;

    tracing::info!("genai-chat-service stopped");
    Ok(())
}
