//! Assistant relay - streams an LLM tool-use loop to a chat client
//!
//! The client posts commands plus its conversation state; the server runs
//! the model until it answers without calling tools and streams text, tool
//! calls, tool results and the updated state back over SSE.

mod api;
mod config;
mod conversation;
mod llm;
mod runtime;
mod tools;

use api::{cors_layer, create_router, AppState};
use config::Settings;
use llm::{AnthropicService, LlmService, LoggingService, OfflineService};
use runtime::{LlmClient, LoopConfig, ServiceLlmClient, ToolExecutor, ToolRegistryExecutor, TurnLoop};
use std::sync::Arc;
use tools::ToolRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();
    let settings = Settings::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    // Initialize the model client
    let service: Arc<dyn LlmService> = match &settings.anthropic_api_key {
        Some(key) => Arc::new(AnthropicService::new(
            key.clone(),
            settings.anthropic_model.clone(),
            settings.anthropic_base_url.as_deref(),
        )?),
        None => {
            tracing::warn!("ANTHROPIC_API_KEY is not set; replying with a fixed notice");
            Arc::new(OfflineService)
        }
    };
    let service: Arc<dyn LlmService> = Arc::new(LoggingService::new(service));

    let registry = ToolRegistry::standard();
    let llm: Arc<dyn LlmClient> = Arc::new(ServiceLlmClient::new(service));
    let tools: Arc<dyn ToolExecutor> = Arc::new(ToolRegistryExecutor::new(registry));
    let config = LoopConfig {
        max_iterations: settings.max_tool_iterations,
        max_tokens: settings.max_tokens,
    };

    tracing::info!(
        model = %settings.anthropic_model,
        tools = ?tools.definitions().iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
        max_iterations = config.max_iterations,
        "Turn loop initialized"
    );

    // Create router
    let state = AppState::new(TurnLoop::new(llm, tools, config));
    let app = create_router(state).layer(cors_layer(&settings));

    // Start server
    let addr = settings.bind_addr();
    tracing::info!("Assistant relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
