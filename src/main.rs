use std::sync::Arc;

use intake_gateway::config::AppConfig;
use intake_gateway::llm::create_provider;
use intake_gateway::pipeline::IntakePipeline;
use intake_gateway::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Arc::new(AppConfig::from_env()?);

    eprintln!("Intake gateway starting");
    eprintln!(
        "  AI analysis:   {}",
        enabled_label(config.openai.is_some())
    );
    eprintln!("  Graph mail:    {}", enabled_label(config.graph.is_some()));
    eprintln!(
        "  Mailchimp:     {}",
        enabled_label(config.mailchimp.is_some())
    );
    eprintln!("  Motion tasks:  {}", enabled_label(config.motion.is_some()));
    eprintln!("  Clio CRM:      {}", enabled_label(config.clio.is_some()));

    let llm = create_provider(config.openai.as_ref());
    let pipeline = Arc::new(IntakePipeline::new(config.clone(), llm.clone()));
    let app = server::router(AppState { pipeline, llm });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Intake gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled (no key)" }
}
