//! Transcription service binary: loads configuration, builds the shared
//! model bundle, and runs the streaming WebSocket endpoint.

use std::process::ExitCode;
use transcription_service::{models, registry::SessionRegistry, settings::Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env();
    tracing::info!(
        host = %settings.host,
        port = settings.port,
        asr_engine = ?settings.asr_engine,
        "starting transcription service"
    );

    let models = match models::init_models(&settings).await {
        Ok(models) => models,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize models");
            return ExitCode::FAILURE;
        }
    };

    let settings = std::sync::Arc::new(settings);
    let registry = SessionRegistry::new(models, settings.clone());
    registry.start().await;

    let addr = format!("{}:{}", settings.host, settings.port);
    if let Err(e) = transcription_service::server::start_stream_server(&addr, registry).await {
        tracing::error!(error = %e, "streaming server exited with an error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
