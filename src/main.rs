//! chatbridge HTTP server
//!
//! Serves the OpenAI-compatible API and forwards chat requests to the
//! configured downstream agent service.

use chatbridge::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    handlers::{AppState, build_router},
    telemetry,
};
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        let template = generate_config_template();
        match output {
            Some(path) => {
                std::fs::write(&path, template)?;
                eprintln!("Wrote configuration template to {}", path);
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    let config = Config::from_file(&cli.config)?;

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        config_path = %cli.config,
        downstream = %config.downstream.url(),
        timeout_seconds = config.downstream.timeout_seconds(),
        max_attempts = config.retry.max_attempts(),
        "Starting chatbridge on {}:{}",
        config.server.host,
        config.server.port
    );

    let addr = config.server.socket_addr()?;

    let state = AppState::new(Arc::new(config))?;
    let app = build_router(state);

    tracing::info!("Listening on {}", addr);
    tracing::info!("Chat completions at http://{}/v1/chat/completions", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
