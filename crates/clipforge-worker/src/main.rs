//! Pipeline worker binary.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clipforge_worker::{JobExecutor, WorkerConfig, WorkerContext};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS-backed clients)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing: JSON in deployments, ANSI locally
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);
    let env_filter = EnvFilter::from_default_env().add_directive("clipforge=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true))
            .with(env_filter)
            .init();
    }

    info!("Starting clipforge-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let ctx = match WorkerContext::new(config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Failed to create worker context: {}", e);
            std::process::exit(1);
        }
    };

    let executor = std::sync::Arc::new(JobExecutor::new(ctx));

    // Ctrl-C triggers a graceful drain
    let shutdown_executor = std::sync::Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_executor.shutdown();
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
