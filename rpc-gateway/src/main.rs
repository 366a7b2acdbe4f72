use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use splitledger_core::{Metrics, Registry};
use splitledger_gateway::{config::Config, handlers, AppState, Dispatcher};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }

    info!("Starting splitledger...");

    let metrics = Metrics::new().context("Failed to register metrics")?;

    let registry = Registry::load(&config.ledger, Some(metrics.clone())).with_context(|| {
        format!(
            "Failed to load datastores from {}",
            config.ledger.datastores_dir.display()
        )
    })?;
    info!(tenants = registry.len(), "Datastores loaded");

    let state = web::Data::new(AppState {
        dispatcher: Arc::new(Dispatcher::new(Arc::new(registry))),
        metrics,
    });

    let server_config = config.server.clone();
    info!(
        "Starting HTTP server on {}:{}",
        server_config.host, server_config.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(handlers::cors())
            .wrap(middleware::Logger::default())
            .configure(handlers::configure_routes)
    })
    .workers(server_config.workers)
    .bind((server_config.host, server_config.port))?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
