use std::sync::Arc;

use anyhow::{Context, Result};
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use pos_orderservice::{
    app_state::AppState, bootstrap, config::AppConfig, db, gateway::SquareGateway, routes,
    store::PgStore,
};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_env();
    bootstrap::init_tracing();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let pool = db::create_pool(&config.database).await?;
    let gateway = SquareGateway::new(&config.gateway).context("Failed to build Square client")?;
    tracing::info!(base_url = %config.gateway.base_url, "Square gateway configured");

    let port = config.port;
    let state = AppState::new(config, Arc::new(PgStore::new(pool)), Arc::new(gateway));

    tracing::info!("Bootstrapping...");
    bootstrap::serve("OrderService", routes::app(state), port).await
}
