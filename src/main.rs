use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use research_catalog::config::{redact_database_url, CatalogConfig};
use research_catalog::store::{AttachmentFilter, DatasetFilter};
use research_catalog::{CatalogManager, DatabaseManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "research_catalog=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting research catalog v{}", env!("CARGO_PKG_VERSION"));

    let config = CatalogConfig::from_env().context("Failed to load configuration")?;
    let database_url = config.require_database_url()?;

    info!("Configuration loaded:");
    info!("  Database URL: {}", redact_database_url(database_url));
    info!("  Pool size: {}", config.pool_size);
    info!("  Password minimum length: {}", config.password_min_length);
    info!("  Password hash iterations: {}", config.password_iterations);

    let database = DatabaseManager::with_pool_size(database_url, config.pool_size)
        .await
        .context("Failed to initialize catalog database")?;
    info!("Catalog schema is up to date");

    let manager = CatalogManager::from_config(Arc::new(database), &config);

    let accounts = manager.list_accounts().await?;
    let datasets = manager.list_datasets(DatasetFilter::default()).await?;
    let analyses = manager.list_analyses(AttachmentFilter::default()).await?;
    let visualizations = manager
        .list_visualizations(AttachmentFilter::default())
        .await?;

    info!(
        "Catalog holds {} accounts, {} datasets, {} analyses, {} visualizations",
        accounts.len(),
        datasets.len(),
        analyses.len(),
        visualizations.len()
    );

    Ok(())
}
