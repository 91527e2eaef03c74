use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use backoffice_api::app::{AppServices, build_app};
use backoffice_infra::seed::seed_admin;
use backoffice_infra::{AppConfig, BackofficeStore, InMemoryOutbox, InMemoryStore, PostgresStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    backoffice_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(config = ?config, "starting back office");

    let store: Arc<dyn BackofficeStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url)
                .await
                .context("failed to connect to Postgres")?;
            store.migrate().await.context("failed to run migrations")?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store");
            Arc::new(InMemoryStore::with_sample_locations())
        }
    };

    if let Some(admin) = &config.seed_admin {
        seed_admin(store.as_ref(), admin, Utc::now())
            .await
            .context("failed to seed administrator")?;
    }

    let services = Arc::new(AppServices::from_config(
        &config,
        store,
        Arc::new(InMemoryOutbox::new()),
    ));
    let app = build_app(services, config.cors_allow_origin.as_deref());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
