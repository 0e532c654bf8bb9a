use std::{error::Error, sync::Arc, time::Duration};

use resource_search::{
    app_state::{SharedEmbedder, SharedStore},
    config::read_config,
    domain::search::{
        embedder::HttpProviderFactory, repository::PgDocumentStore, run_backfill_worker,
        DocumentIndexer, IndexerConfig, ProviderLoader, SearchConfig,
    },
    router, AppState,
};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt::time::LocalTime, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::from_filename(".env.local").ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("resource_search=debug,tower_http=debug")),
        )
        .with_timer(LocalTime::rfc_3339())
        .init();

    let settings = read_config()?;

    let pool = PgPool::connect_lazy_with(settings.database.with_db());
    let store = PgDocumentStore::new(pool);
    store.migrate().await?;
    tracing::info!("Database migrations applied");

    // The model is only contacted on first use
    let embedder = ProviderLoader::new(
        Arc::new(HttpProviderFactory::new(settings.embedding.clone())),
        settings.embedding.dimensions,
    );

    let embedder: SharedEmbedder = Arc::new(embedder);
    let store: SharedStore = Arc::new(store);
    let indexer_config = IndexerConfig::from(&settings.indexer);

    if settings.indexer.enabled {
        let indexer = DocumentIndexer::new(embedder.clone(), store.clone(), indexer_config.clone());
        tokio::spawn(run_backfill_worker(
            indexer,
            Duration::from_secs(settings.indexer.interval_secs.max(1)),
        ));
    }

    let app_state = AppState::new(
        embedder,
        store,
        SearchConfig::from(&settings.search),
        indexer_config,
    );
    let app = router::create(app_state, &settings.application.app_url);

    let addr = format!("{}:{}", settings.application.host, settings.application.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
