//! Identity merge service binary.
//!
//! Serves the merge REST API. With `IDENTITY_MERGE__DATABASE__URL` set the
//! identity graph lives in PostgreSQL, otherwise in process memory.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use identity_merge::adapters::http::{api_router, MergeHandlers};
use identity_merge::adapters::postgres::MIGRATOR;
use identity_merge::adapters::{
    InMemoryIdentityGraphStore, KeyedIdentityLocker, LoggingEventPublisher, LoggingSearchIndexer,
    PostgresIdentityGraphStore, PostgresMergeAuditRepository,
};
use identity_merge::application::handlers::merge::{GetMergeAuditHandler, MergeIdentitiesHandler};
use identity_merge::config::{AppConfig, DatabaseConfig};
use identity_merge::domain::foundation::SystemClock;
use identity_merge::domain::merge::{MergeEngine, MigratorRegistry};
use identity_merge::ports::{IdentityGraphStore, MergeAuditRepository};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let (store, audits) = build_store(&config.database).await?;

    let engine = Arc::new(MergeEngine::new(
        MigratorRegistry::standard(),
        config.merge.policy(),
    ));
    let merge_handler = MergeIdentitiesHandler::new(
        store,
        Arc::new(KeyedIdentityLocker::new(config.merge.lock_timeout())),
        Arc::new(LoggingSearchIndexer::new()),
        Arc::new(LoggingEventPublisher::new()),
        engine,
        Arc::new(SystemClock),
    )
    .with_settings(config.merge.settings());
    let handlers = MergeHandlers::new(
        Arc::new(merge_handler),
        Arc::new(GetMergeAuditHandler::new(audits)),
    );

    let app = api_router(handlers, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    info!(%addr, environment = ?config.server.environment, "Identity merge service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_store(
    database: &DatabaseConfig,
) -> Result<(Arc<dyn IdentityGraphStore>, Arc<dyn MergeAuditRepository>), Box<dyn std::error::Error>>
{
    let Some(url) = database.url() else {
        info!("No database configured, using in-memory identity store");
        let store = InMemoryIdentityGraphStore::new();
        return Ok((Arc::new(store.clone()), Arc::new(store)));
    };

    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .connect(url)
        .await?;

    if database.run_migrations {
        MIGRATOR.run(&pool).await?;
        info!("Database migrations applied");
    }

    Ok((
        Arc::new(PostgresIdentityGraphStore::new(pool.clone())),
        Arc::new(PostgresMergeAuditRepository::new(pool)),
    ))
}
