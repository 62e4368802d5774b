use std::sync::Arc;

use anyhow::Context;
use marketplace_api::{
    config::{Backend, Config},
    db::SqliteStore,
    marketplace::Marketplace,
    memory::MemoryStore,
    router, seed,
    store::RecordStore,
    AppState,
};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn open_store(backend: &Backend) -> anyhow::Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match backend {
        Backend::Sqlite { database_url } => Arc::new(
            SqliteStore::open(database_url)
                .with_context(|| format!("opening database {database_url}"))?,
        ),
        Backend::Memory { snapshot: Some(path) } => Arc::new(
            MemoryStore::with_snapshot(path)
                .with_context(|| format!("loading snapshot {}", path.display()))?,
        ),
        Backend::Memory { snapshot: None } => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("marketplace_api=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let market = Marketplace::new(open_store(&config.backend)?);
    if config.seed_demo {
        seed::seed_demo(&market)?;
    }

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<axum::http::HeaderValue>()
                .context("invalid CORS_ORIGIN")?,
        )
        .allow_methods(AllowMethods::any())
        .allow_headers(AllowHeaders::any());

    let state = AppState {
        market,
        jwt_secret: config.jwt_secret.clone(),
    };
    let app = router(state).layer(cors);

    info!(addr = %config.bind_addr, backend = ?config.backend, "marketplace API listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
