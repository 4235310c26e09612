use std::path::{Path, PathBuf};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ensemble_api::api::{create_router, AppState};
use ensemble_api::config::Config;
use ensemble_api::engine::{load_engine_background, EngineCell};
use ensemble_api::store::Catalog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ensemble_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // A missing catalog is not fatal: the server still answers session
    // traffic, just with nothing to recommend.
    let catalog = match Catalog::load(Path::new(&config.catalog_path)) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::warn!(
                path = %config.catalog_path,
                error = %e,
                "Failed to load item catalog; starting with an empty one"
            );
            Catalog::empty()
        }
    };

    let engine = EngineCell::new();
    tokio::spawn(load_engine_background(
        engine.clone(),
        PathBuf::from(&config.model_dir),
    ));

    let state = AppState::new(catalog, engine);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
