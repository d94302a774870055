//! Dashboard server: discovers models (PostgreSQL tables or a JSON model file) and serves them.
//!
//! Run from repo root: `cargo run -p dashboard-server`

use model_browser::{
    app, load_models_file, register_discovered, spawn_stats_ticker, AppState, ModelRegistry, Settings,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("model_browser=info,dashboard_server=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let mut registry = ModelRegistry::new();

    if let Some(database_url) = &settings.database_url {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        register_discovered(&pool, &settings.database_schema, &mut registry).await?;
    }
    if let Some(path) = &settings.models_path {
        load_models_file(path, &mut registry)?;
    }
    if registry.is_empty() {
        tracing::warn!("no models registered; set DATABASE_URL or MODELS_PATH");
    }

    let state = AppState::new(registry, &settings);
    if let Some(every) = settings.stats_interval {
        spawn_stats_ticker(state.hub.clone(), state.registry.clone(), every, settings.fetch_timeout);
    }

    let router = app(state, settings.body_limit_bytes);
    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("Dashboard server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
