mod config;
mod provider;
mod routes;
mod store;
mod view;

use std::sync::Arc;

use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::provider::SyntheticPostProvider;
use crate::routes::AppState;
use crate::store::{start_view_sweeper, ViewStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheldon_news=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load("news.toml")?;
    info!(
        "Loaded configuration for {} ({} posts per feed)",
        config.site_name, config.posts.count
    );

    let views = Arc::new(ViewStore::from_settings(&config.views));

    // Start background sweeper for idle views
    let sweeper_views = views.clone();
    let sweep_interval = config.views.sweep_interval();
    tokio::spawn(async move {
        start_view_sweeper(sweeper_views, sweep_interval).await;
    });

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| config.bind_address.clone());

    // Create app state
    let state = Arc::new(AppState {
        views,
        provider: Arc::new(SyntheticPostProvider::new(config.posts.clone())),
        config: Arc::new(config),
    });

    // Build router
    let app = routes::app(state)
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_address.as_str()).await?;
    info!("Server starting on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
