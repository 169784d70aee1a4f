use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blog_rss::config::Config;
use blog_rss::db::Database;
use blog_rss::loader::{start_background_reload, Loader};
use blog_rss::routes::{self, AppState, BLOG_COLLECTION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blog_rss=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("BLOG_RSS_CONFIG").unwrap_or_else(|_| "site.toml".to_string());
    let config = Config::load(&config_path)?;
    info!("Loaded configuration from {}", config_path);

    // Initialize database
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:blog_rss.db?mode=rwc".to_string());
    let db = Database::new(&database_url).await?;
    db.initialize().await?;
    info!("Database initialized");

    let db = Arc::new(db);

    // Load content before serving
    let loader = Arc::new(Loader::new(config.content_dir.clone(), db.clone()));
    loader.reload_all().await?;
    info!(
        "{} posts in the '{}' collection",
        db.count_posts(BLOG_COLLECTION).await?,
        BLOG_COLLECTION
    );

    let bg_loader = loader.clone();
    let reload_interval = config.reload_interval;
    tokio::spawn(async move {
        start_background_reload(bg_loader, reload_interval).await;
    });

    let state = Arc::new(AppState {
        db: db.clone(),
        site: config.site.clone(),
        stylesheet: config.stylesheet.clone(),
    });

    let app = routes::router(state)
        .fallback_service(ServeDir::new(&config.public_dir))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    info!("Serving feed on http://{}/rss.xml", config.listen);

    axum::serve(listener, app).await?;

    Ok(())
}
