use axum::extract::DefaultBodyLimit;
use axum::{routing::get, Router};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use std::env;
use tokio::net::TcpListener;
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rustilearn_progress::catalog::{CourseCatalog, HttpCatalog, MemoryCatalog};
use rustilearn_progress::cert::{CertificateRenderer, FileRenderer, HttpRenderer};
use rustilearn_progress::engine::{Engine, PassthroughIdentity};
use rustilearn_progress::routes;
use rustilearn_progress::store::MemoryProgressStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "rustilearn_progress=info,axum=info".into())
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // one client for both collaborators; the timeout bounds every upstream call
    let timeout_secs: u64 = env::var("UPSTREAM_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;

    let catalog: Arc<dyn CourseCatalog> = match env::var("CATALOG_URL") {
        Ok(url) => Arc::new(HttpCatalog::new(client.clone(), url)),
        Err(_) => {
            let path = env::var("CATALOG_PATH").unwrap_or("./data/courses.json".into());
            tracing::info!("loading course catalog from {}", path);
            Arc::new(MemoryCatalog::from_file(Path::new(&path)).await?)
        }
    };

    let data_dir = env::var("DATA_DIR").unwrap_or("./data".into());
    let renderer: Arc<dyn CertificateRenderer> = match env::var("RENDERER_URL") {
        Ok(url) => Arc::new(HttpRenderer::new(client, url)),
        Err(_) => Arc::new(FileRenderer::new(PathBuf::from(&data_dir))),
    };

    let engine = Arc::new(Engine::new(
        catalog,
        Arc::new(MemoryProgressStore::new()),
        renderer,
        Arc::new(PassthroughIdentity),
    ));

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(routes::router(engine))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let port: u16 = env::var("PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(8081);
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}
