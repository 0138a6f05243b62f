mod ai;
mod api;
mod cascade;
mod db;
mod error;
mod ratelimit;
mod slug;
mod storage;
mod validation;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{AdminCredentials, AppState};
use cascade::CascadeCoordinator;
use ratelimit::RateLimiter;
use storage::StorageConfig;

/// Interval for the rate-limiter garbage sweep.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "student_power=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get data path from environment or use default
    let data_path = std::env::var("STUDENT_POWER_DATA_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("student-power"));

    // Initialize database
    let db_path = data_path.join("student-power.db");
    let db = db::init_database(&db_path)
        .await
        .expect("Failed to initialize database");
    tracing::info!("Database initialized at {:?}", db_path);

    // Object storage for uploaded PDFs
    let storage = StorageConfig::from_env(&data_path).build().await;

    // Rate limiter with its background sweep
    let limiter = Arc::new(RateLimiter::new());
    ratelimit::spawn_sweeper(limiter.clone(), SWEEP_INTERVAL);

    let state = Arc::new(AppState {
        cascade: CascadeCoordinator::new(db.clone(), storage.clone()),
        db,
        storage,
        limiter,
        admin: AdminCredentials::from_env(),
        ai: ai::AiClient::from_env(),
    });

    // Build router
    let app = api::router()
        .with_state(state)
        // Allow large PDF uploads (100MB limit plus multipart overhead)
        .layer(DefaultBodyLimit::max(110 * 1024 * 1024))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([127, 0, 0, 1], 8080));
    tracing::info!("Student Power server starting on http://{}", addr);
    tracing::info!("");
    tracing::info!("API Endpoints:");
    tracing::info!("  GET/POST        /api/universities");
    tracing::info!("  GET/PUT/DELETE  /api/universities/:id");
    tracing::info!("  GET/POST        /api/courses, /api/semesters, /api/subjects, /api/pdfs");
    tracing::info!("  POST            /api/pdfs/upload - Upload a PDF file");
    tracing::info!("  POST            /api/auth/login  - Admin login");
    tracing::info!("  POST            /api/ai/chat     - AI-assisted PDF viewer proxy");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
