use axum::extract::DefaultBodyLimit;
use course_backend::{
    config::init_config,
    database::{pool::create_pool, postgres::PgRepository},
    routes, AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

const MAX_BODY_BYTES: usize = 1024 * 1024;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = init_config()?;
    init_tracing(config.log_json);

    let pool = create_pool(config).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let repo = Arc::new(PgRepository::new(pool, config.default_passing_score));
    let app_state = AppState::new(repo, Arc::new(config.clone()));

    {
        let sessions = app_state.quiz_session_service.clone();
        let progress = app_state.progress_service.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(SWEEP_INTERVAL).await;
                if let Err(e) = sessions.sweep_idle() {
                    tracing::error!(error = ?e, "quiz session sweep failed");
                }
                if let Err(e) = progress.sweep_idle() {
                    tracing::error!(error = ?e, "progress sweep failed");
                }
            }
        });
    }

    let app = routes::app_router(app_state)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    let listener = TcpListener::bind(&config.server_address).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
