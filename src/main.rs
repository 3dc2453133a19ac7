use std::net::SocketAddr;

use hiring_backend::{
    config::Config, database::pool::create_pool, routes, services::expiry_service, AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hiring_backend=info,tower_http=info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    let pool = create_pool(&config).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Handle must outlive the server or the purge job stops.
    let _scheduler = expiry_service::start_scheduler(
        pool.clone(),
        &config.expiry_schedule,
        config.activity_retention_days,
    )
    .await?;
    info!(schedule = %config.expiry_schedule, "expiry purge scheduled");

    let addr: SocketAddr = config.server_address.parse()?;
    let app_state = AppState::new(pool, config)?;
    let app = routes::router(app_state);

    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
