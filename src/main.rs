use std::net::SocketAddr;

use tokio::time::{self, Duration};
use tower_http::{compression::CompressionLayer, cors::CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schoolhouse::{config, db, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging: stdout plus a daily rotated file under ./logs
    std::fs::create_dir_all("logs").ok();
    let (stdout_nb, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let file_appender = tracing_appender::rolling::daily("logs", "schoolhouse.log");
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stdout_nb))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .init();
    // Dropping the guards would stop the non-blocking writers from flushing
    let _log_guards = (stdout_guard, file_guard);

    let app_cfg = config::load()?;

    config::ensure_sqlite_parent_dir(&app_cfg.database.url)?;
    let pool = db::connect(&app_cfg.database).await?;
    db::init_db(&pool).await?;
    info!(url = %app_cfg.database.url, "Database ready");

    let state = AppState::new(pool, app_cfg.clone());

    // Sweep idle client entries out of the rate limiters
    {
        let global = state.global_limiter.clone();
        let endpoints = state.rate_limiter.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(Duration::from_secs(300));
            loop {
                ticker.tick().await;
                global.cleanup_old_entries().await;
                endpoints.cleanup_all().await;
            }
        });
    }

    let app = routes::router(state).layer(CompressionLayer::new());
    // Permissive CORS only for local development against a separate frontend
    let app = if cfg!(debug_assertions) { app.layer(CorsLayer::permissive()) } else { app };

    let host = app_cfg.server.host.clone();
    let port = app_cfg.server.port;
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen addr {}:{} - {}", host, port, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Schoolhouse listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received. Stopping server...");
}
