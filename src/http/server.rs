//! HTTP server wiring: routes, CORS and graceful shutdown.

#[cfg(feature = "http-server")]
use super::handlers::{self, AppState};

/// Serves files from `dir` for every path the API routes do not match.
#[cfg(feature = "http-server")]
pub fn with_static_files(router: axum::Router, dir: impl AsRef<std::path::Path>) -> axum::Router {
    router.fallback_service(tower_http::services::ServeDir::new(dir))
}

/// Builds the API router over `state`.
#[cfg(feature = "http-server")]
pub fn router(state: AppState, cors: bool) -> axum::Router {
    use axum::routing::{get, post};

    let router = axum::Router::new()
        .route("/api/area", post(handlers::add_area))
        .route("/api/area/{id}", get(handlers::get_area))
        .route("/api/area/{id}/{dist_id}", get(handlers::get_area_with_metric))
        .route("/api/point", post(handlers::add_point))
        .route("/api/cluster", post(handlers::add_cluster))
        .route("/api/train", post(handlers::train))
        .route("/api/clear", post(handlers::clear_area))
        .route("/api/distances", get(handlers::list_distances))
        .route("/health", get(handlers::health_check))
        .with_state(state);

    if cors {
        router.layer(tower_http::cors::CorsLayer::permissive())
    } else {
        router
    }
}

#[cfg(feature = "http-server")]
pub async fn serve_http(config: crate::Settings, bind: String) -> anyhow::Result<()> {
    use crate::storage::AreaStore;
    use tokio_util::sync::CancellationToken;
    use tracing::{error, info};

    let store = AreaStore::with_tolerance(config.training.tolerance);
    let state = AppState::new(store, config.training.clone());
    let mut app = router(state, config.server.cors);
    if let Some(dir) = &config.server.static_dir {
        info!(dir = %dir.display(), "serving static files");
        app = with_static_files(app, dir);
    }

    // Create cancellation token for coordinated shutdown
    let ct = CancellationToken::new();

    let signal_ct = ct.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!("Failed to listen for ctrl+c: {e}"),
        }
        signal_ct.cancel();
    });

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("clusterlab listening on http://{bind}");
    info!("Health check: http://{bind}/health");
    info!(
        max_age = config.training.default_max_age,
        distance = config.training.default_distance,
        tolerance = config.training.tolerance,
        "training defaults"
    );

    let shutdown_ct = ct.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_ct.cancelled().await })
        .await?;

    info!("HTTP server shut down gracefully");
    Ok(())
}

#[cfg(not(feature = "http-server"))]
pub async fn serve_http(_config: crate::Settings, _bind: String) -> anyhow::Result<()> {
    eprintln!("HTTP server support is not compiled in.");
    eprintln!("Please rebuild with: cargo build --features http-server");
    std::process::exit(1);
}
