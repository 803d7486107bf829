//! OHLCV 폴러 REST API 서버.
//!
//! 폴러는 서버 시작 시 자동으로 실행되지 않으며 `POST /api/v1/poller/start`로 시작합니다.
//! `POLLER_AUTOSTART=true`이면 시작 직후 폴러를 실행합니다.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use ohlcv_api::{create_api_router, ApiConfig, AppState};
use ohlcv_collector::{CollectorConfig, CollectorContext};
use ohlcv_core::config::env_var_bool;
use ohlcv_core::{init_logging, LogConfig};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging(LogConfig::from_env()).map_err(|e| anyhow::anyhow!("logging init failed: {}", e))?;

    info!("Starting OHLCV API server v{}", env!("CARGO_PKG_VERSION"));

    let api_config = ApiConfig::from_env();
    let collector_config = CollectorConfig::from_env()?;
    let ctx = CollectorContext::build(collector_config).await?;
    let state = Arc::new(AppState::from_context(&ctx));

    if env_var_bool("POLLER_AUTOSTART", false) {
        match state.poller.start().await {
            Ok(status) => info!(symbols = ?status.symbols, "Poller auto-started"),
            Err(e) => warn!(error = %e, "Poller auto-start failed"),
        }
    }

    let app = create_router(Arc::clone(&state));

    let addr = api_config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    let shutdown_token = CancellationToken::new();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .await?;

    info!("Server shutdown initiated, cleaning up...");
    shutdown_token.cancel();

    // 진행 중인 사이클은 현재 심볼 동기화가 끝난 뒤 종료됨
    if state.poller.status().await.state == ohlcv_collector::PollerState::Running {
        if let Err(e) = state.poller.stop().await {
            warn!(error = %e, "Poller stop failed");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>) -> Router {
    create_api_router().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer()),
    )
}

/// CORS 레이어. `CORS_ORIGINS`(쉼표 구분)가 없으면 모든 origin 허용.
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => {
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Ctrl+C 또는 SIGTERM 대기.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
        _ = shutdown_token.cancelled() => {}
    }

    shutdown_token.cancel();
}
