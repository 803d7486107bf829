//! 폴러 제어 API 엔드포인트
//!
//! - `POST /api/v1/poller/start` - 수집 시작
//! - `POST /api/v1/poller/stop` - 수집 중지
//! - `POST /api/v1/poller/reset` - 중지 후 상태와 저장된 캔들 초기화
//! - `GET /api/v1/poller/status` - 현재 상태 조회

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use ohlcv_collector::PollerStatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppState;

/// 초기화 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct PollerResetResponse {
    /// 삭제된 캔들 수
    pub deleted: u64,
    pub status: PollerStatus,
}

/// POST /api/v1/poller/start
pub async fn start_poller(State(state): State<Arc<AppState>>) -> ApiResult<Json<PollerStatus>> {
    Ok(Json(state.poller.start().await?))
}

/// POST /api/v1/poller/stop
pub async fn stop_poller(State(state): State<Arc<AppState>>) -> ApiResult<Json<PollerStatus>> {
    Ok(Json(state.poller.stop().await?))
}

/// POST /api/v1/poller/reset
pub async fn reset_poller(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<PollerResetResponse>> {
    let deleted = state.poller.reset().await?;
    Ok(Json(PollerResetResponse {
        deleted,
        status: state.poller.status().await,
    }))
}

/// GET /api/v1/poller/status
pub async fn get_poller_status(State(state): State<Arc<AppState>>) -> Json<PollerStatus> {
    Json(state.poller.status().await)
}

pub fn poller_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/start", post(start_poller))
        .route("/stop", post(stop_poller))
        .route("/reset", post(reset_poller))
        .route("/status", get(get_poller_status))
}
