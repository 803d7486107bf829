//! 헬스 체크 endpoint.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use ohlcv_collector::PollerState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

/// 헬스 체크 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 전체 서비스 상태 ("healthy" | "degraded")
    pub status: String,
    /// API 버전
    pub version: String,
    /// 서버 업타임(초)
    pub uptime_secs: i64,
    /// 현재 시간 (ISO 8601)
    pub timestamp: String,
    /// 개별 컴포넌트 상태
    pub components: ComponentHealth,
}

/// 개별 컴포넌트 상태.
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// 캔들 저장소
    pub storage: ComponentStatus,
    /// 증권사 토큰
    pub token: ComponentStatus,
    /// 폴러 실행 상태
    pub poller: PollerState,
}

/// 컴포넌트 상태.
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentStatus {
    /// 상태 ("up" | "down")
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentStatus {
    pub fn up_with_info(message: impl Into<String>) -> Self {
        Self {
            status: "up".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn down(message: impl Into<String>) -> Self {
        Self {
            status: "down".to_string(),
            message: Some(message.into()),
        }
    }

    fn is_up(&self) -> bool {
        self.status == "up"
    }
}

/// GET /health
///
/// 저장소가 응답하지 않으면 503, 토큰이 없으면 200 + "degraded".
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage = match state.store.health_check().await {
        Ok(()) => match state.store.count().await {
            Ok(count) => ComponentStatus::up_with_info(format!(
                "{} ({} candles)",
                state.store.backend(),
                count
            )),
            Err(e) => ComponentStatus::down(e.to_string()),
        },
        Err(e) => ComponentStatus::down(e.to_string()),
    };

    let token = match state.tokens.status().await {
        Ok(status) if status.present => match status.expires_at {
            Some(at) => ComponentStatus::up_with_info(format!("expires at {}", at.to_rfc3339())),
            None => ComponentStatus::up_with_info("present"),
        },
        Ok(_) => ComponentStatus::down("login required"),
        Err(e) => ComponentStatus::down(e.to_string()),
    };

    let status_code = if storage.is_up() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let overall = if storage.is_up() && token.is_up() {
        "healthy"
    } else {
        "degraded"
    };

    let response = HealthResponse {
        status: overall.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        components: ComponentHealth {
            storage,
            token,
            poller: state.poller.status().await.state,
        },
    };

    (status_code, Json(response))
}
