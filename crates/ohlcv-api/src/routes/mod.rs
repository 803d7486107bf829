//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크
//! - `/api/v1/auth` - 로그인, 로그아웃, 토큰 상태
//! - `/api/v1/poller` - 증분 수집 폴러 제어
//! - `/api/v1/candles` - 캔들 조회 및 CSV 내보내기
//! - `/api/v1/symbols` - 저장된 심볼 목록, 수동 동기화

pub mod auth;
pub mod candles;
pub mod health;
pub mod poller;
pub mod symbols;

pub use auth::auth_router;
pub use candles::candles_router;
pub use health::health_check;
pub use poller::poller_router;
pub use symbols::symbols_router;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/auth", auth_router())
        .nest("/api/v1/poller", poller_router())
        .nest("/api/v1/candles", candles_router())
        .nest("/api/v1/symbols", symbols_router())
}
