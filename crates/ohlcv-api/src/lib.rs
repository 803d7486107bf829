//! OHLCV 폴러 REST API 서버.
//!
//! 인증, 폴러 제어, 캔들 조회/내보내기, 수동 동기화 엔드포인트를 제공합니다.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use routes::create_api_router;
pub use state::AppState;
