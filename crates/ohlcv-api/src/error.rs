//! 통합 API 에러 응답 타입.
//!
//! 모든 엔드포인트는 실패 시 같은 JSON 형식을 반환합니다.
//!
//! ```json
//! {
//!   "code": "TOKEN_MISSING",
//!   "message": "Token missing: login required",
//!   "timestamp": 1738300800
//! }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ohlcv_broker::BrokerError;
use ohlcv_collector::CollectorError;
use ohlcv_data::DataError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// API 에러 응답 본문.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "TOKEN_MISSING", "INVALID_INPUT")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 상세 정보
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 시각 (Unix timestamp)
    pub timestamp: i64,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// HTTP 상태 코드가 붙은 API 에러.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorResponse::new(code, message),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = self.status.as_u16(),
                error = %self.body,
                "API request failed"
            );
        } else {
            tracing::debug!(
                status = self.status.as_u16(),
                error = %self.body,
                "API request rejected"
            );
        }
        (self.status, Json(self.body)).into_response()
    }
}

impl From<BrokerError> for ApiError {
    fn from(err: BrokerError) -> Self {
        let message = err.to_string();
        match err {
            BrokerError::TokenMissing => {
                Self::new(StatusCode::UNAUTHORIZED, "TOKEN_MISSING", message)
            }
            BrokerError::RefreshFailed(_) => {
                Self::new(StatusCode::UNAUTHORIZED, "REFRESH_FAILED", message)
            }
            BrokerError::UpstreamRequestFailed { status, body } => {
                let mut api = Self::new(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message);
                api.body = api
                    .body
                    .with_details(serde_json::json!({ "status": status, "body": body }));
                api
            }
            BrokerError::ApiError { .. } | BrokerError::Network(_) | BrokerError::Parse(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message)
            }
            BrokerError::Timeout(_) => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT", message)
            }
            BrokerError::InvalidRange(_) | BrokerError::Config(_) => Self::bad_request(message),
            BrokerError::TokenStore(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "TOKEN_STORE_ERROR", message)
            }
        }
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::InvalidData(_) => Self::bad_request(err.to_string()),
            _ => Self::new(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", err.to_string()),
        }
    }
}

impl From<CollectorError> for ApiError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::Broker(e) => e.into(),
            CollectorError::Data(e) => e.into(),
            CollectorError::Config(_) => Self::bad_request(err.to_string()),
            CollectorError::AlreadyRunning => {
                Self::new(StatusCode::CONFLICT, "ALREADY_RUNNING", err.to_string())
            }
            CollectorError::NotRunning => {
                Self::new(StatusCode::CONFLICT, "NOT_RUNNING", err.to_string())
            }
            CollectorError::PartialSyncFailure { .. } => {
                Self::new(StatusCode::BAD_GATEWAY, "PARTIAL_SYNC_FAILURE", err.to_string())
            }
        }
    }
}
