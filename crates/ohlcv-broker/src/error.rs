//! 증권사 API 에러 타입.

use ohlcv_core::CoreError;
use thiserror::Error;

/// 증권사 API 관련 에러.
///
/// 진행 중인 토큰 갱신 결과를 모든 대기자에게 나눠주기 위해 `Clone`입니다.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// 저장된 토큰 없음 (로그인 필요)
    #[error("Token missing: login required")]
    TokenMissing,

    /// 업스트림이 토큰 갱신을 거부함 (재로그인 필요)
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// 401 이외의 HTTP 에러 (재시도 후의 401 포함)
    #[error("Upstream request failed ({status}): {body}")]
    UpstreamRequestFailed { status: u16, body: String },

    /// HTTP 200이지만 응답 본문이 에러를 보고함
    #[error("API error {code}: {message}")]
    ApiError { code: i64, message: String },

    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 요청 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),

    /// 잘못된 날짜 범위
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// 토큰 저장소 입출력 에러
    #[error("Token store error: {0}")]
    TokenStore(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BrokerError {
    /// 재로그인이 필요한 인증 에러인지 확인.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, BrokerError::TokenMissing | BrokerError::RefreshFailed(_))
    }

    /// 업스트림 HTTP 상태 코드 (있는 경우).
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            BrokerError::UpstreamRequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;

impl From<reqwest::Error> for BrokerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BrokerError::Timeout(err.to_string())
        } else if err.is_decode() {
            BrokerError::Parse(err.to_string())
        } else {
            BrokerError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(err: serde_json::Error) -> Self {
        BrokerError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for BrokerError {
    fn from(err: std::io::Error) -> Self {
        BrokerError::TokenStore(err.to_string())
    }
}

impl From<CoreError> for BrokerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidRange(msg) => BrokerError::InvalidRange(msg),
            other => BrokerError::Parse(other.to_string()),
        }
    }
}
