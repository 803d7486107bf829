//! 에러 타입 정의.

use ohlcv_broker::BrokerError;
use ohlcv_data::DataError;
use thiserror::Error;

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 증권사 API 에러
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// 저장소 에러
    #[error("Storage error: {0}")]
    Data(#[from] DataError),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 일부 구간 조회 실패 (저장된 캔들은 유지됨)
    #[error("Partial sync failure: {failed_chunks} of {total_chunks} chunks failed")]
    PartialSyncFailure {
        failed_chunks: usize,
        total_chunks: usize,
    },

    /// 폴러가 이미 실행 중
    #[error("Poller is already running")]
    AlreadyRunning,

    /// 폴러가 실행 중이 아님
    #[error("Poller is not running")]
    NotRunning,
}

impl CollectorError {
    /// 재로그인이 필요한 에러인지 확인.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, CollectorError::Broker(e) if e.is_auth_error())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
