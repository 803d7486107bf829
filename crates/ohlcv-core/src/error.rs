//! 핵심 도메인 에러 타입.

use thiserror::Error;

/// 도메인 타입 생성/파싱 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// 잘못된 날짜 범위 (시작일 > 종료일, 한도 0 등)
    #[error("잘못된 날짜 범위: {0}")]
    InvalidRange(String),

    /// 알 수 없는 해상도 문자열
    #[error("알 수 없는 해상도: {0}")]
    InvalidResolution(String),

    /// 캔들 행 형식 오류
    #[error("잘못된 캔들 데이터: {0}")]
    InvalidCandle(String),
}

/// 핵심 도메인 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
