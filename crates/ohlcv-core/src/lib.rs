//! # OHLCV Core
//!
//! 캔들 수집기 전반에서 사용하는 핵심 도메인 타입을 제공합니다:
//! - 캔들(OHLCV) 및 해상도 타입
//! - 요청 한도에 맞춘 날짜 구간 분할
//! - 환경변수 설정 헬퍼
//! - 로깅 인프라

pub mod chunk;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use chunk::{chunk_date_range, DateChunk};
pub use error::{CoreError, CoreResult};
pub use logging::*;
pub use types::*;
