//! OHLCV 히스토리 수집기.
//!
//! 이 crate는 API 서버와 CLI가 공유하는 수집 로직을 제공합니다:
//! - 구간 분할 조회 → 중복 제거 → upsert 파이프라인
//! - 주기적 증분 수집 폴러 (시작/중지/상태/초기화)
//! - 환경변수 기반 설정과 실행 컨텍스트 구성

pub mod config;
pub mod context;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::{CollectorConfig, PollerConfig};
pub use context::CollectorContext;
pub use error::{CollectorError, Result};
pub use modules::{sync_history, sync_symbols, Poller, PollerState, PollerStatus};
pub use stats::{FailedChunk, SyncStats};
