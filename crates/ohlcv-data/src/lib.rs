//! 캔들 저장소.
//!
//! 이 crate는 다음을 제공합니다:
//! - `(symbol, timestamp)` 키 기반 멱등 upsert
//! - 페이지 단위 캔들 조회와 심볼별 최신 시각 조회
//! - PostgreSQL 저장소와 DB 없이 동작하는 메모리 저장소

pub mod error;
pub mod storage;

pub use error::{DataError, Result};
pub use storage::memory::MemoryCandleStore;
pub use storage::postgres::{DatabaseConfig, PgCandleStore};
pub use storage::{
    CandlePage, CandleQuery, CandleStore, UpsertSummary, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
