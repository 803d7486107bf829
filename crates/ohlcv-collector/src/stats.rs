//! 수집 통계 구조체.

use chrono::NaiveDate;
use ohlcv_core::Resolution;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::CollectorError;

/// 실패한 구간 기록
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedChunk {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub error: String,
}

/// 심볼 하나의 동기화 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// 심볼
    pub symbol: String,
    /// 해상도
    pub resolution: Resolution,
    /// 조회한 캔들 수 (중복 포함)
    pub fetched: usize,
    /// 새로 저장된 캔들 수
    pub inserted: u64,
    /// 덮어쓴 캔들 수
    pub updated: u64,
    /// 같은 시각 중복으로 버린 수
    pub skipped: usize,
    /// 형식 오류로 버린 행 수
    pub malformed: usize,
    /// 전체 구간 수
    pub chunks_total: usize,
    /// 실패한 구간 수
    pub chunks_failed: usize,
    /// 실패한 구간 상세
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_chunks: Vec<FailedChunk>,
    /// 소요 시간 (밀리초)
    pub elapsed_ms: u64,
}

impl SyncStats {
    /// 새 통계 객체 생성
    pub fn new(symbol: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            symbol: symbol.into(),
            resolution,
            ..Default::default()
        }
    }

    /// 소요 시간 기록
    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed_ms = elapsed.as_millis() as u64;
    }

    /// 일부 구간이 실패했는지 확인
    pub fn is_partial(&self) -> bool {
        self.chunks_failed > 0
    }

    /// 부분 실패를 에러로 변환 (`--strict` 등에서 사용)
    pub fn partial_failure(&self) -> Option<CollectorError> {
        self.is_partial().then(|| CollectorError::PartialSyncFailure {
            failed_chunks: self.chunks_failed,
            total_chunks: self.chunks_total,
        })
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self) {
        if self.is_partial() {
            tracing::warn!(
                symbol = %self.symbol,
                resolution = %self.resolution,
                fetched = self.fetched,
                inserted = self.inserted,
                updated = self.updated,
                skipped = self.skipped,
                malformed = self.malformed,
                chunks = self.chunks_total,
                failed_chunks = self.chunks_failed,
                elapsed = format!("{:.1}s", self.elapsed_ms as f64 / 1000.0),
                "Sync finished with failed chunks"
            );
        } else {
            tracing::info!(
                symbol = %self.symbol,
                resolution = %self.resolution,
                fetched = self.fetched,
                inserted = self.inserted,
                updated = self.updated,
                skipped = self.skipped,
                malformed = self.malformed,
                chunks = self.chunks_total,
                elapsed = format!("{:.1}s", self.elapsed_ms as f64 / 1000.0),
                "Sync finished"
            );
        }
    }
}
