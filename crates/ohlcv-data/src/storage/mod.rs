//! 캔들 저장소 추상화.
//!
//! 수집 파이프라인과 API는 [`CandleStore`] 트레이트에만 의존하며,
//! 구현체로 PostgreSQL([`postgres::PgCandleStore`])과
//! 메모리([`memory::MemoryCandleStore`]) 저장소를 제공합니다.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use ohlcv_core::Candle;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

/// 페이지 크기 기본값.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// 페이지 크기 상한.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// upsert 결과 집계.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSummary {
    /// 새로 생성된 행 수
    pub inserted: u64,
    /// 기존 행을 덮어쓴 수
    pub updated: u64,
}

impl UpsertSummary {
    /// 처리된 전체 행 수.
    pub fn total(&self) -> u64 {
        self.inserted + self.updated
    }

    /// 다른 집계를 합산.
    pub fn merge(&mut self, other: UpsertSummary) {
        self.inserted += other.inserted;
        self.updated += other.updated;
    }
}

/// 캔들 조회 조건.
///
/// 시각 범위는 Unix 초 단위이며 양 끝을 포함합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleQuery {
    pub symbol: Option<String>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    /// 1부터 시작하는 페이지 번호
    pub page: u32,
    pub page_size: u32,
}

impl Default for CandleQuery {
    fn default() -> Self {
        Self {
            symbol: None,
            from: None,
            to: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CandleQuery {
    /// 특정 심볼 조회 조건.
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Default::default()
        }
    }

    /// 시각 범위 지정.
    pub fn with_range(mut self, from: Option<i64>, to: Option<i64>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// 페이지 지정.
    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// 페이지 값을 허용 범위로 보정하고 범위를 검증합니다.
    ///
    /// # Errors
    /// `from > to`이면 `DataError::InvalidData`.
    pub fn normalized(&self) -> Result<Self> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(DataError::InvalidData(format!(
                    "from({}) is after to({})",
                    from, to
                )));
            }
        }

        Ok(Self {
            symbol: self.symbol.clone().filter(|s| !s.is_empty()),
            from: self.from,
            to: self.to,
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
        })
    }

    /// 건너뛸 행 수 (정규화된 조건 기준).
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// 캔들이 조건에 맞는지 확인.
    pub fn matches(&self, candle: &Candle) -> bool {
        self.symbol.as_deref().map_or(true, |s| s == candle.symbol)
            && self.from.map_or(true, |from| candle.timestamp >= from)
            && self.to.map_or(true, |to| candle.timestamp <= to)
    }
}

/// 캔들 조회 페이지.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlePage {
    /// `(symbol, timestamp)` 오름차순
    pub items: Vec<Candle>,
    /// 조건에 맞는 전체 행 수
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl CandlePage {
    /// 다음 페이지 존재 여부.
    pub fn has_next(&self) -> bool {
        u64::from(self.page) * u64::from(self.page_size) < self.total
    }
}

/// 캔들 저장소.
#[async_trait]
pub trait CandleStore: Send + Sync {
    /// 캔들을 `(symbol, timestamp)` 키로 upsert합니다.
    ///
    /// 같은 키가 이미 있으면 OHLCV 값을 덮어쓰고, 없으면 새로 생성합니다.
    /// 입력 안에 같은 키가 여러 번 나오면 마지막 값만 반영됩니다.
    async fn upsert_candles(&self, candles: &[Candle]) -> Result<UpsertSummary>;

    /// 조건에 맞는 캔들을 페이지 단위로 조회합니다.
    async fn query_candles(&self, query: &CandleQuery) -> Result<CandlePage>;

    /// 심볼의 가장 최근 캔들 시각.
    async fn latest_timestamp(&self, symbol: &str) -> Result<Option<i64>>;

    /// 저장된 심볼 목록 (오름차순).
    async fn symbols(&self) -> Result<Vec<String>>;

    /// 캔들 삭제. `symbol`이 없으면 전체 삭제.
    async fn delete_candles(&self, symbol: Option<&str>) -> Result<u64>;

    /// 저장된 전체 캔들 수.
    async fn count(&self) -> Result<u64>;

    /// 저장소 연결 확인. 기본 구현은 항상 성공합니다.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    /// 저장소 종류 이름 ("postgres", "memory").
    fn backend(&self) -> &'static str;
}

/// `(symbol, timestamp)`가 같은 캔들을 하나로 합칩니다.
///
/// 안정 정렬 후 같은 키의 마지막(나중에 전달된) 캔들만 남기며,
/// 결과는 `(symbol, timestamp)` 오름차순입니다. 버려진 개수를 함께 반환합니다.
pub fn collapse_duplicates(mut candles: Vec<Candle>) -> (Vec<Candle>, usize) {
    candles.sort_by(|a, b| a.key().cmp(&b.key()));

    let before = candles.len();
    let mut collapsed: Vec<Candle> = Vec::with_capacity(before);
    for candle in candles {
        match collapsed.last_mut() {
            Some(last) if last.key() == candle.key() => *last = candle,
            _ => collapsed.push(candle),
        }
    }

    let dropped = before - collapsed.len();
    (collapsed, dropped)
}
