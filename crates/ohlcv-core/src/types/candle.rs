//! OHLCV 캔들 타입.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 특정 심볼의 OHLCV 캔들 한 개.
///
/// `(symbol, timestamp)` 쌍이 저장소의 유일 키입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// 거래 심볼 (예: "NSE:SBIN-EQ")
    pub symbol: String,
    /// 캔들 시작 시각 (Unix 초)
    pub timestamp: i64,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: Decimal,
}

impl Candle {
    /// 새 캔들을 생성합니다.
    pub fn new(
        symbol: impl Into<String>,
        timestamp: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 캔들 시작 시각을 UTC 날짜시간으로 반환합니다.
    pub fn open_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    /// 저장소 유일 키.
    pub fn key(&self) -> (&str, i64) {
        (&self.symbol, self.timestamp)
    }
}
