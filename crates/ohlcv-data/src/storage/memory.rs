//! 메모리 캔들 저장소.
//!
//! `DATABASE_URL`이 없을 때 CLI/API가 사용하며, 테스트에서도 사용합니다.
//! 프로세스가 종료되면 데이터는 사라집니다.

use async_trait::async_trait;
use ohlcv_core::Candle;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::{collapse_duplicates, CandlePage, CandleQuery, CandleStore, UpsertSummary};
use crate::error::Result;

/// `(symbol, timestamp)` 순서로 정렬된 메모리 저장소.
#[derive(Debug, Default)]
pub struct MemoryCandleStore {
    candles: RwLock<BTreeMap<(String, i64), Candle>>,
}

impl MemoryCandleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CandleStore for MemoryCandleStore {
    async fn upsert_candles(&self, candles: &[Candle]) -> Result<UpsertSummary> {
        let (candles, _) = collapse_duplicates(candles.to_vec());
        let mut summary = UpsertSummary::default();
        let mut map = self.candles.write().await;

        for candle in candles {
            let key = (candle.symbol.clone(), candle.timestamp);
            match map.insert(key, candle) {
                Some(_) => summary.updated += 1,
                None => summary.inserted += 1,
            }
        }

        debug!(
            inserted = summary.inserted,
            updated = summary.updated,
            "Candles upserted (memory)"
        );
        Ok(summary)
    }

    async fn query_candles(&self, query: &CandleQuery) -> Result<CandlePage> {
        let query = query.normalized()?;
        let map = self.candles.read().await;

        let matching: Vec<&Candle> = map.values().filter(|c| query.matches(c)).collect();
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .cloned()
            .collect();

        Ok(CandlePage {
            items,
            total,
            page: query.page,
            page_size: query.page_size,
        })
    }

    async fn latest_timestamp(&self, symbol: &str) -> Result<Option<i64>> {
        let map = self.candles.read().await;
        let latest = map
            .range((symbol.to_string(), i64::MIN)..=(symbol.to_string(), i64::MAX))
            .next_back()
            .map(|(_, c)| c.timestamp);
        Ok(latest)
    }

    async fn symbols(&self) -> Result<Vec<String>> {
        let map = self.candles.read().await;
        let mut symbols: Vec<String> = map.keys().map(|(s, _)| s.clone()).collect();
        symbols.dedup();
        Ok(symbols)
    }

    async fn delete_candles(&self, symbol: Option<&str>) -> Result<u64> {
        let mut map = self.candles.write().await;
        let before = map.len();

        match symbol {
            Some(symbol) => map.retain(|(s, _), _| s != symbol),
            None => map.clear(),
        }

        Ok((before - map.len()) as u64)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.candles.read().await.len() as u64)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
