//! 히스토리 동기화 파이프라인.
//!
//! 조회 → 정렬 → 같은 시각 중복 제거 → upsert 순서로 처리합니다.
//! 일부 구간이 실패해도 조회된 캔들은 저장하고, 실패 내역은 통계에 남깁니다.

use chrono::{DateTime, Duration, NaiveDate};
use ohlcv_broker::HistoryFetcher;
use ohlcv_core::{sync_span, Resolution};
use ohlcv_data::storage::collapse_duplicates;
use ohlcv_data::CandleStore;
use std::time::Instant;
use tracing::{error, info, warn, Instrument};

use crate::{FailedChunk, Result, SyncStats};

/// `[start, end]` 범위의 캔들을 조회하여 저장합니다.
///
/// # Errors
/// - 인증 에러, 잘못된 범위, 저장 실패는 에러로 반환
///
/// 구간 단위 실패는 에러가 아니며 `SyncStats::chunks_failed`로 보고됩니다.
pub async fn sync_history(
    fetcher: &HistoryFetcher,
    store: &dyn CandleStore,
    symbol: &str,
    resolution: Resolution,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<SyncStats> {
    let span = sync_span!("sync_history", symbol, resolution);

    async move {
        let started = Instant::now();
        let mut stats = SyncStats::new(symbol, resolution);

        let outcome = fetcher.fetch_range(symbol, resolution, start, end).await?;

        stats.fetched = outcome.candles.len();
        stats.malformed = outcome.malformed;
        stats.chunks_total = outcome.chunks_total;
        stats.chunks_failed = outcome.failures.len();
        stats.failed_chunks = outcome
            .failures
            .iter()
            .map(|f| FailedChunk {
                from: f.chunk.from,
                to: f.chunk.to,
                error: f.error.to_string(),
            })
            .collect();

        let (candles, skipped) = collapse_duplicates(outcome.candles);
        stats.skipped = skipped;

        if !candles.is_empty() {
            let summary = store.upsert_candles(&candles).await?;
            stats.inserted = summary.inserted;
            stats.updated = summary.updated;
        }

        stats.set_elapsed(started.elapsed());
        stats.log_summary();
        Ok(stats)
    }
    .instrument(span)
    .await
}

/// 여러 심볼을 순서대로 동기화합니다.
///
/// 한 심볼이 실패해도 나머지를 계속 진행합니다. 인증 에러는 남은 심볼도 모두 실패하므로
/// 그 자리에서 중단하며, 반환값에는 시도한 심볼만 순서대로 담깁니다.
pub async fn sync_symbols(
    fetcher: &HistoryFetcher,
    store: &dyn CandleStore,
    symbols: &[String],
    resolution: Resolution,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<(String, Result<SyncStats>)> {
    let mut results = Vec::with_capacity(symbols.len());

    for (idx, symbol) in symbols.iter().enumerate() {
        info!(
            symbol = %symbol,
            progress = format!("{}/{}", idx + 1, symbols.len()),
            "동기화 시작"
        );

        let synced = sync_history(fetcher, store, symbol, resolution, start, end).await;
        let auth_failed = matches!(&synced, Err(e) if e.is_auth_error());
        if let Err(e) = &synced {
            error!(symbol = %symbol, error = %e, "Symbol sync failed");
        }
        results.push((symbol.clone(), synced));

        if auth_failed {
            warn!(
                skipped = symbols.len() - idx - 1,
                "Authentication failed, skipping remaining symbols"
            );
            break;
        }
    }

    results
}

/// 증분 수집 시작일 계산.
///
/// 저장된 마지막 캔들이 있으면 그 날짜부터 다시 조회하여 미완성 캔들을 덮어쓰고,
/// 없으면 `lookback_days`만큼 거슬러 올라갑니다. 결과는 `today`를 넘지 않습니다.
pub async fn incremental_start(
    store: &dyn CandleStore,
    symbol: &str,
    lookback_days: u32,
    today: NaiveDate,
) -> Result<NaiveDate> {
    let latest = store
        .latest_timestamp(symbol)
        .await?
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.date_naive());

    let start = match latest {
        Some(date) => date.min(today),
        None => today - Duration::days(i64::from(lookback_days)),
    };

    Ok(start)
}
