//! 구간 분할 히스토리 조회.
//!
//! 업스트림 `/history` 엔드포인트는 요청 1회당 조회 기간이 제한되어 있습니다.
//! 요청 범위를 한도 이하의 구간으로 나눈 뒤 **순차적으로** 조회하고,
//! 구간 사이에는 고정 딜레이를 두어 요청 한도를 지킵니다.
//!
//! 한 구간이 실패해도 전체 조회를 중단하지 않고 기록 후 건너뜁니다.
//! 단, 인증 에러(토큰 없음, 갱신 실패)는 남은 구간도 모두 실패하므로 즉시 반환합니다.

use chrono::NaiveDate;
use ohlcv_core::{chunk_date_range, Candle, CoreError, DateChunk, Resolution};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{BrokerClient, BrokerError, BrokerResult};

/// `/history` 응답.
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    s: String,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    candles: Vec<Vec<Value>>,
}

/// 구간 하나의 조회 결과.
#[derive(Debug, Clone, Default)]
pub struct ChunkCandles {
    /// 파싱된 캔들
    pub candles: Vec<Candle>,
    /// 형식이 잘못되어 버린 행 수
    pub malformed: usize,
}

/// 실패한 구간 정보.
#[derive(Debug, Clone)]
pub struct ChunkFailure {
    /// 실패한 구간
    pub chunk: DateChunk,
    /// 에러 내용
    pub error: BrokerError,
}

/// 전체 범위 조회 결과.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// 시간 오름차순으로 정렬된 캔들
    pub candles: Vec<Candle>,
    /// 전체 구간 수
    pub chunks_total: usize,
    /// 실패한 구간
    pub failures: Vec<ChunkFailure>,
    /// 형식이 잘못되어 버린 행 수
    pub malformed: usize,
}

/// 히스토리 조회기.
///
/// 복제본은 범위 잠금을 공유하므로 폴러와 수동 동기화의 구간 요청이 섞이지 않습니다.
#[derive(Clone)]
pub struct HistoryFetcher {
    client: BrokerClient,
    chunk_days_cap: Option<u32>,
    chunk_delay: Duration,
    range_lock: Arc<Mutex<()>>,
}

impl HistoryFetcher {
    /// 클라이언트 설정(청크 상한, 딜레이)으로 조회기 생성.
    pub fn new(client: BrokerClient) -> Self {
        let config = client.tokens().config();
        let chunk_days_cap = config.chunk_days_cap;
        let chunk_delay = config.chunk_delay();

        Self {
            client,
            chunk_days_cap,
            chunk_delay,
            range_lock: Arc::new(Mutex::new(())),
        }
    }

    /// 청크 간 딜레이 변경.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// 해상도에 맞는 청크 일수.
    pub fn chunk_days(&self, resolution: Resolution) -> u32 {
        resolution.chunk_days(self.chunk_days_cap)
    }

    /// `[start, end]` 범위의 캔들을 구간별로 순차 조회합니다.
    ///
    /// # Errors
    /// - 범위가 잘못되면 `InvalidRange`
    /// - 인증 에러는 남은 구간을 조회하지 않고 반환
    ///
    /// 그 외 구간 에러는 `FetchOutcome::failures`에 기록됩니다.
    pub async fn fetch_range(
        &self,
        symbol: &str,
        resolution: Resolution,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BrokerResult<FetchOutcome> {
        let chunks = chunk_date_range(start, end, self.chunk_days(resolution))?;
        let _range_guard = self.range_lock.lock().await;
        let mut outcome = FetchOutcome {
            chunks_total: chunks.len(),
            ..Default::default()
        };

        info!(
            symbol,
            %resolution,
            %start,
            %end,
            chunks = chunks.len(),
            "Fetching history"
        );

        for (idx, chunk) in chunks.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(self.chunk_delay).await;
            }

            match self.fetch_chunk(symbol, resolution, *chunk).await {
                Ok(fetched) => {
                    debug!(
                        symbol,
                        chunk = %chunk,
                        progress = format!("{}/{}", idx + 1, chunks.len()),
                        candles = fetched.candles.len(),
                        "Chunk fetched"
                    );
                    outcome.malformed += fetched.malformed;
                    outcome.candles.extend(fetched.candles);
                }
                Err(e) if e.is_auth_error() => {
                    warn!(
                        symbol,
                        chunk = %chunk,
                        error = %e,
                        "Authentication failed, aborting range"
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        symbol,
                        chunk = %chunk,
                        status = ?e.upstream_status(),
                        error = %e,
                        "Chunk fetch failed, skipping"
                    );
                    outcome.failures.push(ChunkFailure {
                        chunk: *chunk,
                        error: e,
                    });
                }
            }
        }

        // 구간 응답 순서가 시간 순서를 보장하지 않음
        outcome.candles.sort_by_key(|c| c.timestamp);

        info!(
            symbol,
            candles = outcome.candles.len(),
            failed_chunks = outcome.failures.len(),
            malformed = outcome.malformed,
            "History fetch finished"
        );

        Ok(outcome)
    }

    /// 구간 하나를 조회합니다.
    pub async fn fetch_chunk(
        &self,
        symbol: &str,
        resolution: Resolution,
        chunk: DateChunk,
    ) -> BrokerResult<ChunkCandles> {
        let url = self.client.tokens().config().data_url("history");
        let query = [
            ("symbol", symbol.to_string()),
            ("resolution", resolution.as_api_code().to_string()),
            ("date_format", "1".to_string()),
            ("range_from", chunk.from.format("%Y-%m-%d").to_string()),
            ("range_to", chunk.to.format("%Y-%m-%d").to_string()),
            ("cont_flag", "1".to_string()),
        ];

        let resp: HistoryResponse = self.client.get_json(&url, &query).await?;

        if resp.s == "no_data" {
            return Ok(ChunkCandles::default());
        }
        if resp.s != "ok" {
            return Err(BrokerError::ApiError {
                code: resp.code.unwrap_or(-1),
                message: resp.message.unwrap_or(resp.s),
            });
        }

        let mut fetched = ChunkCandles::default();
        for row in &resp.candles {
            match parse_candle_row(symbol, row) {
                Ok(candle) => fetched.candles.push(candle),
                Err(e) => {
                    debug!(symbol, error = %e, "Dropping malformed candle row");
                    fetched.malformed += 1;
                }
            }
        }

        Ok(fetched)
    }
}

/// `[timestamp, open, high, low, close, volume]` 행을 캔들로 변환.
pub fn parse_candle_row(symbol: &str, row: &[Value]) -> Result<Candle, CoreError> {
    if row.len() < 6 {
        return Err(CoreError::InvalidCandle(format!(
            "필드 수 부족: {}개",
            row.len()
        )));
    }

    let timestamp = match &row[0] {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| CoreError::InvalidCandle(format!("잘못된 타임스탬프: {}", n)))?,
        other => {
            return Err(CoreError::InvalidCandle(format!(
                "잘못된 타임스탬프: {}",
                other
            )))
        }
    };

    Ok(Candle {
        symbol: symbol.to_string(),
        timestamp,
        open: value_to_decimal(&row[1])?,
        high: value_to_decimal(&row[2])?,
        low: value_to_decimal(&row[3])?,
        close: value_to_decimal(&row[4])?,
        volume: value_to_decimal(&row[5])?,
    })
}

/// JSON 숫자/문자열을 Decimal로 변환.
fn value_to_decimal(value: &Value) -> Result<Decimal, CoreError> {
    let parsed = match value {
        // 숫자 원문을 그대로 파싱해야 f64 이진 오차가 섞이지 않음
        Value::Number(n) => n
            .to_string()
            .parse::<Decimal>()
            .ok()
            .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok())),
        Value::String(s) => s.parse::<Decimal>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| CoreError::InvalidCandle(format!("잘못된 숫자: {}", value)))
}
