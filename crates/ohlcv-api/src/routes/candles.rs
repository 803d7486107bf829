//! 캔들 조회 API 엔드포인트
//!
//! - `GET /api/v1/candles` - 페이지 단위 조회
//! - `GET /api/v1/candles/export` - 조건에 맞는 전체 캔들을 CSV로 내보내기
//!
//! `from`/`to`는 Unix 초 또는 `YYYY-MM-DD`를 받습니다. 날짜만 준 `to`는 그 날의 마지막 초까지 포함합니다.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use ohlcv_core::Candle;
use ohlcv_data::{CandlePage, CandleQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// CSV 헤더 (컬럼 순서 고정)
const CSV_HEADER: [&str; 7] = ["symbol", "timestamp", "open", "high", "low", "close", "volume"];

/// 조회 쿼리 파라미터
#[derive(Debug, Default, Deserialize)]
pub struct CandleParams {
    pub symbol: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl CandleParams {
    fn to_query(&self) -> ApiResult<CandleQuery> {
        let from = self
            .from
            .as_deref()
            .map(|v| parse_time_bound(v, false))
            .transpose()?;
        let to = self
            .to
            .as_deref()
            .map(|v| parse_time_bound(v, true))
            .transpose()?;

        let query = CandleQuery {
            symbol: self.symbol.clone().filter(|s| !s.trim().is_empty()),
            from,
            to,
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        };
        Ok(query.normalized()?)
    }
}

/// 시간 경계 파싱. Unix 초 또는 `YYYY-MM-DD`.
fn parse_time_bound(value: &str, end_of_day: bool) -> ApiResult<i64> {
    let value = value.trim();
    if let Ok(ts) = value.parse::<i64>() {
        return Ok(ts);
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::bad_request(format!(
            "invalid time bound '{}': expected unix seconds or YYYY-MM-DD",
            value
        ))
    })?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc().timestamp())
        .ok_or_else(|| ApiError::bad_request(format!("invalid date '{}'", value)))
}

/// GET /api/v1/candles
pub async fn list_candles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CandleParams>,
) -> ApiResult<Json<CandlePage>> {
    let query = params.to_query()?;
    Ok(Json(state.store.query_candles(&query).await?))
}

/// GET /api/v1/candles/export
pub async fn export_candles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CandleParams>,
) -> ApiResult<impl IntoResponse> {
    let mut query = params.to_query()?;
    query.page = 1;
    query.page_size = MAX_PAGE_SIZE;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let mut rows = 0usize;
    loop {
        let page = state.store.query_candles(&query).await?;
        for candle in &page.items {
            write_candle(&mut writer, candle)?;
        }
        rows += page.items.len();
        if !page.has_next() {
            break;
        }
        query.page += 1;
    }

    let body = writer
        .into_inner()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    tracing::debug!(rows, symbol = ?query.symbol, "Candles exported");

    let filename = match &query.symbol {
        Some(symbol) => format!("candles_{}.csv", symbol.replace(':', "_")),
        None => "candles.csv".to_string(),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    ))
}

fn write_candle(writer: &mut csv::Writer<Vec<u8>>, candle: &Candle) -> ApiResult<()> {
    writer
        .write_record([
            candle.symbol.clone(),
            candle.timestamp.to_string(),
            candle.open.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.close.to_string(),
            candle.volume.to_string(),
        ])
        .map_err(|e| ApiError::internal(e.to_string()))
}

pub fn candles_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_candles))
        .route("/export", get(export_candles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::{body::Body, http::Request, http::StatusCode};
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    // 2024-01-01, 2024-01-02, 2024-01-03 00:00 UTC
    const DAY1: i64 = 1_704_067_200;
    const DAY2: i64 = 1_704_153_600;
    const DAY3: i64 = 1_704_240_000;

    async fn seeded_router() -> Router {
        let state = Arc::new(create_test_state("http://127.0.0.1:9", None, vec![]));
        let seeds = [
            ("NSE:SBIN-EQ", DAY1),
            ("NSE:SBIN-EQ", DAY2),
            ("NSE:SBIN-EQ", DAY3),
            ("NSE:TCS-EQ", DAY1),
        ];
        let candles: Vec<Candle> = seeds
            .into_iter()
            .map(|(symbol, ts)| {
                Candle::new(symbol, ts, dec!(10), dec!(12), dec!(9), dec!(11.5), dec!(1000))
            })
            .collect();
        state.store.upsert_candles(&candles).await.unwrap();
        candles_router().with_state(state)
    }

    async fn send_get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    #[test]
    fn test_parse_time_bound() {
        assert_eq!(parse_time_bound("1704067200", false).unwrap(), DAY1);
        assert_eq!(parse_time_bound("2024-01-01", false).unwrap(), DAY1);
        assert_eq!(parse_time_bound("2024-01-01", true).unwrap(), DAY2 - 1);
        assert!(parse_time_bound("01/02/2024", false).is_err());
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let (status, body) = send_get(
            seeded_router().await,
            "/?symbol=NSE:SBIN-EQ&from=2024-01-01&to=2024-01-02&page_size=1",
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let page: CandlePage = serde_json::from_slice(&body).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].timestamp, DAY1);
        assert!(page.has_next());
    }

    #[tokio::test]
    async fn test_inverted_range_is_bad_request() {
        let (status, body) =
            send_get(seeded_router().await, "/?from=2024-01-03&to=2024-01-01").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_export_writes_all_rows_as_csv() {
        let app = seeded_router().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/export?symbol=NSE:SBIN-EQ")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv"));
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("candles_NSE_SBIN-EQ.csv"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "symbol,timestamp,open,high,low,close,volume");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "NSE:SBIN-EQ,1704067200,10,12,9,11.5,1000");
    }

    #[tokio::test]
    async fn test_export_empty_has_header_only() {
        let (status, body) = send_get(seeded_router().await, "/export?symbol=NSE:INFY-EQ").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            String::from_utf8(body).unwrap().trim_end(),
            "symbol,timestamp,open,high,low,close,volume"
        );
    }
}
