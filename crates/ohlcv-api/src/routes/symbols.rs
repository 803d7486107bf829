//! 심볼 API 엔드포인트
//!
//! - `GET /api/v1/symbols` - 저장된 심볼과 마지막 캔들 시각
//! - `POST /api/v1/symbols/{symbol}/sync` - 지정 범위 수동 동기화

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use ohlcv_collector::{sync_history, SyncStats};
use ohlcv_core::Resolution;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 저장된 심볼 요약
#[derive(Debug, Serialize, Deserialize)]
pub struct SymbolSummary {
    pub symbol: String,
    /// 가장 최근 캔들 시각 (Unix 초)
    pub latest_timestamp: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SymbolsResponse {
    pub symbols: Vec<SymbolSummary>,
    pub total: usize,
}

/// 수동 동기화 요청
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub from: NaiveDate,
    /// 없으면 오늘 (UTC)
    pub to: Option<NaiveDate>,
    /// 없으면 폴러 기본 해상도
    pub resolution: Option<Resolution>,
}

/// GET /api/v1/symbols
pub async fn list_symbols(State(state): State<Arc<AppState>>) -> ApiResult<Json<SymbolsResponse>> {
    let names = state.store.symbols().await?;

    let mut symbols = Vec::with_capacity(names.len());
    for symbol in names {
        let latest_timestamp = state.store.latest_timestamp(&symbol).await?;
        symbols.push(SymbolSummary {
            symbol,
            latest_timestamp,
        });
    }

    let total = symbols.len();
    Ok(Json(SymbolsResponse { symbols, total }))
}

/// POST /api/v1/symbols/{symbol}/sync
///
/// 일부 구간 실패는 200 응답의 `chunks_failed`/`failed_chunks`로 보고됩니다.
pub async fn sync_symbol(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Json(request): Json<SyncRequest>,
) -> ApiResult<Json<SyncStats>> {
    let symbol = symbol.trim().to_string();
    if symbol.is_empty() {
        return Err(ApiError::bad_request("symbol is required"));
    }

    let to = request.to.unwrap_or_else(|| Utc::now().date_naive());
    let resolution = request.resolution.unwrap_or(state.default_resolution);

    let stats = sync_history(
        &state.fetcher,
        state.store.as_ref(),
        &symbol,
        resolution,
        request.from,
        to,
    )
    .await?;

    Ok(Json(stats))
}

pub fn symbols_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_symbols))
        .route("/{symbol}/sync", post(sync_symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::{body::Body, http::Request, http::StatusCode};
    use mockito::{Matcher, Server};
    use ohlcv_broker::Token;
    use ohlcv_core::Candle;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tower::ServiceExt;

    fn sync_request(symbol: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/{}/sync", symbol))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_symbols_with_latest() {
        let state = Arc::new(create_test_state("http://127.0.0.1:9", None, vec![]));
        let candles = vec![
            Candle::new("B", 200, dec!(1), dec!(1), dec!(1), dec!(1), dec!(1)),
            Candle::new("A", 100, dec!(1), dec!(1), dec!(1), dec!(1), dec!(1)),
            Candle::new("A", 300, dec!(1), dec!(1), dec!(1), dec!(1), dec!(1)),
        ];
        state.store.upsert_candles(&candles).await.unwrap();

        let response = symbols_router()
            .with_state(state)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let list: SymbolsResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(list.total, 2);
        assert_eq!(list.symbols[0].symbol, "A");
        assert_eq!(list.symbols[0].latest_timestamp, Some(300));
        assert_eq!(list.symbols[1].latest_timestamp, Some(200));
    }

    #[tokio::test]
    async fn test_sync_symbol_stores_candles() {
        let mut server = Server::new_async().await;
        let history = server
            .mock("GET", Matcher::Regex("^/history".to_string()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("symbol".into(), "NSE:SBIN-EQ".into()),
                Matcher::UrlEncoded("resolution".into(), "D".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({"s": "ok", "candles": [
                    [1_704_067_200, 10, 11, 9, 10.5, 100],
                    [1_704_153_600, 10.5, 12, 10, 11, 200]
                ]})
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let state = Arc::new(create_test_state(
            &server.url(),
            Some(Token::expiring_in("access-1", "refresh-1", 3600)),
            vec![],
        ));
        let response = symbols_router()
            .with_state(Arc::clone(&state))
            .oneshot(sync_request(
                "NSE:SBIN-EQ",
                json!({"from": "2024-01-01", "to": "2024-01-05"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        history.assert_async().await;

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let stats: SyncStats = serde_json::from_slice(&body).unwrap();
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.chunks_failed, 0);
        assert_eq!(state.store.latest_timestamp("NSE:SBIN-EQ").await.unwrap(), Some(1_704_153_600));
    }

    #[tokio::test]
    async fn test_sync_without_token_is_unauthorized() {
        let state = Arc::new(create_test_state("http://127.0.0.1:9", None, vec![]));
        let response = symbols_router()
            .with_state(state)
            .oneshot(sync_request("NSE:SBIN-EQ", json!({"from": "2024-01-01"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_sync_inverted_range_is_bad_request() {
        let state = Arc::new(create_test_state(
            "http://127.0.0.1:9",
            Some(Token::expiring_in("access-1", "refresh-1", 3600)),
            vec![],
        ));
        let response = symbols_router()
            .with_state(state)
            .oneshot(sync_request(
                "NSE:SBIN-EQ",
                json!({"from": "2024-02-01", "to": "2024-01-01"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
