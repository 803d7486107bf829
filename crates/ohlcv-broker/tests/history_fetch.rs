//! 구간 분할 히스토리 조회 통합 테스트.

use chrono::NaiveDate;
use mockito::{Matcher, Mock, Server};
use ohlcv_broker::{
    BrokerClient, BrokerConfig, BrokerError, HistoryFetcher, MemoryTokenStore, Token, TokenManager,
};
use ohlcv_core::Resolution;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

const SYMBOL: &str = "NSE:SBIN-EQ";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn fetcher(server: &Server, store: MemoryTokenStore) -> HistoryFetcher {
    capped_fetcher(server, store, 90)
}

fn capped_fetcher(server: &Server, store: MemoryTokenStore, cap: u32) -> HistoryFetcher {
    let config = BrokerConfig::new("APP-100", "secret")
        .with_base_urls(server.url(), server.url())
        .with_chunk_days_cap(cap);
    let tokens = TokenManager::new(config, Arc::new(store)).unwrap();
    HistoryFetcher::new(BrokerClient::new(tokens).unwrap()).with_chunk_delay(Duration::ZERO)
}

fn logged_in() -> MemoryTokenStore {
    MemoryTokenStore::with_token(Token::expiring_in("access-1", "refresh-1", 3600))
}

async fn history_mock(
    server: &mut Server,
    range_from: &str,
    range_to: &str,
    status: usize,
    body: serde_json::Value,
) -> Mock {
    server
        .mock("GET", Matcher::Regex("^/history".to_string()))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), SYMBOL.into()),
            Matcher::UrlEncoded("resolution".into(), "D".into()),
            Matcher::UrlEncoded("range_from".into(), range_from.into()),
            Matcher::UrlEncoded("range_to".into(), range_to.into()),
        ]))
        .match_header("authorization", "APP-100:access-1")
        .with_status(status)
        .with_body(body.to_string())
        .expect(1)
        .create_async()
        .await
}

#[tokio::test]
async fn long_range_is_split_and_partial_failures_are_recorded() {
    let mut server = Server::new_async().await;

    // 2024-01-01부터 200일: 90 + 90 + 20일
    let first = history_mock(
        &mut server,
        "2024-01-01",
        "2024-03-30",
        200,
        json!({
            "s": "ok",
            "candles": [
                [1_704_153_600, 600.5, 610, 598, 605, 1000],
                [1_704_067_200, 590, 601, 589.5, 600, 900]
            ]
        }),
    )
    .await;
    let second = history_mock(
        &mut server,
        "2024-03-31",
        "2024-06-28",
        500,
        json!({"s": "error", "message": "internal error"}),
    )
    .await;
    let third = history_mock(
        &mut server,
        "2024-06-29",
        "2024-07-18",
        200,
        json!({
            "s": "ok",
            "candles": [
                [1_719_619_200, 800, 805, 795, 801, 700],
                [1_719_705_600, "bad", 1, 1, 1, 1]
            ]
        }),
    )
    .await;

    let outcome = fetcher(&server, logged_in())
        .fetch_range(SYMBOL, Resolution::D1, date(2024, 1, 1), date(2024, 7, 18))
        .await
        .unwrap();

    first.assert_async().await;
    second.assert_async().await;
    third.assert_async().await;

    assert_eq!(outcome.chunks_total, 3);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].chunk.from, date(2024, 3, 31));
    assert_eq!(outcome.failures[0].error.upstream_status(), Some(500));
    assert_eq!(outcome.malformed, 1);

    let timestamps: Vec<i64> = outcome.candles.iter().map(|c| c.timestamp).collect();
    assert_eq!(timestamps, vec![1_704_067_200, 1_704_153_600, 1_719_619_200]);
    assert_eq!(outcome.candles[0].low, dec!(589.5));
    assert!(outcome.candles.iter().all(|c| c.symbol == SYMBOL));
}

#[tokio::test]
async fn no_data_chunk_is_empty_not_failed() {
    let mut server = Server::new_async().await;
    let mock = history_mock(
        &mut server,
        "2024-01-01",
        "2024-01-10",
        200,
        json!({"s": "no_data", "candles": []}),
    )
    .await;

    let outcome = fetcher(&server, logged_in())
        .fetch_range(SYMBOL, Resolution::D1, date(2024, 1, 1), date(2024, 1, 10))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(outcome.chunks_total, 1);
    assert!(outcome.candles.is_empty());
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn api_error_body_is_a_chunk_failure() {
    let mut server = Server::new_async().await;
    history_mock(
        &mut server,
        "2024-01-01",
        "2024-01-10",
        200,
        json!({"s": "error", "code": -300, "message": "invalid symbol"}),
    )
    .await;

    let outcome = fetcher(&server, logged_in())
        .fetch_range(SYMBOL, Resolution::D1, date(2024, 1, 1), date(2024, 1, 10))
        .await
        .unwrap();

    match &outcome.failures[0].error {
        BrokerError::ApiError { code, message } => {
            assert_eq!(*code, -300);
            assert_eq!(message, "invalid symbol");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn missing_token_aborts_before_any_request() {
    let mut server = Server::new_async().await;
    let history = server
        .mock("GET", Matcher::Regex("^/history".to_string()))
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let result = fetcher(&server, MemoryTokenStore::new())
        .fetch_range(SYMBOL, Resolution::D1, date(2024, 1, 1), date(2024, 12, 31))
        .await;

    assert!(matches!(result, Err(BrokerError::TokenMissing)));
    history.assert_async().await;
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let server = Server::new_async().await;

    let result = fetcher(&server, logged_in())
        .fetch_range(SYMBOL, Resolution::D1, date(2024, 2, 1), date(2024, 1, 1))
        .await;

    assert!(matches!(result, Err(BrokerError::InvalidRange(_))));
}

#[tokio::test]
async fn intraday_chunks_respect_the_smaller_limit() {
    let server = Server::new_async().await;
    let fetcher = capped_fetcher(&server, logged_in(), 1000);

    assert_eq!(fetcher.chunk_days(Resolution::M5), 100);
    assert_eq!(fetcher.chunk_days(Resolution::D1), 366);
}

/// 요청이 들어온 순서를 `(symbol, 시각)`으로 기록하는 `/history` mock.
async fn recording_mock(
    server: &mut Server,
    hits: Arc<std::sync::Mutex<Vec<(String, Instant)>>>,
) -> Mock {
    server
        .mock("GET", Matcher::Regex("^/history".to_string()))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body_from_request(move |request| {
            let query = request.path_and_query().to_string();
            let symbol = query
                .split('&')
                .find_map(|pair| pair.split_once("symbol=").map(|(_, v)| v.to_string()))
                .unwrap_or_default();
            hits.lock().unwrap().push((symbol, Instant::now()));
            json!({"s": "ok", "candles": []}).to_string().into_bytes()
        })
        .create_async()
        .await
}

#[tokio::test]
async fn chunks_are_spaced_by_the_delay_without_trailing_sleep() {
    let mut server = Server::new_async().await;
    let hits = Arc::new(std::sync::Mutex::new(Vec::new()));
    recording_mock(&mut server, Arc::clone(&hits)).await;

    // 6일, 청크 2일: 3개 구간, 딜레이 2번
    let fetcher =
        capped_fetcher(&server, logged_in(), 2).with_chunk_delay(Duration::from_millis(100));

    let started = Instant::now();
    let outcome = fetcher
        .fetch_range(SYMBOL, Resolution::D1, date(2024, 1, 1), date(2024, 1, 6))
        .await
        .unwrap();
    let finished = Instant::now();

    assert_eq!(outcome.chunks_total, 3);
    assert!(finished - started >= Duration::from_millis(200));

    let hits = hits.lock().unwrap();
    assert_eq!(hits.len(), 3);
    for pair in hits.windows(2) {
        assert!(pair[1].1 - pair[0].1 >= Duration::from_millis(100));
    }
    // 마지막 구간 뒤에는 대기하지 않음
    assert!(finished - hits[2].1 < Duration::from_millis(100));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_ranges_on_shared_fetcher_do_not_interleave() {
    let mut server = Server::new_async().await;
    let hits = Arc::new(std::sync::Mutex::new(Vec::new()));
    recording_mock(&mut server, Arc::clone(&hits)).await;

    let fetcher =
        capped_fetcher(&server, logged_in(), 2).with_chunk_delay(Duration::from_millis(50));

    let first = {
        let fetcher = fetcher.clone();
        tokio::spawn(async move {
            fetcher
                .fetch_range("AAA", Resolution::D1, date(2024, 1, 1), date(2024, 1, 4))
                .await
        })
    };
    let second = {
        let fetcher = fetcher.clone();
        tokio::spawn(async move {
            fetcher
                .fetch_range("BBB", Resolution::D1, date(2024, 1, 1), date(2024, 1, 4))
                .await
        })
    };
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let order: Vec<String> = hits.lock().unwrap().iter().map(|(s, _)| s.clone()).collect();
    assert_eq!(order.len(), 4);
    // 한 범위의 구간이 모두 끝난 뒤에 다른 범위가 시작됨
    assert_eq!(order[0], order[1]);
    assert_eq!(order[2], order[3]);
    assert_ne!(order[1], order[2]);
}
