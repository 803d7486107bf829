//! 모든 핸들러에서 공유되는 애플리케이션 상태.

use chrono::{DateTime, Utc};
use ohlcv_broker::{HistoryFetcher, TokenManager};
use ohlcv_collector::{CollectorContext, Poller};
use ohlcv_core::Resolution;
use ohlcv_data::CandleStore;
use std::sync::Arc;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 토큰 관리자 - 로그인, 로그아웃, 토큰 상태
    pub tokens: TokenManager,
    /// 히스토리 조회기 - 수동 동기화
    pub fetcher: HistoryFetcher,
    /// 캔들 저장소
    pub store: Arc<dyn CandleStore>,
    /// 증분 수집 폴러
    pub poller: Poller,
    /// 해상도가 지정되지 않은 동기화 요청에 사용
    pub default_resolution: Resolution,
    /// 서버 시작 시각
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn from_context(ctx: &CollectorContext) -> Self {
        Self {
            tokens: ctx.tokens.clone(),
            fetcher: ctx.fetcher.clone(),
            store: Arc::clone(&ctx.store),
            poller: ctx.poller(),
            default_resolution: ctx.config.poller.resolution,
            started_at: Utc::now(),
        }
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

/// 테스트용 상태 생성 (메모리 토큰/캔들 저장소, 업스트림은 `base_url`).
#[cfg(test)]
pub fn create_test_state(
    base_url: &str,
    token: Option<ohlcv_broker::Token>,
    symbols: Vec<String>,
) -> AppState {
    use ohlcv_broker::{BrokerClient, BrokerConfig, MemoryTokenStore};
    use ohlcv_collector::PollerConfig;
    use ohlcv_data::MemoryCandleStore;
    use std::time::Duration;

    let config = BrokerConfig::new("APP-100", "secret").with_base_urls(base_url, base_url);
    let token_store = match token {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::new(),
    };
    let tokens = TokenManager::new(config, Arc::new(token_store)).unwrap();
    let fetcher = HistoryFetcher::new(BrokerClient::new(tokens.clone()).unwrap())
        .with_chunk_delay(Duration::ZERO);
    let store: Arc<dyn CandleStore> = Arc::new(MemoryCandleStore::new());
    let poller = Poller::new(
        fetcher.clone(),
        Arc::clone(&store),
        PollerConfig {
            symbols,
            interval_secs: 3600,
            ..Default::default()
        },
    );

    AppState {
        tokens,
        fetcher,
        store,
        poller,
        default_resolution: Resolution::D1,
        started_at: Utc::now(),
    }
}
