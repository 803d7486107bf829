//! 실행 컨텍스트 구성.
//!
//! CLI와 API 서버가 같은 방식으로 토큰 관리자, 히스토리 조회기,
//! 캔들 저장소를 조립하도록 합니다.

use ohlcv_broker::{BrokerClient, FileTokenStore, HistoryFetcher, TokenManager};
use ohlcv_data::{CandleStore, DatabaseConfig, MemoryCandleStore, PgCandleStore};
use std::sync::Arc;
use tracing::warn;

use crate::{CollectorConfig, Poller, Result};

/// 조립된 수집 구성 요소.
#[derive(Clone)]
pub struct CollectorContext {
    pub config: CollectorConfig,
    pub tokens: TokenManager,
    pub fetcher: HistoryFetcher,
    pub store: Arc<dyn CandleStore>,
}

impl CollectorContext {
    /// 설정으로부터 구성 요소를 생성합니다.
    ///
    /// `DATABASE_URL`이 있으면 PostgreSQL에 연결하고 마이그레이션을 실행합니다.
    pub async fn build(config: CollectorConfig) -> Result<Self> {
        let store = open_store(config.database_url.as_deref()).await?;
        Self::with_store(config, store)
    }

    /// 주어진 저장소로 구성 요소를 생성합니다.
    pub fn with_store(config: CollectorConfig, store: Arc<dyn CandleStore>) -> Result<Self> {
        let token_store = Arc::new(FileTokenStore::new(config.broker.token_file.clone()));
        let tokens = TokenManager::new(config.broker.clone(), token_store)?;
        let fetcher = HistoryFetcher::new(BrokerClient::new(tokens.clone())?);

        Ok(Self {
            config,
            tokens,
            fetcher,
            store,
        })
    }

    /// 설정된 심볼을 수집하는 폴러 생성.
    pub fn poller(&self) -> Poller {
        Poller::new(
            self.fetcher.clone(),
            Arc::clone(&self.store),
            self.config.poller.clone(),
        )
    }
}

/// 캔들 저장소 열기.
pub async fn open_store(database_url: Option<&str>) -> Result<Arc<dyn CandleStore>> {
    match database_url {
        Some(url) => {
            let store = PgCandleStore::connect(&DatabaseConfig::new(url)).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL is not set, candles are kept in memory only");
            Ok(Arc::new(MemoryCandleStore::new()))
        }
    }
}
