//! 환경변수 기반 설정 모듈.

use ohlcv_broker::BrokerConfig;
use ohlcv_core::config::{env_var_opt, env_var_parse, parse_csv_list};
use ohlcv_core::Resolution;
use std::time::Duration;

use crate::{CollectorError, Result};

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL (없으면 메모리 저장소)
    pub database_url: Option<String>,
    /// 증권사 API 설정
    pub broker: BrokerConfig,
    /// 폴러 설정
    pub poller: PollerConfig,
}

/// 폴러 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// 수집 대상 심볼
    pub symbols: Vec<String>,
    /// 수집 해상도
    pub resolution: Resolution,
    /// 수집 주기 (초)
    pub interval_secs: u64,
    /// 저장된 캔들이 없을 때 거슬러 올라갈 일수
    pub lookback_days: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            resolution: Resolution::D1,
            interval_secs: 300,
            lookback_days: 30,
        }
    }
}

impl PollerConfig {
    /// 수집 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// 환경변수에서 폴러 설정 로드
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let resolution = match env_var_opt::<String>("POLL_RESOLUTION") {
            Some(code) => code
                .parse()
                .map_err(|e| CollectorError::Config(format!("POLL_RESOLUTION: {}", e)))?,
            None => defaults.resolution,
        };

        Ok(Self {
            symbols: env_var_opt::<String>("POLL_SYMBOLS")
                .map(|v| parse_csv_list(&v))
                .unwrap_or_default(),
            resolution,
            interval_secs: env_var_parse("POLL_INTERVAL_SECS", defaults.interval_secs),
            lookback_days: env_var_parse("POLL_LOOKBACK_DAYS", defaults.lookback_days),
        })
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드 (`.env` 파일 포함)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let broker =
            BrokerConfig::from_env().map_err(|e| CollectorError::Config(e.to_string()))?;

        Ok(Self {
            database_url: env_var_opt("DATABASE_URL"),
            broker,
            poller: PollerConfig::from_env()?,
        })
    }
}
