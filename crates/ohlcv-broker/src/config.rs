//! 증권사 API 설정.
//!
//! 앱 ID와 시크릿을 사용한 OAuth 인증이 필요합니다.
//! 토큰 발급/갱신 요청에는 `sha256("{app_id}:{app_secret}")` 해시가 사용됩니다.

use ohlcv_core::config::{env_var_opt, env_var_parse};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;

use crate::BrokerError;

/// 기본 인증 API 주소.
pub const DEFAULT_AUTH_BASE_URL: &str = "https://api-t1.fyers.in/api/v3";

/// 기본 시세 데이터 API 주소.
pub const DEFAULT_DATA_BASE_URL: &str = "https://api-t1.fyers.in/data";

/// 기본 토큰 파일 경로.
pub const DEFAULT_TOKEN_FILE: &str = ".tokens/broker_token.json";

/// 증권사 API 설정.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// 앱 ID
    pub app_id: String,
    /// 앱 시크릿
    pub app_secret: String,
    /// 토큰 갱신용 PIN (refresh_token grant에 필요)
    pub pin: Option<String>,
    /// 인증 API 기본 URL
    pub auth_base_url: String,
    /// 시세 데이터 API 기본 URL
    pub data_base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 토큰 파일 경로
    pub token_file: PathBuf,
    /// 히스토리 청크 일수 상한 (업스트림 한도보다 작을 때만 적용)
    pub chunk_days_cap: Option<u32>,
    /// 히스토리 청크 간 딜레이 (밀리초)
    pub chunk_delay_ms: u64,
}

impl BrokerConfig {
    /// 새로운 설정 생성 (나머지 값은 기본값).
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            pin: None,
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            data_base_url: DEFAULT_DATA_BASE_URL.to_string(),
            timeout_secs: 30,
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            chunk_days_cap: None,
            chunk_delay_ms: 500,
        }
    }

    /// API 기본 URL 설정 (테스트 서버 등).
    pub fn with_base_urls(mut self, auth: impl Into<String>, data: impl Into<String>) -> Self {
        self.auth_base_url = auth.into().trim_end_matches('/').to_string();
        self.data_base_url = data.into().trim_end_matches('/').to_string();
        self
    }

    /// 갱신용 PIN 설정.
    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    /// 청크 일수 상한 설정.
    pub fn with_chunk_days_cap(mut self, cap: u32) -> Self {
        self.chunk_days_cap = Some(cap);
        self
    }

    /// 환경변수에서 설정 로드.
    ///
    /// # 환경변수
    /// - `BROKER_APP_ID`, `BROKER_APP_SECRET` (필수)
    /// - `BROKER_PIN`
    /// - `BROKER_AUTH_URL`, `BROKER_DATA_URL`
    /// - `BROKER_TIMEOUT_SECS` (기본: 30)
    /// - `TOKEN_FILE` (기본: `.tokens/broker_token.json`)
    /// - `HISTORY_CHUNK_DAYS`, `HISTORY_CHUNK_DELAY_MS` (기본: 500)
    pub fn from_env() -> Result<Self, BrokerError> {
        let app_id = required_env("BROKER_APP_ID")?;
        let app_secret = required_env("BROKER_APP_SECRET")?;

        let mut config = Self::new(app_id, app_secret).with_base_urls(
            std::env::var("BROKER_AUTH_URL").unwrap_or_else(|_| DEFAULT_AUTH_BASE_URL.to_string()),
            std::env::var("BROKER_DATA_URL").unwrap_or_else(|_| DEFAULT_DATA_BASE_URL.to_string()),
        );
        config.pin = env_var_opt("BROKER_PIN");
        config.timeout_secs = env_var_parse("BROKER_TIMEOUT_SECS", 30);
        config.token_file = env_var_opt::<PathBuf>("TOKEN_FILE")
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE));
        config.chunk_days_cap = env_var_opt("HISTORY_CHUNK_DAYS");
        config.chunk_delay_ms = env_var_parse("HISTORY_CHUNK_DELAY_MS", 500);

        Ok(config)
    }

    /// 토큰 요청에 사용하는 앱 ID 해시.
    pub fn app_id_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}", self.app_id, self.app_secret).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// 요청 타임아웃을 Duration으로 반환.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 청크 간 딜레이를 Duration으로 반환.
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    /// 인증 API 엔드포인트 URL.
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/{}", self.auth_base_url, path.trim_start_matches('/'))
    }

    /// 시세 API 엔드포인트 URL.
    pub fn data_url(&self, path: &str) -> String {
        format!("{}/{}", self.data_base_url, path.trim_start_matches('/'))
    }
}

fn required_env(key: &str) -> Result<String, BrokerError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| BrokerError::Config(format!("{} 환경변수가 설정되지 않았습니다", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_id_hash() {
        let config = BrokerConfig::new("APP-100", "secret");
        let hash = config.app_id_hash();

        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        // 같은 입력이면 같은 해시
        assert_eq!(hash, BrokerConfig::new("APP-100", "secret").app_id_hash());
        assert_ne!(hash, BrokerConfig::new("APP-100", "other").app_id_hash());
    }

    #[test]
    fn test_urls() {
        let config =
            BrokerConfig::new("a", "b").with_base_urls("http://localhost:1/", "http://localhost:2");

        assert_eq!(config.auth_url("/validate-authcode"), "http://localhost:1/validate-authcode");
        assert_eq!(config.data_url("history"), "http://localhost:2/history");
    }
}
