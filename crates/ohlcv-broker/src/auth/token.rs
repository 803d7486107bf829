use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 토큰 갱신 임계값 (남은 시간이 이 값 이하이면 갱신).
pub const REFRESH_THRESHOLD_SECS: i64 = 60;

/// 만료 추적이 포함된 토큰 상태.
///
/// 토큰 파일에는 `{accessToken, refreshToken, expiresAt}` JSON으로 저장됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// 접근 토큰
    pub access_token: String,
    /// 갱신 토큰
    pub refresh_token: String,
    /// 만료 시각 (epoch 밀리초)
    pub expires_at: i64,
}

impl Token {
    /// 새 토큰 상태 생성.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
        }
    }

    /// 지금부터 `ttl_secs` 후 만료되는 토큰 생성.
    pub fn expiring_in(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        ttl_secs: i64,
    ) -> Self {
        let expires_at = Utc::now().timestamp_millis() + ttl_secs * 1000;
        Self::new(access_token, refresh_token, expires_at)
    }

    /// 만료 시각을 UTC 날짜시간으로 반환.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expires_at)
    }

    /// 주어진 시각 기준으로 곧 만료되는지 확인.
    pub fn is_expiring_at(&self, now_ms: i64) -> bool {
        self.expires_at - now_ms <= REFRESH_THRESHOLD_SECS * 1000
    }

    /// 토큰이 만료되었거나 60초 안에 만료되는지 확인.
    pub fn is_expiring(&self) -> bool {
        self.is_expiring_at(Utc::now().timestamp_millis())
    }
}
