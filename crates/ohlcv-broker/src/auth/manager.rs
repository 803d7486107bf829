//! 토큰 관리자.
//!
//! 처리 기능:
//! - 유효한 접근 토큰 반환, 만료 60초 전부터 갱신 (POST /validate-refresh-token)
//! - 인증 코드로 토큰 발급 (POST /validate-authcode)
//! - 로그아웃 (저장된 토큰 삭제)
//!
//! 동시에 들어온 갱신 요청은 하나의 진행 중 갱신으로 합쳐집니다.
//! 업스트림은 중복 갱신 요청 시 이전 토큰을 무효화할 수 있으므로,
//! 갱신이 진행 중이면 늦게 온 호출자는 같은 결과를 기다립니다.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::store::TokenStore;
use super::token::Token;
use crate::{BrokerConfig, BrokerError, BrokerResult};

/// 응답에 만료 정보가 없을 때 사용하는 토큰 수명 (초).
const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

type RefreshFuture = Shared<BoxFuture<'static, BrokerResult<Token>>>;

/// 토큰 발급/갱신 응답.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    s: Option<String>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl AuthResponse {
    /// 응답 본문이 에러를 보고했는지 확인.
    fn rejection(&self) -> Option<(i64, String)> {
        match self.s.as_deref() {
            Some("ok") | None => None,
            Some(_) => Some((
                self.code.unwrap_or(-1),
                self.message.clone().unwrap_or_else(|| "unknown error".to_string()),
            )),
        }
    }

    /// 토큰 상태로 변환. 갱신 응답에 갱신 토큰이 없으면 기존 값을 유지.
    fn into_token(self, fallback_refresh: Option<&str>) -> Result<Token, String> {
        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "응답에 access_token이 없습니다".to_string())?;
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| fallback_refresh.map(str::to_string))
            .ok_or_else(|| "응답에 refresh_token이 없습니다".to_string())?;
        let ttl = self.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);

        Ok(Token::expiring_in(access_token, refresh_token, ttl))
    }
}

/// 현재 토큰 상태 요약 (API 응답용).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenStatus {
    /// 토큰 존재 여부
    pub present: bool,
    /// 만료 시각
    pub expires_at: Option<DateTime<Utc>>,
    /// 60초 안에 만료되는지 여부
    pub expiring: bool,
}

/// 토큰 수명 주기 관리자.
///
/// 복제 비용이 낮으며 모든 복제본이 같은 토큰 상태와 진행 중 갱신을 공유합니다.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: BrokerConfig,
    http: Client,
    store: Arc<dyn TokenStore>,
    current: RwLock<Option<Token>>,
    inflight: Mutex<Option<RefreshFuture>>,
}

impl TokenManager {
    /// 새로운 토큰 관리자 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `BrokerError::Network`를 반환합니다.
    pub fn new(config: BrokerConfig, store: Arc<dyn TokenStore>) -> BrokerResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BrokerError::Network(format!("HTTP client 생성 실패: {}", e)))?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                http,
                store,
                current: RwLock::new(None),
                inflight: Mutex::new(None),
            }),
        })
    }

    /// 설정 반환.
    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }

    /// 유효한 접근 토큰 반환, 필요시 갱신.
    ///
    /// # Errors
    /// - 저장된 토큰이 없으면 `TokenMissing`
    /// - 갱신이 거부되면 `RefreshFailed` (저장된 토큰은 그대로 유지)
    pub async fn get_valid_access_token(&self) -> BrokerResult<String> {
        let token = self.inner.current_token().await?;

        if !token.is_expiring() {
            debug!(expires_at = ?token.expires_at_utc(), "Using cached access token");
            return Ok(token.access_token);
        }

        warn!(
            expires_at = ?token.expires_at_utc(),
            "Access token expired or expiring soon, refreshing..."
        );
        let refreshed = self.refresh_single_flight(Some(&token.access_token)).await?;
        Ok(refreshed.access_token)
    }

    /// 접근 토큰 강제 갱신.
    ///
    /// 갱신이 이미 진행 중이면 새 요청을 보내지 않고 그 결과를 기다립니다.
    pub async fn refresh_access_token(&self) -> BrokerResult<Token> {
        self.refresh_single_flight(None).await
    }

    /// 401 응답을 받은 뒤 호출하여 새 접근 토큰을 얻습니다.
    ///
    /// 다른 호출자가 이미 갱신을 마쳐 현재 토큰이 거부된 토큰과 다르면
    /// 업스트림을 다시 호출하지 않고 현재 토큰을 반환합니다.
    pub async fn refresh_after_unauthorized(
        &self,
        rejected_access_token: &str,
    ) -> BrokerResult<String> {
        let token = self
            .refresh_single_flight(Some(rejected_access_token))
            .await?;
        Ok(token.access_token)
    }

    /// 인증 코드를 토큰으로 교환하고 저장합니다 (로그인).
    pub async fn exchange_auth_code(&self, auth_code: &str) -> BrokerResult<Token> {
        if auth_code.trim().is_empty() {
            return Err(BrokerError::Config("auth_code가 비어 있습니다".to_string()));
        }

        info!("Exchanging auth code for access token...");

        let url = self.inner.config.auth_url("validate-authcode");
        let body = serde_json::json!({
            "grant_type": "authorization_code",
            "appIdHash": self.inner.config.app_id_hash(),
            "code": auth_code,
        });

        let response = self.inner.http.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("Auth code exchange failed: {} - {}", status, text);
            return Err(BrokerError::UpstreamRequestFailed {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: AuthResponse = serde_json::from_str(&text)?;
        if let Some((code, message)) = parsed.rejection() {
            error!(code, %message, "Auth code rejected");
            return Err(BrokerError::ApiError { code, message });
        }

        let token = parsed.into_token(None).map_err(BrokerError::Parse)?;
        self.inner.store.save(&token).await?;
        *self.inner.current.write().await = Some(token.clone());

        info!(expires_at = ?token.expires_at_utc(), "Access token obtained");
        Ok(token)
    }

    /// 메모리와 저장소의 토큰을 삭제합니다 (로그아웃).
    pub async fn logout(&self) -> BrokerResult<()> {
        *self.inner.current.write().await = None;
        self.inner.store.clear().await?;
        info!("Token cleared");
        Ok(())
    }

    /// 현재 토큰 상태 요약.
    pub async fn status(&self) -> BrokerResult<TokenStatus> {
        match self.inner.current_token().await {
            Ok(token) => Ok(TokenStatus {
                present: true,
                expires_at: token.expires_at_utc(),
                expiring: token.is_expiring(),
            }),
            Err(BrokerError::TokenMissing) => Ok(TokenStatus {
                present: false,
                expires_at: None,
                expiring: false,
            }),
            Err(e) => Err(e),
        }
    }

    /// 진행 중인 갱신에 합류하거나 새 갱신을 시작합니다.
    ///
    /// `stale`이 주어지면 슬롯 잠금을 얻은 뒤 현재 토큰을 다시 확인하여,
    /// 그 사이 다른 호출자가 갱신을 마쳤다면 그 토큰을 반환합니다.
    async fn refresh_single_flight(&self, stale: Option<&str>) -> BrokerResult<Token> {
        let refresh = {
            let mut slot = self.inner.inflight.lock().await;

            match slot.as_ref() {
                Some(inflight) => {
                    debug!("Joining in-flight token refresh");
                    inflight.clone()
                }
                None => {
                    if let Some(stale) = stale {
                        let current = self.inner.current.read().await.clone();
                        if let Some(token) = current {
                            if token.access_token != stale && !token.is_expiring() {
                                debug!("Token already refreshed by another caller");
                                return Ok(token);
                            }
                        }
                    }

                    let refresh = Inner::refresh(Arc::clone(&self.inner)).boxed().shared();
                    *slot = Some(refresh.clone());
                    refresh
                }
            }
        };

        let result = refresh.clone().await;

        let mut slot = self.inner.inflight.lock().await;
        if slot.as_ref().is_some_and(|inflight| inflight.ptr_eq(&refresh)) {
            *slot = None;
        }

        result
    }
}

impl Inner {
    /// 캐시된 토큰 반환, 없으면 저장소에서 로드.
    async fn current_token(&self) -> BrokerResult<Token> {
        if let Some(token) = self.current.read().await.clone() {
            return Ok(token);
        }

        match self.store.load().await? {
            Some(token) => {
                *self.current.write().await = Some(token.clone());
                Ok(token)
            }
            None => Err(BrokerError::TokenMissing),
        }
    }

    /// 갱신 토큰으로 새 접근 토큰을 발급받습니다.
    ///
    /// 실패하면 저장된 토큰을 지우지 않습니다 (재로그인 전까지 유지).
    async fn refresh(self: Arc<Self>) -> BrokerResult<Token> {
        let current = self.current_token().await?;

        info!("Requesting token refresh...");

        let url = self.config.auth_url("validate-refresh-token");
        let body = serde_json::json!({
            "grant_type": "refresh_token",
            "appIdHash": self.config.app_id_hash(),
            "refresh_token": current.refresh_token,
            "pin": self.config.pin,
        });

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("Token refresh failed: {} - {}", status, text);
            return Err(BrokerError::RefreshFailed(format!(
                "{} - {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: AuthResponse = serde_json::from_str(&text)
            .map_err(|e| BrokerError::RefreshFailed(format!("응답 파싱 실패: {}", e)))?;
        if let Some((code, message)) = parsed.rejection() {
            error!(code, %message, "Token refresh rejected");
            return Err(BrokerError::RefreshFailed(format!("{}: {}", code, message)));
        }

        let token = parsed
            .into_token(Some(&current.refresh_token))
            .map_err(BrokerError::RefreshFailed)?;

        *self.current.write().await = Some(token.clone());

        // 업스트림은 이미 새 토큰을 발급했으므로 저장 실패는 요청을 막지 않음
        if let Err(e) = self.store.save(&token).await {
            error!(error = %e, "Refreshed token could not be persisted");
        }

        info!(expires_at = ?token.expires_at_utc(), "Access token refreshed");
        Ok(token)
    }
}
