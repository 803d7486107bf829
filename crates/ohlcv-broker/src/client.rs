//! 인증 헤더를 주입하는 HTTP 클라이언트.
//!
//! 모든 요청 전에 [`TokenManager`]에서 접근 토큰을 받아
//! `Authorization: {app_id}:{access_token}` 헤더를 붙입니다.
//! 401 응답을 받으면 토큰을 갱신하고 정확히 한 번만 재시도합니다.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::auth::TokenManager;
use crate::{BrokerError, BrokerResult};

/// 인증된 증권사 API 클라이언트.
///
/// `TokenManager`를 공유하므로 여러 클라이언트가 같은 토큰과
/// 진행 중 갱신을 함께 사용합니다.
#[derive(Clone)]
pub struct BrokerClient {
    tokens: TokenManager,
    http: Client,
}

impl BrokerClient {
    /// 새로운 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `BrokerError::Network`를 반환합니다.
    pub fn new(tokens: TokenManager) -> BrokerResult<Self> {
        let http = Client::builder()
            .timeout(tokens.config().timeout())
            .build()
            .map_err(|e| BrokerError::Network(format!("HTTP client 생성 실패: {}", e)))?;

        Ok(Self { tokens, http })
    }

    /// 내부 토큰 관리자 참조.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// 인증된 GET 요청 후 JSON 응답을 역직렬화합니다.
    ///
    /// # Errors
    /// - 토큰 문제: `TokenMissing`, `RefreshFailed`
    /// - 401 이외 실패 상태 또는 재시도 후 401: `UpstreamRequestFailed`
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> BrokerResult<T> {
        let body = self.get_text(url, query).await?;
        serde_json::from_str(&body)
            .map_err(|e| BrokerError::Parse(format!("응답 파싱 실패 ({}): {}", url, e)))
    }

    /// 인증된 GET 요청 후 응답 본문을 반환합니다.
    pub async fn get_text(&self, url: &str, query: &[(&str, String)]) -> BrokerResult<String> {
        let mut access_token = self.tokens.get_valid_access_token().await?;
        let mut retried = false;

        loop {
            let response = self
                .http
                .get(url)
                .header("Authorization", self.auth_header(&access_token))
                .query(query)
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;

            if status == StatusCode::UNAUTHORIZED && !retried {
                warn!(url, "Received 401, refreshing token and retrying once");
                retried = true;
                access_token = self.tokens.refresh_after_unauthorized(&access_token).await?;
                continue;
            }

            if !status.is_success() {
                error!(url, status = status.as_u16(), retried, "Upstream request failed");
                return Err(BrokerError::UpstreamRequestFailed {
                    status: status.as_u16(),
                    body,
                });
            }

            debug!(url, bytes = body.len(), "Upstream request succeeded");
            return Ok(body);
        }
    }

    fn auth_header(&self, access_token: &str) -> String {
        format!("{}:{}", self.tokens.config().app_id, access_token)
    }
}
