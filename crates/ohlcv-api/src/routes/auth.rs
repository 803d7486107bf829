//! 인증 API 엔드포인트
//!
//! - `POST /api/v1/auth/token` - 인증 코드로 토큰 발급 (로그인)
//! - `POST /api/v1/auth/logout` - 저장된 토큰 삭제
//! - `GET /api/v1/auth/status` - 토큰 상태 조회
//!
//! 응답에는 토큰 값 자체를 포함하지 않습니다.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use ohlcv_broker::TokenStatus;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 로그인 요청
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    /// 증권사 로그인 후 리다이렉트로 받은 auth code
    pub auth_code: String,
}

/// POST /api/v1/auth/token
pub async fn exchange_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TokenRequest>,
) -> ApiResult<Json<TokenStatus>> {
    if request.auth_code.trim().is_empty() {
        return Err(ApiError::bad_request("auth_code is required"));
    }

    state.tokens.exchange_auth_code(request.auth_code.trim()).await?;
    info!("Login completed via API");
    Ok(Json(state.tokens.status().await?))
}

/// POST /api/v1/auth/logout
pub async fn logout(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.tokens.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/status
pub async fn token_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<TokenStatus>> {
    Ok(Json(state.tokens.status().await?))
}

pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/token", post(exchange_token))
        .route("/logout", post(logout))
        .route("/status", get(token_status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::{body::Body, http::Request};
    use mockito::{Matcher, Server};
    use ohlcv_broker::Token;
    use serde_json::json;
    use tower::ServiceExt;

    async fn read_status(app: Router) -> TokenStatus {
        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn token_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/token")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_then_status() {
        let mut server = Server::new_async().await;
        let exchange = server
            .mock("POST", "/validate-authcode")
            .match_body(Matcher::PartialJson(json!({"code": "auth-code-xyz"})))
            .with_status(200)
            .with_body(
                json!({
                    "s": "ok",
                    "access_token": "access-1",
                    "refresh_token": "refresh-1"
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let state = Arc::new(create_test_state(&server.url(), None, vec![]));
        let app = auth_router().with_state(state);

        assert!(!read_status(app.clone()).await.present);

        let response = app
            .clone()
            .oneshot(token_request(json!({"auth_code": "auth-code-xyz"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        exchange.assert_async().await;

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let raw: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(raw["present"], true);
        assert!(raw.get("access_token").is_none());

        assert!(read_status(app).await.present);
    }

    #[tokio::test]
    async fn test_rejected_auth_code_is_upstream_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/validate-authcode")
            .with_status(400)
            .with_body(r#"{"s":"error","code":-413,"message":"invalid auth code"}"#)
            .create_async()
            .await;

        let state = Arc::new(create_test_state(&server.url(), None, vec![]));
        let response = auth_router()
            .with_state(state)
            .oneshot(token_request(json!({"auth_code": "bad"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_empty_auth_code_is_bad_request() {
        let state = Arc::new(create_test_state("http://127.0.0.1:9", None, vec![]));
        let response = auth_router()
            .with_state(state)
            .oneshot(token_request(json!({"auth_code": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_clears_token() {
        let state = Arc::new(create_test_state(
            "http://127.0.0.1:9",
            Some(Token::expiring_in("a", "r", 3600)),
            vec![],
        ));
        let app = auth_router().with_state(state);
        assert!(read_status(app.clone()).await.present);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(!read_status(app).await.present);
    }
}
