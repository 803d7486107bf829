//! 토큰 영속화.
//!
//! 파일 저장소는 프로세스 간 잠금을 하지 않습니다.
//! 여러 프로세스가 같은 파일을 공유하면 갱신 결과가 서로 덮어쓸 수 있습니다.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

use super::token::Token;
use crate::{BrokerError, BrokerResult};

/// 토큰 저장소 trait.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// 저장된 토큰 조회 (없으면 `None`).
    async fn load(&self) -> BrokerResult<Option<Token>>;

    /// 토큰 저장 (기존 토큰 대체).
    async fn save(&self, token: &Token) -> BrokerResult<()>;

    /// 저장된 토큰 삭제.
    async fn clear(&self) -> BrokerResult<()>;
}

/// JSON 파일 기반 토큰 저장소.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> BrokerResult<Option<Token>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let token = serde_json::from_slice(&raw).map_err(|e| {
            BrokerError::TokenStore(format!(
                "토큰 파일 파싱 실패 ({}): {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(Some(token))
    }

    async fn save(&self, token: &Token) -> BrokerResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // 임시 파일에 쓴 뒤 교체하여 읽는 쪽이 반쯤 쓰인 파일을 보지 않도록 함
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(token)?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), "Token saved");
        Ok(())
    }

    async fn clear(&self) -> BrokerResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// 메모리 기반 토큰 저장소 (테스트, 일회성 실행용).
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<Token>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: Token) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> BrokerResult<Option<Token>> {
        Ok(self.token.read().await.clone())
    }

    async fn save(&self, token: &Token) -> BrokerResult<()> {
        *self.token.write().await = Some(token.clone());
        Ok(())
    }

    async fn clear(&self) -> BrokerResult<()> {
        *self.token.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested/token.json"));

        assert_eq!(store.load().await.unwrap(), None);

        let token = Token::new("access", "refresh", 1_700_000_000_000);
        store.save(&token).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(token.clone()));

        let replaced = Token::new("access-2", "refresh", 1_700_000_360_000);
        store.save(&replaced).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(replaced));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        // 없는 파일 삭제는 무시
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_reads_camel_case_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        tokio::fs::write(
            &path,
            r#"{"accessToken":"a","refreshToken":"r","expiresAt":1700000000000}"#,
        )
        .await
        .unwrap();

        let token = FileTokenStore::new(&path).load().await.unwrap().unwrap();
        assert_eq!(token, Token::new("a", "r", 1_700_000_000_000));
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let result = FileTokenStore::new(&path).load().await;
        assert!(matches!(result, Err(BrokerError::TokenStore(_))));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryTokenStore::new();
        assert!(store.load().await.unwrap().is_none());

        store.save(&Token::new("a", "r", 1)).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap().access_token, "a");

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
