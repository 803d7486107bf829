//! OAuth 토큰 수명 주기.
//!
//! - [`Token`]: 접근/갱신 토큰과 만료 시각
//! - [`TokenStore`]: 토큰 영속화 (파일, 메모리)
//! - [`TokenManager`]: 유효한 접근 토큰 보장, 단일 비행 갱신

mod manager;
mod store;
mod token;

pub use manager::{TokenManager, TokenStatus};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use token::{Token, REFRESH_THRESHOLD_SECS};
