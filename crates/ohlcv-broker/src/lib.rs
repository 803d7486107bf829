//! 증권사 히스토리 API 커넥터.
//!
//! 처리 기능:
//! - 접근/갱신 토큰 수명 주기 관리 (단일 비행 갱신)
//! - 인증 헤더 주입 및 401 응답 시 1회 재시도
//! - 요청 한도에 맞춘 구간 분할 히스토리 조회

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod history;

pub use auth::{FileTokenStore, MemoryTokenStore, Token, TokenManager, TokenStatus, TokenStore};
pub use client::BrokerClient;
pub use config::BrokerConfig;
pub use error::{BrokerError, BrokerResult};
pub use history::{parse_candle_row, ChunkCandles, ChunkFailure, FetchOutcome, HistoryFetcher};
