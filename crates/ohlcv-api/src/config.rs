//! API 서버 설정.

use ohlcv_core::config::env_var_parse;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// API 서버 바인딩 설정.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// 바인딩 주소 (API_HOST, 기본 127.0.0.1)
    pub host: IpAddr,
    /// 포트 (API_PORT, 기본 3000)
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_var_parse("API_HOST", defaults.host),
            port: env_var_parse("API_PORT", defaults.port),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
