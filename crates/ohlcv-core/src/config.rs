//! 환경변수 파싱 헬퍼.
//!
//! 각 크레이트의 `from_env()` 설정 로더가 공통으로 사용합니다.

/// 환경변수에서 값을 파싱 (없거나 실패 시 기본값 사용)
pub fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_var_opt(key).unwrap_or(default)
}

/// 환경변수에서 값을 파싱 (없거나 실패 시 `None`)
pub fn env_var_opt<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| v.trim().parse().ok())
}

/// 환경변수에서 bool 값 파싱
pub fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

/// 쉼표로 구분된 목록 파싱 (빈 항목 제외)
pub fn parse_csv_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_list() {
        assert_eq!(
            parse_csv_list("NSE:SBIN-EQ, NSE:TCS-EQ,,"),
            vec!["NSE:SBIN-EQ".to_string(), "NSE:TCS-EQ".to_string()]
        );
        assert!(parse_csv_list("  ").is_empty());
    }

    #[test]
    fn test_env_var_parse_default() {
        assert_eq!(env_var_parse("OHLCV_CORE_TEST_UNSET_KEY", 42u32), 42);
        assert_eq!(env_var_opt::<u32>("OHLCV_CORE_TEST_UNSET_KEY"), None);
    }
}
