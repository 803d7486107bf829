//! 업스트림 히스토리 API의 캔들 해상도.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 분봉/시간봉 요청 1회에 허용되는 최대 일수.
pub const INTRADAY_MAX_DAYS: u32 = 100;

/// 일봉 이상 요청 1회에 허용되는 최대 일수.
pub const DAILY_MAX_DAYS: u32 = 366;

/// 캔들 해상도.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    /// 1분봉
    M1,
    /// 5분봉
    M5,
    /// 15분봉
    M15,
    /// 30분봉
    M30,
    /// 1시간봉
    H1,
    /// 4시간봉
    H4,
    /// 일봉
    D1,
    /// 주봉
    W1,
    /// 월봉
    MN1,
}

impl Resolution {
    /// 업스트림 API 해상도 코드.
    pub fn as_api_code(&self) -> &'static str {
        match self {
            Resolution::M1 => "1",
            Resolution::M5 => "5",
            Resolution::M15 => "15",
            Resolution::M30 => "30",
            Resolution::H1 => "60",
            Resolution::H4 => "240",
            Resolution::D1 => "D",
            Resolution::W1 => "W",
            Resolution::MN1 => "M",
        }
    }

    /// 업스트림 API 해상도 코드에서 파싱합니다.
    pub fn from_api_code(s: &str) -> Option<Self> {
        match s {
            "1" => Some(Resolution::M1),
            "5" => Some(Resolution::M5),
            "15" => Some(Resolution::M15),
            "30" => Some(Resolution::M30),
            "60" => Some(Resolution::H1),
            "240" => Some(Resolution::H4),
            "D" | "1D" => Some(Resolution::D1),
            "W" | "1W" => Some(Resolution::W1),
            "M" | "1M" => Some(Resolution::MN1),
            _ => None,
        }
    }

    /// 분봉/시간봉인지 확인.
    pub fn is_intraday(&self) -> bool {
        matches!(
            self,
            Resolution::M1
                | Resolution::M5
                | Resolution::M15
                | Resolution::M30
                | Resolution::H1
                | Resolution::H4
        )
    }

    /// 요청 1회에 허용되는 최대 일수.
    pub fn max_days_per_request(&self) -> u32 {
        if self.is_intraday() {
            INTRADAY_MAX_DAYS
        } else {
            DAILY_MAX_DAYS
        }
    }

    /// 설정된 상한을 반영한 청크 크기 (상한은 한도를 낮출 수만 있음).
    pub fn chunk_days(&self, cap: Option<u32>) -> u32 {
        let limit = self.max_days_per_request();
        match cap {
            Some(cap) if cap > 0 => cap.min(limit),
            _ => limit,
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::D1
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_api_code())
    }
}

impl FromStr for Resolution {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_api_code(s.trim()).ok_or_else(|| CoreError::InvalidResolution(s.to_string()))
    }
}

impl TryFrom<String> for Resolution {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.as_api_code().to_string()
    }
}
