//! 업스트림 요청 한도에 맞춘 날짜 구간 분할.
//!
//! 히스토리 API는 요청 1회당 조회 가능한 기간이 제한되어 있습니다.
//! 사용자가 요청한 `[start, end]` 범위를 한도 이하의 연속 구간으로 나눕니다.
//!
//! - 모든 구간은 양 끝 날짜를 포함합니다
//! - 구간 사이에 빈 날짜나 겹치는 날짜가 없습니다
//! - 마지막 구간은 `end`에 맞춰 잘립니다

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// 날짜 구간 (양 끝 포함).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateChunk {
    /// 시작일
    pub from: NaiveDate,
    /// 종료일
    pub to: NaiveDate,
}

impl DateChunk {
    /// 구간에 포함된 일수.
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

impl fmt::Display for DateChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.from, self.to)
    }
}

/// `[start, end]` 범위를 `limit_days` 이하의 구간으로 분할합니다.
///
/// # Errors
/// `start > end`이거나 `limit_days == 0`이면 `CoreError::InvalidRange`.
pub fn chunk_date_range(
    start: NaiveDate,
    end: NaiveDate,
    limit_days: u32,
) -> CoreResult<Vec<DateChunk>> {
    if limit_days == 0 {
        return Err(CoreError::InvalidRange(
            "청크 한도는 1일 이상이어야 합니다".to_string(),
        ));
    }
    if start > end {
        return Err(CoreError::InvalidRange(format!(
            "시작일({})이 종료일({})보다 늦습니다",
            start, end
        )));
    }

    // 달력 끝(NaiveDate::MAX) 근처에서는 덧셈이 넘치므로 `end`로 잘라냄
    let span = Duration::days(i64::from(limit_days) - 1);
    let mut chunks = Vec::new();
    let mut cursor = start;

    loop {
        let chunk_end = cursor
            .checked_add_signed(span)
            .map_or(end, |d| d.min(end));
        chunks.push(DateChunk {
            from: cursor,
            to: chunk_end,
        });
        if chunk_end >= end {
            break;
        }
        match chunk_end.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }

    Ok(chunks)
}
