//! 주기적 증분 수집 폴러.
//!
//! 설정된 심볼을 주기마다 순차적으로 동기화하는 백그라운드 task입니다.
//!
//! # 상태
//!
//! - `Stopped` → `start()` → `Running`
//! - `Running` → `stop()` → `Stopped` (진행 중인 심볼 동기화가 끝난 뒤 종료)
//! - `reset()`: 중지 후 상태와 저장된 캔들을 모두 초기화

use chrono::{DateTime, Utc};
use ohlcv_broker::HistoryFetcher;
use ohlcv_core::Resolution;
use ohlcv_data::CandleStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::history_sync::{incremental_start, sync_history};
use crate::{CollectorError, PollerConfig, Result, SyncStats};

/// 폴러 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerState {
    /// 중지됨
    Stopped,
    /// 실행 중
    Running,
}

/// 폴러 상태 조회 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerStatus {
    /// 현재 상태
    pub state: PollerState,
    /// 수집 대상 심볼
    pub symbols: Vec<String>,
    /// 수집 해상도
    pub resolution: Resolution,
    /// 수집 주기 (초)
    pub interval_secs: u64,
    /// 시작 시각
    pub started_at: Option<DateTime<Utc>>,
    /// 마지막 사이클 완료 시각
    pub last_cycle_at: Option<DateTime<Utc>>,
    /// 완료한 사이클 수
    pub cycles: u64,
    /// 마지막 사이클의 심볼별 통계
    pub last_cycle: Vec<SyncStats>,
    /// 마지막 에러
    pub last_error: Option<String>,
}

impl PollerStatus {
    fn initial(config: &PollerConfig) -> Self {
        Self {
            state: PollerState::Stopped,
            symbols: config.symbols.clone(),
            resolution: config.resolution,
            interval_secs: config.interval_secs,
            started_at: None,
            last_cycle_at: None,
            cycles: 0,
            last_cycle: Vec::new(),
            last_error: None,
        }
    }
}

struct RunningTask {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

struct PollerInner {
    fetcher: HistoryFetcher,
    store: Arc<dyn CandleStore>,
    config: PollerConfig,
    status: RwLock<PollerStatus>,
    task: Mutex<Option<RunningTask>>,
}

/// 증분 수집 폴러.
///
/// 복제본은 같은 task와 상태를 공유합니다.
#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

impl Poller {
    pub fn new(fetcher: HistoryFetcher, store: Arc<dyn CandleStore>, config: PollerConfig) -> Self {
        let status = PollerStatus::initial(&config);
        Self {
            inner: Arc::new(PollerInner {
                fetcher,
                store,
                config,
                status: RwLock::new(status),
                task: Mutex::new(None),
            }),
        }
    }

    /// 폴러 설정.
    pub fn config(&self) -> &PollerConfig {
        &self.inner.config
    }

    /// 백그라운드 수집 시작.
    ///
    /// # Errors
    /// - 이미 실행 중이면 `AlreadyRunning`
    /// - 수집 대상 심볼이 없으면 `Config`
    pub async fn start(&self) -> Result<PollerStatus> {
        let mut task = self.inner.task.lock().await;

        if task.as_ref().is_some_and(|t| !t.join.is_finished()) {
            return Err(CollectorError::AlreadyRunning);
        }
        if self.inner.config.symbols.is_empty() {
            return Err(CollectorError::Config(
                "POLL_SYMBOLS에 수집할 심볼이 없습니다".to_string(),
            ));
        }

        {
            let mut status = self.inner.status.write().await;
            status.state = PollerState::Running;
            status.started_at = Some(Utc::now());
            status.last_error = None;
        }

        let cancel = CancellationToken::new();
        let inner = Arc::clone(&self.inner);
        let join = tokio::spawn(run_loop(inner, cancel.clone()));
        *task = Some(RunningTask { cancel, join });

        info!(
            symbols = ?self.inner.config.symbols,
            resolution = %self.inner.config.resolution,
            interval_secs = self.inner.config.interval_secs,
            "Poller started"
        );

        Ok(self.status().await)
    }

    /// 수집 중지. 진행 중인 심볼 동기화가 끝날 때까지 기다립니다.
    ///
    /// # Errors
    /// 실행 중이 아니면 `NotRunning`.
    pub async fn stop(&self) -> Result<PollerStatus> {
        let running = self.inner.task.lock().await.take();

        let Some(running) = running else {
            return Err(CollectorError::NotRunning);
        };

        running.cancel.cancel();
        if let Err(e) = running.join.await {
            error!(error = %e, "Poller task ended abnormally");
        }

        self.inner.status.write().await.state = PollerState::Stopped;
        info!("Poller stopped");

        Ok(self.status().await)
    }

    /// 현재 상태.
    pub async fn status(&self) -> PollerStatus {
        self.inner.status.read().await.clone()
    }

    /// 폴러를 중지하고 상태와 저장된 캔들을 초기화합니다.
    ///
    /// 삭제된 캔들 수를 반환합니다.
    pub async fn reset(&self) -> Result<u64> {
        match self.stop().await {
            Ok(_) | Err(CollectorError::NotRunning) => {}
            Err(e) => return Err(e),
        }

        let deleted = self.inner.store.delete_candles(None).await?;
        *self.inner.status.write().await = PollerStatus::initial(&self.inner.config);

        warn!(deleted, "Poller reset, all stored candles deleted");
        Ok(deleted)
    }

    /// 사이클 하나를 즉시 실행합니다.
    pub async fn run_once(&self) -> Vec<SyncStats> {
        run_cycle(&self.inner, &CancellationToken::new()).await
    }
}

async fn run_loop(inner: Arc<PollerInner>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(inner.config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Poller loop exiting");
                break;
            }
            _ = ticker.tick() => {
                run_cycle(&inner, &cancel).await;
            }
        }
    }
}

/// 설정된 심볼을 순차적으로 증분 동기화합니다.
///
/// 취소는 심볼 사이에서만 확인합니다.
async fn run_cycle(inner: &PollerInner, cancel: &CancellationToken) -> Vec<SyncStats> {
    let config = &inner.config;
    let mut results = Vec::with_capacity(config.symbols.len());
    let mut last_error = None;

    info!(symbols = config.symbols.len(), "Poll cycle started");

    for symbol in &config.symbols {
        if cancel.is_cancelled() {
            info!("Poll cycle cancelled");
            break;
        }

        let today = Utc::now().date_naive();
        let store = inner.store.as_ref();
        let synced = match incremental_start(store, symbol, config.lookback_days, today).await {
            Ok(start) => {
                sync_history(&inner.fetcher, store, symbol, config.resolution, start, today).await
            }
            Err(e) => Err(e),
        };

        match synced {
            Ok(stats) => {
                if let Some(partial) = stats.partial_failure() {
                    last_error = Some(format!("{}: {}", symbol, partial));
                }
                results.push(stats);
            }
            Err(e) => {
                error!(symbol = %symbol, error = %e, "Poll sync failed");
                let auth_failed = e.is_auth_error();
                last_error = Some(format!("{}: {}", symbol, e));
                // 인증 에러는 나머지 심볼도 모두 실패함
                if auth_failed {
                    break;
                }
            }
        }
    }

    let mut status = inner.status.write().await;
    status.cycles += 1;
    status.last_cycle_at = Some(Utc::now());
    status.last_cycle = results.clone();
    status.last_error = last_error;

    info!(
        cycle = status.cycles,
        synced = results.len(),
        "Poll cycle finished"
    );

    results
}
