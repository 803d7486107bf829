//! 데이터 수집 모듈.

pub mod history_sync;
pub mod poller;

pub use history_sync::{incremental_start, sync_history, sync_symbols};
pub use poller::{Poller, PollerState, PollerStatus};
