//! OHLCV collector CLI.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use ohlcv_collector::{sync_symbols, CollectorConfig, CollectorContext, CollectorError};
use ohlcv_core::{init_logging, LogConfig, Resolution};

#[derive(Parser)]
#[command(name = "ohlcv-collector")]
#[command(about = "OHLCV history collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error). 없으면 RUST_LOG 사용
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 인증 코드로 토큰 발급 후 저장
    Login {
        /// 증권사 로그인 후 받은 auth code
        #[arg(long)]
        auth_code: String,
    },

    /// 저장된 토큰 삭제
    Logout,

    /// 지정 범위의 히스토리 동기화
    Sync {
        /// 심볼 목록 (쉼표로 구분, 예: "NSE:SBIN-EQ,NSE:TCS-EQ")
        #[arg(long, value_delimiter = ',', required = true)]
        symbols: Vec<String>,

        /// 시작일 (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// 종료일 (YYYY-MM-DD, 기본: 오늘)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// 해상도 코드 (1, 5, 15, 30, 60, 240, D, W, M)
        #[arg(long, default_value = "D")]
        resolution: Resolution,

        /// 일부 구간이 실패하면 에러로 종료
        #[arg(long)]
        strict: bool,
    },

    /// 데몬 모드: 설정된 심볼을 주기적으로 증분 수집
    Daemon,

    /// 저장된 토큰 상태 출력
    TokenStatus,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // 로깅 초기화
    let mut log_config = LogConfig::from_env();
    if let Some(level) = cli.log_level {
        std::env::remove_var("RUST_LOG");
        log_config = log_config.with_level(level);
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("logging init failed: {}", e))?;

    tracing::info!("OHLCV collector 시작");

    let config = CollectorConfig::from_env()?;
    let ctx = CollectorContext::build(config).await?;

    match cli.command {
        Commands::Login { auth_code } => {
            let token = ctx.tokens.exchange_auth_code(&auth_code).await?;
            tracing::info!(expires_at = ?token.expires_at_utc(), "로그인 완료");
        }
        Commands::Logout => {
            ctx.tokens.logout().await?;
        }
        Commands::TokenStatus => {
            let status = ctx.tokens.status().await?;
            println!("{}", serde_json_pretty(&status));
        }
        Commands::Sync {
            symbols,
            from,
            to,
            resolution,
            strict,
        } => {
            let to = to.unwrap_or_else(|| Utc::now().date_naive());
            let results =
                sync_symbols(&ctx.fetcher, ctx.store.as_ref(), &symbols, resolution, from, to)
                    .await;

            let mut failed_chunks = 0;
            let mut total_chunks = 0;
            let mut failed_symbols = Vec::new();
            for (symbol, synced) in &results {
                match synced {
                    Ok(stats) => {
                        failed_chunks += stats.chunks_failed;
                        total_chunks += stats.chunks_total;
                    }
                    Err(_) => failed_symbols.push(symbol.as_str()),
                }
            }
            // 인증 실패로 시도하지 못한 심볼
            failed_symbols.extend(symbols[results.len()..].iter().map(String::as_str));

            if !failed_symbols.is_empty() {
                anyhow::bail!(
                    "{} of {} symbols failed: {}",
                    failed_symbols.len(),
                    symbols.len(),
                    failed_symbols.join(",")
                );
            }

            if strict && failed_chunks > 0 {
                return Err(CollectorError::PartialSyncFailure {
                    failed_chunks,
                    total_chunks,
                }
                .into());
            }
        }
        Commands::Daemon => {
            let poller = ctx.poller();
            let status = poller.start().await?;
            tracing::info!(
                "=== 데몬 모드 시작 (주기: {}초, 심볼 {}개) ===",
                status.interval_secs,
                status.symbols.len()
            );

            tokio::signal::ctrl_c().await?;
            tracing::info!("종료 신호 수신, 데몬 종료 중...");

            let status = poller.stop().await?;
            tracing::info!(cycles = status.cycles, "데몬 종료");
        }
    }

    tracing::info!("OHLCV collector 종료");
    Ok(())
}

fn serde_json_pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<serialize error: {}>", e))
}
