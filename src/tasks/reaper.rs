//! Periodic deadline enforcement. The same reaping also runs lazily on
//! the read paths; this task is the backstop that catches transactions
//! nobody looks at.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::services::TransactionService;
use crate::utils::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReaperStats {
    pub expired: u64,
    pub auto_cancelled: u64,
}

/// Spawns the background sweep, ticking every `interval_secs`. Errors
/// are logged and the loop keeps going; one bad pass must not kill
/// deadline enforcement.
pub fn spawn_reaper_task(
    service: Arc<TransactionService>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            match run_reaper_sweep(&service).await {
                Ok(stats) if stats.expired + stats.auto_cancelled > 0 => {
                    info!(
                        expired = stats.expired,
                        auto_cancelled = stats.auto_cancelled,
                        "Reaper sweep complete"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = ?e, "Reaper sweep failed");
                }
            }
        }
    })
}

/// One pass: expire overdue payments, then cancel stale confirmations.
/// Each transaction is reaped under its own row lock, so a sweep racing
/// a user-triggered transition simply loses that row and moves on.
pub async fn run_reaper_sweep(service: &TransactionService) -> Result<ReaperStats, AppError> {
    let expired = service.sweep_expired().await?;
    let auto_cancelled = service.sweep_auto_cancelled().await?;
    Ok(ReaperStats {
        expired,
        auto_cancelled,
    })
}
