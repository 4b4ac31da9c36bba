//! Loyalty-point operations: awarding, the authoritative balance and
//! the expiring-soon lookup. Spending and its reversal live in the
//! transaction state machine; this service covers everything else.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::collaborators::Clock;
use crate::db::Database;
use crate::models::{ExpiringPoints, PointLedgerEntry};
use crate::repositories::postgres::{points, users};
use crate::services::ledger;
use crate::utils::AppError;

/// Balance read model. `balance` comes from the FIFO walk over the
/// ledger and is what every policy decision uses; `cached_balance` is
/// the denormalized column on the user row, reported so drift is
/// visible rather than hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointBalance {
    pub balance: i64,
    pub cached_balance: i64,
}

pub struct PointService {
    db: Database,
    clock: Arc<dyn Clock>,
    expiry_warning_window: Duration,
}

impl PointService {
    pub fn new(db: Database, clock: Arc<dyn Clock>, expiry_warning_window: Duration) -> Self {
        Self {
            db,
            clock,
            expiry_warning_window,
        }
    }

    /// Appends an EARNED entry and bumps the cached balance in the same
    /// database transaction.
    pub async fn award(
        &self,
        user_id: Uuid,
        amount: i64,
        expires_in_days: Option<i64>,
        description: &str,
    ) -> Result<PointLedgerEntry, AppError> {
        if amount <= 0 {
            return Err(AppError::Validation(
                "awarded points must be greater than zero".into(),
            ));
        }
        if let Some(days) = expires_in_days {
            if days <= 0 {
                return Err(AppError::Validation(
                    "point expiry must be in the future".into(),
                ));
            }
        }

        let expires_at = expires_in_days.map(|days| self.clock.now() + Duration::days(days));
        let mut tx = self.db.pool().begin().await?;

        users::lock(&mut tx, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;
        let entry = points::insert_earned(&mut tx, user_id, amount, description, expires_at).await?;
        if !users::adjust_point_balance(&mut tx, user_id, amount).await? {
            return Err(AppError::Internal(format!(
                "cached point balance for user {user_id} rejected an award"
            )));
        }

        tx.commit().await?;
        info!(%user_id, amount, ?expires_at, "Points awarded");
        Ok(entry)
    }

    /// The spendable balance right now, from the FIFO walk.
    pub async fn balance(&self, user_id: Uuid) -> Result<PointBalance, AppError> {
        let now = self.clock.now();
        let mut conn = self.db.pool().acquire().await?;

        let user = users::find(&mut conn, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;
        let earned = points::earned_entries(&mut conn, user_id).await?;
        let used_total = points::used_total(&mut conn, user_id).await?;

        Ok(PointBalance {
            balance: ledger::fifo_balance(&earned, used_total, now),
            cached_balance: user.point_balance,
        })
    }

    /// How much of the current balance evaporates within the warning
    /// window, and the nearest such deadline.
    pub async fn expiring_soon(&self, user_id: Uuid) -> Result<ExpiringPoints, AppError> {
        let now = self.clock.now();
        let mut conn = self.db.pool().acquire().await?;

        users::find(&mut conn, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;
        let earned = points::earned_entries(&mut conn, user_id).await?;
        let used_total = points::used_total(&mut conn, user_id).await?;

        Ok(ledger::expiring_within(
            &earned,
            used_total,
            now,
            self.expiry_warning_window,
        ))
    }
}
