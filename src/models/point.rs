use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "point_entry_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointEntryKind {
    Earned,
    Used,
}

/// One movement in a user's loyalty-point ledger.
///
/// EARNED entries carry a positive `amount` and may expire; USED entries
/// carry a negative `amount` and reference the transaction that spent them
/// via `transaction_id`, which is what rollback matches on.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PointLedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub kind: PointEntryKind,
    pub description: String,
    pub transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PointLedgerEntry {
    /// Expiry check for EARNED entries; entries without a deadline never
    /// expire. Points expiring exactly at `now` are already gone.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Result of the expiring-soon walk: how many still-spendable points fall
/// inside the warning window, and the closest deadline among them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiringPoints {
    pub total: i64,
    pub nearest_expiry: Option<DateTime<Utc>>,
}
