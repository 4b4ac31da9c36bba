use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account row. Registration and sessions belong to the external auth
/// service; the engine reads identity and maintains the cached point
/// balance.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    /// Denormalized mirror of the point ledger, updated in the same
    /// database transaction as its ledger entries. The FIFO walk over the
    /// ledger is the authoritative balance; this is display-only.
    pub point_balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
