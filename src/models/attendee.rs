use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One admission right, minted per seat when a transaction settles.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attendee {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub check_in_token: String,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Everything the gate needs to decide on a token, fetched in one
/// joined query with the attendee row locked.
#[derive(Debug, Clone, FromRow)]
pub struct CheckInContext {
    #[sqlx(flatten)]
    pub attendee: Attendee,
    pub transaction_status: crate::models::transaction::TransactionStatus,
    pub event_title: String,
    pub event_end_time: Option<DateTime<Utc>>,
}

/// Result of a gate scan. A replayed token is reported, not rejected,
/// so double scans at the door stay calm.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckInOutcome {
    CheckedIn {
        attendee_id: Uuid,
        event_title: String,
        checked_in_at: DateTime<Utc>,
    },
    AlreadyCheckedIn {
        attendee_id: Uuid,
        event_title: String,
        checked_in_at: DateTime<Utc>,
    },
}
