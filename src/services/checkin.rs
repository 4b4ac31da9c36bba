//! Gate check-in. One token, one admission; a second scan of the same
//! token reports the earlier scan instead of mutating anything.

use std::sync::Arc;

use tracing::info;

use crate::collaborators::Clock;
use crate::db::Database;
use crate::models::{CheckInOutcome, TransactionStatus};
use crate::repositories::postgres::attendees;
use crate::utils::AppError;

pub struct CheckInService {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl CheckInService {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Resolves a scanned token and stamps the check-in time.
    ///
    /// Admission requires the owning transaction to be DONE and the
    /// event to still be running. The attendee row is locked for the
    /// duration, so two concurrent scans of one token serialize and the
    /// second sees the first's stamp.
    pub async fn check_in(&self, token: &str) -> Result<CheckInOutcome, AppError> {
        if token.trim().is_empty() {
            return Err(AppError::Validation("check-in token cannot be empty".into()));
        }

        let now = self.clock.now();
        let mut tx = self.db.pool().begin().await?;

        let ctx = attendees::find_context_by_token(&mut tx, token)
            .await?
            .ok_or_else(|| AppError::NotFound("unknown check-in token".into()))?;

        if let Some(at) = ctx.attendee.checked_in_at {
            // Informational, not an error: the gate already admitted
            // this token and double scans should stay calm.
            tx.commit().await?;
            return Ok(CheckInOutcome::AlreadyCheckedIn {
                attendee_id: ctx.attendee.id,
                event_title: ctx.event_title,
                checked_in_at: at,
            });
        }

        if ctx.transaction_status != TransactionStatus::Done {
            return Err(AppError::InvalidStateTransition(format!(
                "ticket is not settled; transaction is {:?}",
                ctx.transaction_status
            )));
        }
        if let Some(end_time) = ctx.event_end_time {
            if now > end_time {
                return Err(AppError::Expired("event has already ended".into()));
            }
        }

        if !attendees::mark_checked_in(&mut tx, ctx.attendee.id, now).await? {
            return Err(AppError::Internal(format!(
                "check-in stamp missed for locked attendee {}",
                ctx.attendee.id
            )));
        }
        tx.commit().await?;

        info!(attendee_id = %ctx.attendee.id, event = %ctx.event_title, "Attendee checked in");
        Ok(CheckInOutcome::CheckedIn {
            attendee_id: ctx.attendee.id,
            event_title: ctx.event_title,
            checked_in_at: now,
        })
    }
}
