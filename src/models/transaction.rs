use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a purchase.
///
/// ```text
/// WAITING_PAYMENT ──submit──> WAITING_CONFIRMATION ──confirm──> DONE
///       │                          │        └───────reject────> REJECTED
///       ├──deadline──> EXPIRED     └──cancel / 3d grace──> CANCELLED
///       └──cancel────> CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    WaitingPayment,
    WaitingConfirmation,
    Done,
    Rejected,
    Expired,
    Cancelled,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransactionStatus::Done
                | TransactionStatus::Rejected
                | TransactionStatus::Expired
                | TransactionStatus::Cancelled
        )
    }

    /// Payment proof may only arrive while payment is pending.
    pub fn accepts_payment_proof(self) -> bool {
        self == TransactionStatus::WaitingPayment
    }

    /// Confirm and reject both require a submitted proof under review.
    pub fn accepts_organizer_decision(self) -> bool {
        self == TransactionStatus::WaitingConfirmation
    }

    /// Users may cancel any non-terminal transaction.
    pub fn accepts_cancellation(self) -> bool {
        matches!(
            self,
            TransactionStatus::WaitingPayment | TransactionStatus::WaitingConfirmation
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub ticket_category_id: Uuid,
    pub quantity: i32,
    /// `category price * quantity`, before any discount.
    pub subtotal: i64,
    pub voucher_id: Option<Uuid>,
    pub coupon_id: Option<Uuid>,
    pub points_used: i64,
    pub final_price: i64,
    pub status: TransactionStatus,
    pub payment_proof: Option<String>,
    pub rejection_reason: Option<String>,
    /// Payment deadline while in WAITING_PAYMENT.
    pub expires_at: DateTime<Utc>,
    /// Stamped when payment proof is submitted; the reaper's
    /// auto-cancellation clock. Deliberately not `updated_at`.
    pub confirmation_requested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn payment_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TransactionStatus::WaitingPayment && now > self.expires_at
    }

    pub fn confirmation_overdue(&self, now: DateTime<Utc>, grace: chrono::Duration) -> bool {
        self.status == TransactionStatus::WaitingConfirmation
            && self
                .confirmation_requested_at
                .map(|at| now > at + grace)
                .unwrap_or(false)
    }
}

/// Flat projection used by list endpoints.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TransactionSummary {
    pub id: Uuid,
    pub event_title: String,
    pub category_name: String,
    pub quantity: i32,
    pub final_price: i64,
    pub status: TransactionStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Full read model for a single transaction, assembled in one query so
/// call sites never re-join ad hoc.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TransactionDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub transaction: Transaction,
    pub event_title: String,
    pub category_name: String,
    pub category_price: i64,
    pub voucher_code: Option<String>,
    pub coupon_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn transaction(status: TransactionStatus) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            ticket_category_id: Uuid::new_v4(),
            quantity: 1,
            subtotal: 100_000,
            voucher_id: None,
            coupon_id: None,
            points_used: 0,
            final_price: 100_000,
            status,
            payment_proof: None,
            rejection_reason: None,
            expires_at: now + Duration::hours(2),
            confirmation_requested_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn transition_preconditions_match_lifecycle() {
        assert!(TransactionStatus::WaitingPayment.accepts_payment_proof());
        assert!(TransactionStatus::WaitingPayment.accepts_cancellation());
        assert!(!TransactionStatus::WaitingPayment.accepts_organizer_decision());

        assert!(TransactionStatus::WaitingConfirmation.accepts_organizer_decision());
        assert!(TransactionStatus::WaitingConfirmation.accepts_cancellation());
        assert!(!TransactionStatus::WaitingConfirmation.accepts_payment_proof());

        for terminal in [
            TransactionStatus::Done,
            TransactionStatus::Rejected,
            TransactionStatus::Expired,
            TransactionStatus::Cancelled,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.accepts_payment_proof());
            assert!(!terminal.accepts_organizer_decision());
            assert!(!terminal.accepts_cancellation());
        }
    }

    #[test]
    fn payment_deadline_is_exclusive() {
        let tx = transaction(TransactionStatus::WaitingPayment);
        assert!(!tx.payment_overdue(tx.expires_at));
        assert!(tx.payment_overdue(tx.expires_at + Duration::seconds(1)));

        // Terminal rows never read as overdue.
        let done = transaction(TransactionStatus::Done);
        assert!(!done.payment_overdue(done.expires_at + Duration::hours(1)));
    }

    #[test]
    fn confirmation_grace_runs_from_the_dedicated_clock() {
        let mut tx = transaction(TransactionStatus::WaitingConfirmation);
        let submitted = Utc::now();
        tx.confirmation_requested_at = Some(submitted);

        let grace = Duration::days(3);
        assert!(!tx.confirmation_overdue(submitted + grace, grace));
        assert!(tx.confirmation_overdue(submitted + grace + Duration::seconds(1), grace));

        // Without a stamp, the clock has not started.
        tx.confirmation_requested_at = None;
        assert!(!tx.confirmation_overdue(submitted + Duration::days(30), grace));
    }
}
