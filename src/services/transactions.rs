//! The transaction state machine: creation, the payment/confirmation
//! lifecycle, settlement, compensation and deadline reaping.
//!
//! Every mutating entry point runs as one database transaction. Lifecycle
//! transitions start by locking the transaction row, re-check the status
//! under that lock, and finish with a compare-and-swap on the status
//! column, so two racing callers (user vs. user, user vs. reaper) cannot
//! both apply their transition. Notifications and email go out only after
//! a successful commit and never affect the outcome.

use std::sync::Arc;

use chrono::Duration;
use sqlx::PgConnection;
use tracing::info;
use uuid::Uuid;

use crate::collaborators::{Clock, Mailer, NotificationKind, Notifier, TokenGenerator};
use crate::db::Database;
use crate::models::{
    Transaction, TransactionDetail, TransactionStatus, TransactionSummary,
};
use crate::repositories::postgres::{
    attendees, coupons, events, inventory, points, transactions, users, vouchers,
};
use crate::services::ledger;
use crate::services::pricing::PriceBreakdown;
use crate::utils::AppError;

/// Upper bound on rows touched per sweep pass; the next tick picks up
/// the remainder.
const SWEEP_BATCH: i64 = 100;

/// Retries per attendee when a freshly minted check-in token collides.
const MAX_TOKEN_ATTEMPTS: usize = 5;

pub struct CreateTransactionRequest {
    pub event_id: Uuid,
    pub ticket_category_id: Uuid,
    pub quantity: i32,
    pub voucher_code: Option<String>,
    pub coupon_code: Option<String>,
    pub points_requested: i64,
}

pub struct TransactionService {
    db: Database,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    mailer: Arc<dyn Mailer>,
    tokens: Arc<dyn TokenGenerator>,
    payment_deadline: Duration,
    confirmation_grace: Duration,
}

impl TransactionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        mailer: Arc<dyn Mailer>,
        tokens: Arc<dyn TokenGenerator>,
        payment_deadline: Duration,
        confirmation_grace: Duration,
    ) -> Self {
        Self {
            db,
            clock,
            notifier,
            mailer,
            tokens,
            payment_deadline,
            confirmation_grace,
        }
    }

    /// Reserves seats, prices the order and opens the payment window.
    ///
    /// Inventory, voucher, coupon and point effects all land in the one
    /// database transaction that also inserts the row, so a failure at
    /// any step leaves nothing behind. Discounts stack in fixed order:
    /// voucher, then coupon, then points against whatever remains.
    pub async fn create(
        &self,
        user_id: Uuid,
        req: CreateTransactionRequest,
    ) -> Result<TransactionDetail, AppError> {
        if req.quantity <= 0 {
            return Err(AppError::Validation(
                "quantity must be greater than zero".into(),
            ));
        }
        if req.points_requested < 0 {
            return Err(AppError::Validation(
                "points requested cannot be negative".into(),
            ));
        }

        let now = self.clock.now();
        let mut tx = self.db.pool().begin().await?;

        let event = events::find(&mut tx, req.event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("event not found".into()))?;
        if event.has_ended(now) {
            return Err(AppError::Validation("event has already ended".into()));
        }

        // Lock order: category, voucher, coupon, user. Creation never
        // locks a transaction row, so it cannot deadlock with the
        // transition paths, which start there.
        let category = inventory::lock_category(&mut tx, req.ticket_category_id)
            .await?
            .ok_or_else(|| AppError::NotFound("ticket category not found".into()))?;
        if category.event_id != event.id {
            return Err(AppError::Validation(
                "ticket category does not belong to this event".into(),
            ));
        }
        if !category.can_reserve(req.quantity) {
            return Err(AppError::Conflict(format!(
                "only {} seat(s) left in {}",
                category.available_seats, category.name
            )));
        }
        if !inventory::reserve_seats(&mut tx, category.id, req.quantity).await? {
            return Err(AppError::Conflict("seats were taken concurrently".into()));
        }

        let subtotal = category.price * i64::from(req.quantity);

        let voucher = match req.voucher_code.as_deref() {
            Some(code) => {
                let voucher = vouchers::find_by_code_locked(&mut tx, event.id, code)
                    .await?
                    .ok_or_else(|| AppError::NotFound("voucher not found".into()))?;
                if !voucher.is_active(now) {
                    return Err(AppError::Validation(
                        "voucher is outside its validity window".into(),
                    ));
                }
                if !voucher.has_remaining_uses() {
                    return Err(AppError::Conflict("voucher usage limit reached".into()));
                }
                Some(voucher)
            }
            None => None,
        };

        let coupon = match req.coupon_code.as_deref() {
            Some(code) => {
                let coupon = coupons::find_by_code_locked(&mut tx, user_id, code)
                    .await?
                    .ok_or_else(|| AppError::NotFound("coupon not found".into()))?;
                if coupon.is_expired(now) {
                    return Err(AppError::Validation("coupon has expired".into()));
                }
                if coupon.is_used {
                    return Err(AppError::Conflict("coupon has already been used".into()));
                }
                Some(coupon)
            }
            None => None,
        };

        // The authoritative balance is the FIFO walk over the ledger,
        // computed with the user row locked so two purchases cannot
        // both spend the same points.
        let spendable_points = if req.points_requested > 0 {
            users::lock(&mut tx, user_id)
                .await?
                .ok_or_else(|| AppError::NotFound("user not found".into()))?;
            let earned = points::earned_entries(&mut tx, user_id).await?;
            let used_total = points::used_total(&mut tx, user_id).await?;
            ledger::fifo_balance(&earned, used_total, now)
        } else {
            0
        };

        let breakdown = PriceBreakdown::compute(
            subtotal,
            voucher.as_ref(),
            coupon.as_ref(),
            req.points_requested,
            spendable_points,
        );

        if let Some(voucher) = &voucher {
            if !vouchers::consume(&mut tx, voucher.id).await? {
                return Err(AppError::Conflict("voucher usage limit reached".into()));
            }
        }
        if let Some(coupon) = &coupon {
            if !coupons::mark_used(&mut tx, coupon.id).await? {
                return Err(AppError::Conflict("coupon has already been used".into()));
            }
        }

        let row = transactions::insert(
            &mut tx,
            transactions::NewTransaction {
                user_id,
                event_id: event.id,
                ticket_category_id: category.id,
                quantity: req.quantity,
                subtotal,
                voucher_id: voucher.as_ref().map(|v| v.id),
                coupon_id: coupon.as_ref().map(|c| c.id),
                points_used: breakdown.points_applied,
                final_price: breakdown.final_price,
                expires_at: now + self.payment_deadline,
            },
        )
        .await?;

        if breakdown.points_applied > 0 {
            if !users::adjust_point_balance(&mut tx, user_id, -breakdown.points_applied).await? {
                return Err(AppError::Internal(format!(
                    "cached point balance for user {user_id} fell behind the ledger"
                )));
            }
            points::insert_used(
                &mut tx,
                user_id,
                breakdown.points_applied,
                &format!("Ticket purchase for {}", event.title),
                row.id,
            )
            .await?;
        }

        let detail = transactions::detail(&mut tx, row.id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("transaction {} vanished", row.id)))?;

        tx.commit().await?;

        info!(
            transaction_id = %row.id,
            %user_id,
            quantity = req.quantity,
            subtotal,
            final_price = breakdown.final_price,
            points_used = breakdown.points_applied,
            "Transaction created"
        );

        Ok(detail)
    }

    /// Records the buyer's payment proof and hands the transaction to
    /// the organizer for review. Arriving after the deadline expires
    /// the transaction instead: the rollback and the EXPIRED flip
    /// commit, and the caller gets `Expired`.
    pub async fn submit_payment_proof(
        &self,
        id: Uuid,
        user_id: Uuid,
        proof: &str,
    ) -> Result<Transaction, AppError> {
        if proof.trim().is_empty() {
            return Err(AppError::Validation(
                "payment proof reference cannot be empty".into(),
            ));
        }

        let now = self.clock.now();
        let mut tx = self.db.pool().begin().await?;

        let row = transactions::lock(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("transaction not found".into()))?;
        if row.user_id != user_id {
            return Err(AppError::PermissionDenied(
                "transaction belongs to another user".into(),
            ));
        }
        if !row.status.accepts_payment_proof() {
            return Err(AppError::InvalidStateTransition(format!(
                "cannot submit payment proof from {:?}",
                row.status
            )));
        }

        if row.payment_overdue(now) {
            self.rollback_effects(&mut tx, &row).await?;
            if !transactions::update_status(
                &mut tx,
                id,
                TransactionStatus::WaitingPayment,
                TransactionStatus::Expired,
            )
            .await?
            {
                return Err(AppError::Internal(format!(
                    "expiry status swap missed for locked transaction {id}"
                )));
            }
            tx.commit().await?;

            info!(transaction_id = %id, "Transaction expired on payment submission");
            self.notifier
                .notify(
                    row.user_id,
                    NotificationKind::TransactionExpired,
                    "Transaction expired",
                    "The payment deadline passed before your proof arrived; seats and discounts were returned.",
                    Some(&format!("/transactions/{id}")),
                )
                .await;
            return Err(AppError::Expired("payment deadline has passed".into()));
        }

        if !transactions::record_payment_proof(&mut tx, id, proof, now).await? {
            return Err(AppError::Internal(format!(
                "payment proof swap missed for locked transaction {id}"
            )));
        }
        let updated = transactions::find(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("transaction {id} vanished")))?;
        let event = events::find(&mut tx, row.event_id).await?;
        tx.commit().await?;

        info!(transaction_id = %id, "Payment proof submitted");
        if let Some(event) = event {
            self.notifier
                .notify(
                    event.organizer_id,
                    NotificationKind::PaymentReceived,
                    "Payment proof received",
                    &format!("A buyer submitted payment proof for {}.", event.title),
                    Some(&format!("/transactions/{id}")),
                )
                .await;
        }

        Ok(updated)
    }

    /// Organizer approval: flips the row to DONE and settles it by
    /// minting one attendee per purchased seat, each with a unique
    /// check-in token.
    pub async fn confirm(&self, id: Uuid, organizer_id: Uuid) -> Result<Transaction, AppError> {
        let mut tx = self.db.pool().begin().await?;

        let row = transactions::lock(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("transaction not found".into()))?;
        let event = events::find(&mut tx, row.event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("event not found".into()))?;
        if event.organizer_id != organizer_id {
            return Err(AppError::PermissionDenied(
                "only the event organizer may confirm".into(),
            ));
        }
        if !row.status.accepts_organizer_decision() {
            return Err(AppError::InvalidStateTransition(format!(
                "cannot confirm from {:?}",
                row.status
            )));
        }

        if !transactions::update_status(
            &mut tx,
            id,
            TransactionStatus::WaitingConfirmation,
            TransactionStatus::Done,
        )
        .await?
        {
            return Err(AppError::Internal(format!(
                "confirm status swap missed for locked transaction {id}"
            )));
        }

        let tokens = self.issue_attendees(&mut tx, &row).await?;
        let updated = transactions::find(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("transaction {id} vanished")))?;
        let buyer = users::find(&mut tx, row.user_id).await?;
        tx.commit().await?;

        info!(
            transaction_id = %id,
            attendees = tokens.len(),
            "Transaction confirmed and settled"
        );

        self.notifier
            .notify(
                row.user_id,
                NotificationKind::TransactionConfirmed,
                "Tickets confirmed",
                &format!("Your {} ticket(s) for {} are ready.", row.quantity, event.title),
                Some(&format!("/transactions/{id}")),
            )
            .await;
        if let Some(buyer) = buyer {
            self.mailer
                .send(
                    &buyer.email,
                    &format!("Your tickets for {}", event.title),
                    "tickets-issued",
                    serde_json::json!({
                        "event": event.title,
                        "quantity": row.quantity,
                        "check_in_tokens": tokens,
                    }),
                )
                .await;
        }

        Ok(updated)
    }

    /// Organizer refusal: undoes every resource the transaction holds
    /// and lands it in REJECTED with the reason on the row.
    pub async fn reject(
        &self,
        id: Uuid,
        organizer_id: Uuid,
        reason: Option<&str>,
    ) -> Result<Transaction, AppError> {
        let mut tx = self.db.pool().begin().await?;

        let row = transactions::lock(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("transaction not found".into()))?;
        let event = events::find(&mut tx, row.event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("event not found".into()))?;
        if event.organizer_id != organizer_id {
            return Err(AppError::PermissionDenied(
                "only the event organizer may reject".into(),
            ));
        }
        if !row.status.accepts_organizer_decision() {
            return Err(AppError::InvalidStateTransition(format!(
                "cannot reject from {:?}",
                row.status
            )));
        }

        self.rollback_effects(&mut tx, &row).await?;
        if !transactions::record_rejection(&mut tx, id, reason).await? {
            return Err(AppError::Internal(format!(
                "reject status swap missed for locked transaction {id}"
            )));
        }
        let updated = transactions::find(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("transaction {id} vanished")))?;
        tx.commit().await?;

        info!(transaction_id = %id, reason = ?reason, "Transaction rejected");
        self.notifier
            .notify(
                row.user_id,
                NotificationKind::TransactionRejected,
                "Payment rejected",
                reason.unwrap_or("The organizer rejected your payment proof."),
                Some(&format!("/transactions/{id}")),
            )
            .await;

        Ok(updated)
    }

    /// Buyer-initiated cancellation, allowed while the transaction is
    /// still waiting on payment or review.
    pub async fn cancel(&self, id: Uuid, user_id: Uuid) -> Result<Transaction, AppError> {
        let mut tx = self.db.pool().begin().await?;

        let row = transactions::lock(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("transaction not found".into()))?;
        if row.user_id != user_id {
            return Err(AppError::PermissionDenied(
                "transaction belongs to another user".into(),
            ));
        }
        if !row.status.accepts_cancellation() {
            return Err(AppError::InvalidStateTransition(format!(
                "cannot cancel from {:?}",
                row.status
            )));
        }

        self.rollback_effects(&mut tx, &row).await?;
        if !transactions::update_status(&mut tx, id, row.status, TransactionStatus::Cancelled)
            .await?
        {
            return Err(AppError::Internal(format!(
                "cancel status swap missed for locked transaction {id}"
            )));
        }
        let updated = transactions::find(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("transaction {id} vanished")))?;
        let event = events::find(&mut tx, row.event_id).await?;
        tx.commit().await?;

        info!(transaction_id = %id, "Transaction cancelled by buyer");
        // The organizer only cares if a proof was already under review.
        if row.status == TransactionStatus::WaitingConfirmation {
            if let Some(event) = event {
                self.notifier
                    .notify(
                        event.organizer_id,
                        NotificationKind::TransactionCancelled,
                        "Transaction cancelled",
                        &format!("A buyer withdrew a pending purchase for {}.", event.title),
                        Some(&format!("/transactions/{id}")),
                    )
                    .await;
            }
        }

        Ok(updated)
    }

    /// Full read model for one transaction, reaping it first if its
    /// deadline quietly passed, so no caller ever sees a stale
    /// non-terminal status.
    pub async fn detail(&self, id: Uuid, actor: Uuid) -> Result<TransactionDetail, AppError> {
        let now = self.clock.now();
        let overdue = {
            let mut conn = self.db.pool().acquire().await?;
            let row = transactions::find(&mut conn, id)
                .await?
                .ok_or_else(|| AppError::NotFound("transaction not found".into()))?;
            let event = events::find(&mut conn, row.event_id)
                .await?
                .ok_or_else(|| AppError::NotFound("event not found".into()))?;
            if row.user_id != actor && event.organizer_id != actor {
                return Err(AppError::PermissionDenied(
                    "transaction belongs to another user".into(),
                ));
            }
            row.payment_overdue(now) || row.confirmation_overdue(now, self.confirmation_grace)
        };

        if overdue {
            if let Some((row, reaped_to)) = self.reap_one(id).await? {
                self.notify_reaped(&row, reaped_to).await;
            }
        }

        let mut conn = self.db.pool().acquire().await?;
        transactions::detail(&mut conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound("transaction not found".into()))
    }

    /// The caller's transactions, newest first. Overdue rows are reaped
    /// before the list is built.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<TransactionSummary>, AppError> {
        let now = self.clock.now();
        let stale = {
            let mut conn = self.db.pool().acquire().await?;
            transactions::stale_for_user(&mut conn, user_id, now, now - self.confirmation_grace)
                .await?
        };
        for id in stale {
            if let Some((row, reaped_to)) = self.reap_one(id).await? {
                self.notify_reaped(&row, reaped_to).await;
            }
        }

        let mut conn = self.db.pool().acquire().await?;
        transactions::summaries_for_user(&mut conn, user_id).await
    }

    /// Expires WAITING_PAYMENT rows whose deadline passed. Returns how
    /// many rows this pass moved.
    pub async fn sweep_expired(&self) -> Result<u64, AppError> {
        let now = self.clock.now();
        let candidates = {
            let mut conn = self.db.pool().acquire().await?;
            transactions::due_for_expiry(&mut conn, now, SWEEP_BATCH).await?
        };

        let mut reaped = 0;
        for id in candidates {
            if let Some((row, reaped_to)) = self.reap_one(id).await? {
                reaped += 1;
                self.notify_reaped(&row, reaped_to).await;
            }
        }
        Ok(reaped)
    }

    /// Cancels WAITING_CONFIRMATION rows whose proof sat unreviewed
    /// past the grace period.
    pub async fn sweep_auto_cancelled(&self) -> Result<u64, AppError> {
        let cutoff = self.clock.now() - self.confirmation_grace;
        let candidates = {
            let mut conn = self.db.pool().acquire().await?;
            transactions::due_for_auto_cancel(&mut conn, cutoff, SWEEP_BATCH).await?
        };

        let mut reaped = 0;
        for id in candidates {
            if let Some((row, reaped_to)) = self.reap_one(id).await? {
                reaped += 1;
                self.notify_reaped(&row, reaped_to).await;
            }
        }
        Ok(reaped)
    }

    /// Applies deadline policy to one row under its lock. Returns the
    /// pre-reap row and the terminal status it moved to, or `None` when
    /// there was nothing to do: the row vanished, already transitioned
    /// (a user beat the reaper to the lock), or is not actually overdue.
    async fn reap_one(
        &self,
        id: Uuid,
    ) -> Result<Option<(Transaction, TransactionStatus)>, AppError> {
        let now = self.clock.now();
        let mut tx = self.db.pool().begin().await?;

        let Some(row) = transactions::lock(&mut tx, id).await? else {
            return Ok(None);
        };
        let target = if row.payment_overdue(now) {
            TransactionStatus::Expired
        } else if row.confirmation_overdue(now, self.confirmation_grace) {
            TransactionStatus::Cancelled
        } else {
            return Ok(None);
        };

        self.rollback_effects(&mut tx, &row).await?;
        if !transactions::update_status(&mut tx, id, row.status, target).await? {
            return Err(AppError::Internal(format!(
                "reap status swap missed for locked transaction {id}"
            )));
        }
        tx.commit().await?;

        info!(transaction_id = %id, from = ?row.status, to = ?target, "Transaction reaped");
        Ok(Some((row, target)))
    }

    /// Reverses everything the transaction consumed: seats, the voucher
    /// use, the coupon burn and the point spend. Runs inside the
    /// caller's database transaction, after the row lock and status
    /// check; a miss here means stored state disagrees with the row and
    /// aborts the whole unit.
    ///
    /// The point spend is reversed by deleting the USED ledger entry;
    /// appending a compensating EARNED entry would double-count against
    /// the FIFO walk and is deliberately not done.
    async fn rollback_effects(
        &self,
        conn: &mut PgConnection,
        row: &Transaction,
    ) -> Result<(), AppError> {
        if !inventory::release_seats(conn, row.ticket_category_id, row.quantity).await? {
            return Err(AppError::Internal(format!(
                "seat release failed for category {}",
                row.ticket_category_id
            )));
        }
        if let Some(voucher_id) = row.voucher_id {
            if !vouchers::release(conn, voucher_id).await? {
                return Err(AppError::Internal(format!(
                    "voucher {voucher_id} had no use to return"
                )));
            }
        }
        if let Some(coupon_id) = row.coupon_id {
            if !coupons::mark_unused(conn, coupon_id).await? {
                return Err(AppError::Internal(format!(
                    "coupon {coupon_id} was not marked used"
                )));
            }
        }
        if row.points_used > 0 {
            let freed = points::delete_used_for_transaction(conn, row.id).await?;
            if freed != row.points_used {
                return Err(AppError::Internal(format!(
                    "ledger freed {freed} points for transaction {} but the row spent {}",
                    row.id, row.points_used
                )));
            }
            if !users::adjust_point_balance(conn, row.user_id, freed).await? {
                return Err(AppError::Internal(format!(
                    "cached point balance for user {} rejected the refund",
                    row.user_id
                )));
            }
        }
        Ok(())
    }

    /// Settlement: one attendee per purchased seat. Token collisions
    /// are absorbed by `ON CONFLICT DO NOTHING` and retried with a
    /// fresh token.
    async fn issue_attendees(
        &self,
        conn: &mut PgConnection,
        row: &Transaction,
    ) -> Result<Vec<String>, AppError> {
        let mut tokens = Vec::with_capacity(row.quantity as usize);
        for _ in 0..row.quantity {
            let mut inserted = false;
            for _ in 0..MAX_TOKEN_ATTEMPTS {
                let token = self.tokens.check_in_token();
                if attendees::try_insert(conn, row.id, row.event_id, row.user_id, &token).await? {
                    tokens.push(token);
                    inserted = true;
                    break;
                }
            }
            if !inserted {
                return Err(AppError::Conflict(
                    "could not mint a unique check-in token; retry the confirmation".into(),
                ));
            }
        }
        Ok(tokens)
    }

    async fn notify_reaped(&self, row: &Transaction, reaped_to: TransactionStatus) {
        let (kind, title, message) = match reaped_to {
            TransactionStatus::Expired => (
                NotificationKind::TransactionExpired,
                "Transaction expired",
                "The payment deadline passed; seats and discounts were returned.",
            ),
            _ => (
                NotificationKind::TransactionCancelled,
                "Transaction auto-cancelled",
                "The organizer did not review your payment in time; seats and discounts were returned.",
            ),
        };
        self.notifier
            .notify(
                row.user_id,
                kind,
                title,
                message,
                Some(&format!("/transactions/{}", row.id)),
            )
            .await;
    }
}
