//! Organizer- and platform-side setup: events, ticket categories,
//! vouchers and coupons. Thin single-table writes plus ownership and
//! field validation; the engine proper consumes what is created here.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::collaborators::{Clock, TokenGenerator};
use crate::db::Database;
use crate::models::{Attendee, Coupon, DiscountKind, Event, TicketCategory, Voucher};
use crate::repositories::postgres::{attendees, coupons, events, inventory, users, vouchers};
use crate::utils::AppError;

/// Retries when a generated discount code collides with an existing one.
const MAX_CODE_ATTEMPTS: usize = 5;

pub struct NewEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

pub struct NewVoucherRequest {
    pub code: Option<String>,
    pub discount_kind: DiscountKind,
    pub discount_amount: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub usage_limit: i32,
}

pub struct ProvisioningService {
    db: Database,
    clock: Arc<dyn Clock>,
    tokens: Arc<dyn TokenGenerator>,
}

impl ProvisioningService {
    pub fn new(db: Database, clock: Arc<dyn Clock>, tokens: Arc<dyn TokenGenerator>) -> Self {
        Self { db, clock, tokens }
    }

    pub async fn create_event(
        &self,
        organizer_id: Uuid,
        req: NewEventRequest,
    ) -> Result<Event, AppError> {
        if req.title.trim().is_empty() {
            return Err(AppError::Validation("event title cannot be empty".into()));
        }
        if req.location.trim().is_empty() {
            return Err(AppError::Validation("event location cannot be empty".into()));
        }
        if let Some(end_time) = req.end_time {
            if end_time <= req.start_time {
                return Err(AppError::Validation(
                    "event end time must be after its start time".into(),
                ));
            }
        }

        let mut conn = self.db.pool().acquire().await?;
        users::find(&mut conn, organizer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("organizer not found".into()))?;

        let event = events::insert(
            &mut conn,
            events::NewEvent {
                organizer_id,
                title: req.title,
                description: req.description,
                location: req.location,
                start_time: req.start_time,
                end_time: req.end_time,
            },
        )
        .await?;

        info!(event_id = %event.id, %organizer_id, title = %event.title, "Event created");
        Ok(event)
    }

    pub async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        let mut conn = self.db.pool().acquire().await?;
        events::list(&mut conn).await
    }

    /// Price tiers for an event, cheapest first. Public: buyers browse
    /// this before purchasing.
    pub async fn event_categories(&self, event_id: Uuid) -> Result<Vec<TicketCategory>, AppError> {
        let mut conn = self.db.pool().acquire().await?;
        events::find(&mut conn, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("event not found".into()))?;
        inventory::categories_for_event(&mut conn, event_id).await
    }

    /// Seeds a price tier with its full inventory: `available = total`,
    /// `sold = 0`.
    pub async fn create_category(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
        name: String,
        price: i64,
        total_seats: i32,
    ) -> Result<TicketCategory, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("category name cannot be empty".into()));
        }
        if price < 0 {
            return Err(AppError::Validation("price cannot be negative".into()));
        }
        if total_seats <= 0 {
            return Err(AppError::Validation(
                "total seats must be greater than zero".into(),
            ));
        }

        let mut conn = self.db.pool().acquire().await?;
        let event = self.owned_event(&mut conn, event_id, organizer_id).await?;

        let category = inventory::insert_category(
            &mut conn,
            inventory::NewTicketCategory {
                event_id: event.id,
                name,
                price,
                total_seats,
            },
        )
        .await?;

        info!(
            category_id = %category.id,
            event_id = %event.id,
            seats = total_seats,
            "Ticket category created"
        );
        Ok(category)
    }

    /// Creates an event-scoped voucher. Without a caller-supplied code
    /// one is minted, retrying on collision; a supplied duplicate is the
    /// caller's conflict to resolve.
    pub async fn create_voucher(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
        req: NewVoucherRequest,
    ) -> Result<Voucher, AppError> {
        match req.discount_kind {
            DiscountKind::Percentage => {
                if !(1..=100).contains(&req.discount_amount) {
                    return Err(AppError::Validation(
                        "percentage discount must be between 1 and 100".into(),
                    ));
                }
            }
            DiscountKind::Fixed => {
                if req.discount_amount <= 0 {
                    return Err(AppError::Validation(
                        "fixed discount must be greater than zero".into(),
                    ));
                }
            }
        }
        if req.valid_to <= req.valid_from {
            return Err(AppError::Validation(
                "voucher validity window is empty".into(),
            ));
        }
        if req.usage_limit <= 0 {
            return Err(AppError::Validation(
                "usage limit must be greater than zero".into(),
            ));
        }
        if let Some(code) = &req.code {
            if code.trim().is_empty() {
                return Err(AppError::Validation("voucher code cannot be empty".into()));
            }
        }

        let mut conn = self.db.pool().acquire().await?;
        let event = self.owned_event(&mut conn, event_id, organizer_id).await?;

        let supplied = req.code.is_some();
        let mut code = req
            .code
            .unwrap_or_else(|| self.tokens.discount_code());
        for attempt in 0.. {
            let result = vouchers::insert(
                &mut conn,
                vouchers::NewVoucher {
                    event_id: event.id,
                    code: code.clone(),
                    discount_kind: req.discount_kind,
                    discount_amount: req.discount_amount,
                    valid_from: req.valid_from,
                    valid_to: req.valid_to,
                    usage_limit: req.usage_limit,
                },
            )
            .await;

            match result {
                Ok(voucher) => {
                    info!(voucher_id = %voucher.id, event_id = %event.id, code = %voucher.code, "Voucher created");
                    return Ok(voucher);
                }
                Err(e) if e.is_unique_violation() => {
                    if supplied {
                        return Err(AppError::Conflict(
                            "a voucher with this code already exists for the event".into(),
                        ));
                    }
                    if attempt + 1 >= MAX_CODE_ATTEMPTS {
                        return Err(AppError::Conflict(
                            "could not mint a unique voucher code; retry".into(),
                        ));
                    }
                    code = self.tokens.discount_code();
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("voucher insert loop always returns");
    }

    /// Issues a user-scoped single-use coupon.
    pub async fn issue_coupon(
        &self,
        user_id: Uuid,
        discount_amount: i64,
        valid_days: i64,
        code: Option<String>,
    ) -> Result<Coupon, AppError> {
        if discount_amount <= 0 {
            return Err(AppError::Validation(
                "coupon discount must be greater than zero".into(),
            ));
        }
        if valid_days <= 0 {
            return Err(AppError::Validation(
                "coupon validity must be at least one day".into(),
            ));
        }
        if let Some(code) = &code {
            if code.trim().is_empty() {
                return Err(AppError::Validation("coupon code cannot be empty".into()));
            }
        }

        let mut conn = self.db.pool().acquire().await?;
        users::find(&mut conn, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;

        let expires_at = self.clock.now() + Duration::days(valid_days);
        let supplied = code.is_some();
        let mut code = code.unwrap_or_else(|| self.tokens.discount_code());
        for attempt in 0.. {
            let result =
                coupons::insert(&mut conn, user_id, &code, discount_amount, expires_at).await;

            match result {
                Ok(coupon) => {
                    info!(coupon_id = %coupon.id, %user_id, code = %coupon.code, "Coupon issued");
                    return Ok(coupon);
                }
                Err(e) if e.is_unique_violation() => {
                    if supplied {
                        return Err(AppError::Conflict(
                            "a coupon with this code already exists".into(),
                        ));
                    }
                    if attempt + 1 >= MAX_CODE_ATTEMPTS {
                        return Err(AppError::Conflict(
                            "could not mint a unique coupon code; retry".into(),
                        ));
                    }
                    code = self.tokens.discount_code();
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("coupon insert loop always returns");
    }

    /// The coupons issued to a user, soonest-expiring first.
    pub async fn user_coupons(&self, user_id: Uuid) -> Result<Vec<Coupon>, AppError> {
        let mut conn = self.db.pool().acquire().await?;
        users::find(&mut conn, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;
        coupons::list_for_user(&mut conn, user_id).await
    }

    /// The attendee roster for an event, organizer-only.
    pub async fn attendees_for_event(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
    ) -> Result<Vec<Attendee>, AppError> {
        let mut conn = self.db.pool().acquire().await?;
        self.owned_event(&mut conn, event_id, organizer_id).await?;
        attendees::for_event(&mut conn, event_id).await
    }

    async fn owned_event(
        &self,
        conn: &mut sqlx::PgConnection,
        event_id: Uuid,
        organizer_id: Uuid,
    ) -> Result<Event, AppError> {
        let event = events::find(conn, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("event not found".into()))?;
        if event.organizer_id != organizer_id {
            return Err(AppError::PermissionDenied(
                "event belongs to another organizer".into(),
            ));
        }
        Ok(event)
    }
}
