use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// How a voucher's `discount_amount` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "discount_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// `discount_amount` is a percentage of the subtotal (0..=100).
    Percentage,
    /// `discount_amount` is a flat amount in minor units.
    Fixed,
}

/// Event-scoped promotional discount with a validity window and a shared
/// usage budget. `used_count <= usage_limit` always; consumption and
/// rollback move the counter under a row lock.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Voucher {
    pub id: Uuid,
    pub event_id: Uuid,
    pub code: String,
    pub discount_kind: DiscountKind,
    pub discount_amount: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub usage_limit: i32,
    pub used_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Voucher {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now <= self.valid_to
    }

    pub fn has_remaining_uses(&self) -> bool {
        self.used_count < self.usage_limit
    }

    /// Discount this voucher grants against `subtotal`, in minor units.
    /// Percentage discounts round down; fixed discounts never exceed the
    /// subtotal.
    pub fn discount_on(&self, subtotal: i64) -> i64 {
        match self.discount_kind {
            DiscountKind::Percentage => subtotal * self.discount_amount / 100,
            DiscountKind::Fixed => self.discount_amount.min(subtotal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn voucher(kind: DiscountKind, amount: i64) -> Voucher {
        let now = Utc::now();
        Voucher {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            code: "PROMO".to_string(),
            discount_kind: kind,
            discount_amount: amount,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(1),
            usage_limit: 10,
            used_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn percentage_discount_rounds_down() {
        let v = voucher(DiscountKind::Percentage, 10);
        assert_eq!(v.discount_on(100_000), 10_000);
        // 10% of 10_005 is 1_000.5, truncated.
        assert_eq!(v.discount_on(10_005), 1_000);
    }

    #[test]
    fn fixed_discount_is_capped_at_subtotal() {
        let v = voucher(DiscountKind::Fixed, 75_000);
        assert_eq!(v.discount_on(100_000), 75_000);
        assert_eq!(v.discount_on(50_000), 50_000);
    }

    #[test]
    fn validity_window_is_inclusive() {
        let v = voucher(DiscountKind::Fixed, 1_000);
        assert!(v.is_active(v.valid_from));
        assert!(v.is_active(v.valid_to));
        assert!(!v.is_active(v.valid_to + Duration::seconds(1)));
        assert!(!v.is_active(v.valid_from - Duration::seconds(1)));
    }

    #[test]
    fn usage_budget_is_exclusive_at_the_limit() {
        let mut v = voucher(DiscountKind::Fixed, 1_000);
        v.used_count = 9;
        assert!(v.has_remaining_uses());
        v.used_count = 10;
        assert!(!v.has_remaining_uses());
    }
}
