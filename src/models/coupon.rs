use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User-scoped single-use discount. Once `is_used` flips to true it stays
/// true unless the owning transaction is rolled back.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Coupon {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub discount_amount: i64,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Discount against what is still payable after the voucher. A coupon
    /// never pushes the price below zero.
    pub fn discount_against(&self, remaining_payable: i64) -> i64 {
        self.discount_amount.min(remaining_payable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn coupon_discount_never_exceeds_remaining() {
        let now = Utc::now();
        let c = Coupon {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            code: "WELCOME".to_string(),
            discount_amount: 50_000,
            expires_at: now + Duration::days(30),
            is_used: false,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(c.discount_against(90_000), 50_000);
        assert_eq!(c.discount_against(20_000), 20_000);
        assert_eq!(c.discount_against(0), 0);
        assert!(!c.is_expired(now));
        assert!(c.is_expired(now + Duration::days(31)));
    }
}
