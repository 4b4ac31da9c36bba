//! Discount stacking arithmetic. Pure: the caller has already fetched
//! and validated the instruments; this module only does the math, in
//! the one fixed order of voucher, then coupon, then points.

use serde::Serialize;

use crate::models::{Coupon, Voucher};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    pub subtotal: i64,
    pub voucher_discount: i64,
    pub coupon_discount: i64,
    pub points_applied: i64,
    pub final_price: i64,
}

impl PriceBreakdown {
    /// `spendable_points` is the user's authoritative FIFO balance;
    /// points fill whatever the voucher and coupon left payable, capped
    /// by both the request and the balance.
    pub fn compute(
        subtotal: i64,
        voucher: Option<&Voucher>,
        coupon: Option<&Coupon>,
        points_requested: i64,
        spendable_points: i64,
    ) -> Self {
        let voucher_discount = voucher.map(|v| v.discount_on(subtotal)).unwrap_or(0);
        let after_voucher = (subtotal - voucher_discount).max(0);

        let coupon_discount = coupon.map(|c| c.discount_against(after_voucher)).unwrap_or(0);
        let after_coupon = after_voucher - coupon_discount;

        let points_applied = points_requested.min(spendable_points).min(after_coupon).max(0);
        let final_price = (after_coupon - points_applied).max(0);

        PriceBreakdown {
            subtotal,
            voucher_discount,
            coupon_discount,
            points_applied,
            final_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiscountKind;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn voucher(kind: DiscountKind, amount: i64) -> Voucher {
        let now = Utc::now();
        Voucher {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            code: "PROMO".into(),
            discount_kind: kind,
            discount_amount: amount,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(1),
            usage_limit: 100,
            used_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn coupon(amount: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            code: "WELCOME".into(),
            discount_amount: amount,
            expires_at: now + Duration::days(30),
            is_used: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn stacks_voucher_then_coupon_then_points() {
        // 100_000 - 10% - 50_000 leaves 40_000 payable; a 100_000-point
        // request is capped to that and the final price reaches zero.
        let v = voucher(DiscountKind::Percentage, 10);
        let c = coupon(50_000);
        let breakdown = PriceBreakdown::compute(100_000, Some(&v), Some(&c), 100_000, 500_000);

        assert_eq!(breakdown.voucher_discount, 10_000);
        assert_eq!(breakdown.coupon_discount, 50_000);
        assert_eq!(breakdown.points_applied, 40_000);
        assert_eq!(breakdown.final_price, 0);
    }

    #[test]
    fn points_are_capped_by_balance() {
        let breakdown = PriceBreakdown::compute(100_000, None, None, 80_000, 25_000);
        assert_eq!(breakdown.points_applied, 25_000);
        assert_eq!(breakdown.final_price, 75_000);
    }

    #[test]
    fn coupon_sees_the_post_voucher_amount() {
        // Fixed 70_000 voucher leaves 30_000; the 50_000 coupon may only
        // take what is left.
        let v = voucher(DiscountKind::Fixed, 70_000);
        let c = coupon(50_000);
        let breakdown = PriceBreakdown::compute(100_000, Some(&v), Some(&c), 0, 0);

        assert_eq!(breakdown.voucher_discount, 70_000);
        assert_eq!(breakdown.coupon_discount, 30_000);
        assert_eq!(breakdown.final_price, 0);
    }

    #[test]
    fn no_instruments_means_full_price() {
        let breakdown = PriceBreakdown::compute(42_000, None, None, 0, 10_000);
        assert_eq!(
            breakdown,
            PriceBreakdown {
                subtotal: 42_000,
                voucher_discount: 0,
                coupon_discount: 0,
                points_applied: 0,
                final_price: 42_000,
            }
        );
    }

    #[test]
    fn negative_point_request_applies_nothing() {
        let breakdown = PriceBreakdown::compute(10_000, None, None, -5, 10_000);
        assert_eq!(breakdown.points_applied, 0);
        assert_eq!(breakdown.final_price, 10_000);
    }
}
