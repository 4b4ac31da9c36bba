//! FIFO point arithmetic. Pure functions over EARNED entries fetched
//! oldest-first plus the total ever spent; the database never stores a
//! computed balance, so expiry needs no background job. An entry simply
//! stops counting once `expires_at` passes.

use chrono::{DateTime, Duration, Utc};

use crate::models::{ExpiringPoints, PointLedgerEntry};

/// Spendable balance right now.
///
/// Spending consumes the oldest earned points first, so the total spent
/// (`used_total`) is attributed to entries in order; whatever remains of
/// each entry counts only while the entry is unexpired. Points consumed
/// before their entry expired stay consumed.
pub fn fifo_balance(earned: &[PointLedgerEntry], used_total: i64, now: DateTime<Utc>) -> i64 {
    walk(earned, used_total, now).balance
}

/// The subset of the current balance that disappears within `window`,
/// with the soonest expiry among the at-risk entries.
pub fn expiring_within(
    earned: &[PointLedgerEntry],
    used_total: i64,
    now: DateTime<Utc>,
    window: Duration,
) -> ExpiringPoints {
    let horizon = now + window;
    let mut total = 0;
    let mut nearest_expiry: Option<DateTime<Utc>> = None;

    for (entry, remaining) in walk(earned, used_total, now).remainders {
        if remaining == 0 {
            continue;
        }
        if let Some(expires_at) = entry.expires_at {
            if expires_at <= horizon {
                total += remaining;
                nearest_expiry = match nearest_expiry {
                    Some(current) if current <= expires_at => Some(current),
                    _ => Some(expires_at),
                };
            }
        }
    }

    ExpiringPoints {
        total,
        nearest_expiry,
    }
}

struct Walk<'a> {
    balance: i64,
    /// Unexpired entries paired with what is left of them after FIFO
    /// consumption.
    remainders: Vec<(&'a PointLedgerEntry, i64)>,
}

fn walk(earned: &[PointLedgerEntry], used_total: i64, now: DateTime<Utc>) -> Walk<'_> {
    let mut to_consume = used_total.max(0);
    let mut balance = 0;
    let mut remainders = Vec::new();

    for entry in earned {
        let consumed = to_consume.min(entry.amount);
        to_consume -= consumed;
        let remaining = entry.amount - consumed;

        if !entry.is_expired(now) {
            balance += remaining;
            remainders.push((entry, remaining));
        }
    }

    Walk {
        balance,
        remainders,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PointEntryKind;
    use uuid::Uuid;

    fn earned(amount: i64, expires_at: Option<DateTime<Utc>>) -> PointLedgerEntry {
        PointLedgerEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount,
            kind: PointEntryKind::Earned,
            description: "test".into(),
            transaction_id: None,
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[test]
    fn spending_consumes_oldest_entries_first() {
        // 5000 expiring far out, then 3000 expiring soon; 4000 spent.
        // The spend eats into the first entry only.
        let now = Utc::now();
        let entries = vec![
            earned(5_000, Some(now + Duration::days(30))),
            earned(3_000, Some(now + Duration::days(2))),
        ];

        assert_eq!(fifo_balance(&entries, 4_000, now), 4_000);

        // Once the second entry expires its untouched 3000 vanish.
        let later = now + Duration::days(3);
        assert_eq!(fifo_balance(&entries, 4_000, later), 1_000);
    }

    #[test]
    fn expired_entries_do_not_shield_newer_ones() {
        // The spend is attributed to the first entry even though that
        // entry has since expired; its leftovers are gone either way.
        let now = Utc::now();
        let entries = vec![
            earned(5_000, Some(now - Duration::days(1))),
            earned(2_000, None),
        ];

        assert_eq!(fifo_balance(&entries, 3_000, now), 2_000);
    }

    #[test]
    fn never_expiring_entries_count_forever() {
        let now = Utc::now();
        let entries = vec![earned(1_500, None)];
        assert_eq!(fifo_balance(&entries, 0, now + Duration::days(3650)), 1_500);
    }

    #[test]
    fn overdrawn_ledger_reports_zero_not_negative() {
        let now = Utc::now();
        let entries = vec![earned(1_000, None)];
        assert_eq!(fifo_balance(&entries, 5_000, now), 0);
    }

    #[test]
    fn expiring_within_reports_at_risk_remainder_and_nearest_date() {
        let now = Utc::now();
        let soon = now + Duration::days(2);
        let sooner = now + Duration::days(1);
        let entries = vec![
            earned(5_000, Some(now + Duration::days(60))),
            earned(3_000, Some(soon)),
            earned(2_000, Some(sooner)),
        ];

        // 4000 spent: all from the first entry, so both short-dated
        // entries are fully at risk.
        let expiring = expiring_within(&entries, 4_000, now, Duration::days(14));
        assert_eq!(expiring.total, 5_000);
        assert_eq!(expiring.nearest_expiry, Some(sooner));
    }

    #[test]
    fn expiring_within_ignores_fully_consumed_entries() {
        let now = Utc::now();
        let entries = vec![
            earned(3_000, Some(now + Duration::days(2))),
            earned(5_000, None),
        ];

        // The whole first entry is already spent; nothing is at risk.
        let expiring = expiring_within(&entries, 3_000, now, Duration::days(14));
        assert_eq!(expiring.total, 0);
        assert_eq!(expiring.nearest_expiry, None);
    }
}
