use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Seat inventory for one price tier of an event.
///
/// `available_seats + sold == total_seats` holds at all times; the schema
/// enforces it with a CHECK constraint and the inventory repository only
/// ever writes values computed under a row lock.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketCategory {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    /// Price per seat in minor currency units.
    pub price: i64,
    pub total_seats: i32,
    pub available_seats: i32,
    pub sold: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketCategory {
    pub fn can_reserve(&self, quantity: i32) -> bool {
        quantity > 0 && self.available_seats >= quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(available: i32, sold: i32) -> TicketCategory {
        TicketCategory {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            name: "Regular".to_string(),
            price: 150_000,
            total_seats: available + sold,
            available_seats: available,
            sold,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn reserve_guard_respects_availability() {
        let cat = category(10, 0);
        assert!(cat.can_reserve(10));
        assert!(!cat.can_reserve(11));
        assert!(!cat.can_reserve(0));
        assert!(!cat.can_reserve(-1));
    }

    #[test]
    fn reserve_guard_counts_only_unsold_seats() {
        let cat = category(2, 8);
        assert!(cat.can_reserve(2));
        assert!(!cat.can_reserve(3));
    }
}
