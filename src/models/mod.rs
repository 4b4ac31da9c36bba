pub mod attendee;
pub mod coupon;
pub mod event;
pub mod point;
pub mod ticket_category;
pub mod transaction;
pub mod user;
pub mod voucher;

pub use attendee::{Attendee, CheckInContext, CheckInOutcome};
pub use coupon::Coupon;
pub use event::Event;
pub use point::{ExpiringPoints, PointEntryKind, PointLedgerEntry};
pub use ticket_category::TicketCategory;
pub use transaction::{Transaction, TransactionDetail, TransactionStatus, TransactionSummary};
pub use user::User;
pub use voucher::{DiscountKind, Voucher};
