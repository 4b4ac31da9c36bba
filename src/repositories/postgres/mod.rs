//! Postgres access, one module per table. Functions take a
//! `&mut PgConnection` rather than a pool so the calling service decides
//! the transaction boundary; anything that must be atomic across tables
//! runs on the same connection inside one `BEGIN`/`COMMIT`.
//!
//! Counter updates are guarded in the `WHERE` clause and report success
//! through `rows_affected`, so a lost race surfaces as `false`, never as
//! a negative counter.

pub mod attendees;
pub mod coupons;
pub mod events;
pub mod inventory;
pub mod points;
pub mod transactions;
pub mod users;
pub mod vouchers;
