//! The engine core. `pricing` and `ledger` are pure arithmetic over
//! already-fetched rows; the services around them own the database
//! transaction boundaries.

pub mod checkin;
pub mod ledger;
pub mod points;
pub mod pricing;
pub mod provisioning;
pub mod transactions;

pub use checkin::CheckInService;
pub use points::{PointBalance, PointService};
pub use provisioning::{NewEventRequest, NewVoucherRequest, ProvisioningService};
pub use transactions::{CreateTransactionRequest, TransactionService};
