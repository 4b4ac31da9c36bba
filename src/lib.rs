//! Reservation & settlement engine for an event-ticketing platform:
//! seat inventory, stacked discounts (vouchers, coupons, a FIFO point
//! ledger), the purchase lifecycle with exact compensating rollback,
//! and deadline reaping, exposed over a thin axum HTTP layer.

pub mod collaborators;
pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;
