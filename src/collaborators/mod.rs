//! Seams for everything the engine asks of the outside world: time,
//! notifications, email and token minting. Production wiring uses the
//! implementations here; tests substitute their own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

/// Source of "now". Every deadline comparison in the engine goes
/// through this so tests can move time instead of sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What happened to a transaction, for the owner's benefit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    PaymentReceived,
    TransactionConfirmed,
    TransactionRejected,
    TransactionExpired,
    TransactionCancelled,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::PaymentReceived => "payment_received",
            NotificationKind::TransactionConfirmed => "transaction_confirmed",
            NotificationKind::TransactionRejected => "transaction_rejected",
            NotificationKind::TransactionExpired => "transaction_expired",
            NotificationKind::TransactionCancelled => "transaction_cancelled",
        }
    }
}

/// In-app notification sink. Called only after a successful transition;
/// failures are the implementation's problem and must never bubble back
/// into the transaction outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        message: &str,
        link: Option<&str>,
    );
}

/// Default sink: structured log lines only.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        message: &str,
        link: Option<&str>,
    ) {
        info!(%user_id, kind = kind.as_str(), %title, %message, ?link, "Notification");
    }
}

/// Outbound email. The engine hands over a template id and its data;
/// rendering and delivery live behind the seam.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, template_id: &str, data: Value);
}

#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, template_id: &str, data: Value) {
        info!(%to, %subject, %template_id, %data, "Email");
    }
}

/// Mints opaque codes: check-in tokens and discount codes. Global
/// uniqueness is enforced by the owning tables, not here; collisions
/// are retried at the insert.
pub trait TokenGenerator: Send + Sync {
    fn check_in_token(&self) -> String;
    fn discount_code(&self) -> String;
}

pub const CHECK_IN_TOKEN_LEN: usize = 12;
pub const DISCOUNT_CODE_LEN: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct RandomTokenGenerator;

impl RandomTokenGenerator {
    fn alphanumeric_upper(&self, len: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(|b| (b as char).to_ascii_uppercase())
            .collect()
    }
}

impl TokenGenerator for RandomTokenGenerator {
    fn check_in_token(&self) -> String {
        self.alphanumeric_upper(CHECK_IN_TOKEN_LEN)
    }

    fn discount_code(&self) -> String {
        self.alphanumeric_upper(DISCOUNT_CODE_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_uppercase_alphanumeric_and_sized() {
        let gen = RandomTokenGenerator;
        for _ in 0..50 {
            let token = gen.check_in_token();
            assert_eq!(token.len(), CHECK_IN_TOKEN_LEN);
            assert!(token
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn discount_codes_are_shorter_than_check_in_tokens() {
        let gen = RandomTokenGenerator;
        assert_eq!(gen.discount_code().len(), DISCOUNT_CODE_LEN);
        assert!(DISCOUNT_CODE_LEN < CHECK_IN_TOKEN_LEN);
    }

    #[test]
    fn consecutive_tokens_differ() {
        let gen = RandomTokenGenerator;
        let a = gen.check_in_token();
        let b = gen.check_in_token();
        assert_ne!(a, b);
    }
}
