use std::env;

use chrono::Duration;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

/// Runtime configuration, read once at startup. Every knob has a
/// default so a bare `DATABASE_URL` is enough to boot.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_db_connections: u32,
    /// How long a new transaction may sit unpaid.
    pub payment_deadline_minutes: i64,
    /// How long a submitted proof may await an organizer decision.
    pub confirmation_grace_days: i64,
    /// Window for the "points expiring soon" lookup.
    pub point_expiry_warning_days: i64,
    /// Cadence of the background deadline sweep.
    pub reaper_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/panggung".to_string()),
            port: parse_or(env::var("PORT").ok(), 3001),
            max_db_connections: parse_or(env::var("MAX_DB_CONNECTIONS").ok(), 5),
            payment_deadline_minutes: parse_or(env::var("PAYMENT_DEADLINE_MINUTES").ok(), 120),
            confirmation_grace_days: parse_or(env::var("CONFIRMATION_GRACE_DAYS").ok(), 3),
            point_expiry_warning_days: parse_or(env::var("POINT_EXPIRY_WARNING_DAYS").ok(), 14),
            reaper_interval_secs: parse_or(env::var("REAPER_INTERVAL_SECS").ok(), 60),
        }
    }

    pub fn payment_deadline(&self) -> Duration {
        Duration::minutes(self.payment_deadline_minutes)
    }

    pub fn confirmation_grace(&self) -> Duration {
        Duration::days(self.confirmation_grace_days)
    }

    pub fn point_expiry_warning(&self) -> Duration {
        Duration::days(self.point_expiry_warning_days)
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_on_missing_or_garbage() {
        assert_eq!(parse_or::<u16>(None, 3001), 3001);
        assert_eq!(parse_or::<u16>(Some("not a port".into()), 3001), 3001);
        assert_eq!(parse_or::<u16>(Some("8080".into()), 3001), 8080);
    }

    #[test]
    fn durations_derive_from_the_raw_knobs() {
        let config = Config {
            database_url: String::new(),
            port: 3001,
            max_db_connections: 5,
            payment_deadline_minutes: 120,
            confirmation_grace_days: 3,
            point_expiry_warning_days: 14,
            reaper_interval_secs: 60,
        };
        assert_eq!(config.payment_deadline(), Duration::hours(2));
        assert_eq!(config.confirmation_grace(), Duration::days(3));
        assert_eq!(config.point_expiry_warning(), Duration::weeks(2));
    }
}
