use axum::http::{header, HeaderName, HeaderValue, Method, Uri};
use std::env;
use tower_http::cors::{AllowOrigin, CorsLayer};

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

pub fn create_cors_layer() -> CorsLayer {
    let origins_str =
        env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string());

    CorsLayer::new()
        .allow_origin(parse_allowed_origins(&origins_str))
        // The API surface is GET/POST/PATCH only.
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-user-id"),
        ])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

/// Credentials are allowed, so a wildcard origin is off the table
/// (tower-http rejects the combination at runtime). A config that
/// yields no usable origin falls back to the dev defaults instead.
fn parse_allowed_origins(origins_str: &str) -> AllowOrigin {
    let mut origins = origin_list(origins_str);
    if origins.is_empty() {
        tracing::warn!("CORS: no usable origins configured, falling back to dev defaults");
        origins = origin_list(DEFAULT_ALLOWED_ORIGINS);
    }

    tracing::info!(count = origins.len(), "CORS: origin allow-list configured");
    AllowOrigin::list(origins)
}

fn origin_list(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .filter_map(|candidate| {
            let parsed = parse_origin(candidate);
            if parsed.is_none() {
                tracing::warn!(origin = candidate, "CORS: skipping entry, not an http(s) origin");
            }
            parsed
        })
        .collect()
}

/// A usable origin is `scheme://host[:port]` with an http(s) scheme.
/// Header-value legality alone is not enough: `*` and free text are
/// valid header bytes, and a `*` reaching `AllowOrigin::list` aborts
/// startup.
fn parse_origin(candidate: &str) -> Option<HeaderValue> {
    let uri: Uri = candidate.parse().ok()?;
    if !matches!(uri.scheme_str(), Some("http") | Some("https")) || uri.authority().is_none() {
        return None;
    }
    HeaderValue::from_str(candidate).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_builds_from_defaults() {
        let _layer = create_cors_layer();
    }

    #[test]
    fn default_origins_all_parse() {
        assert_eq!(origin_list(DEFAULT_ALLOWED_ORIGINS).len(), 2);
    }

    #[test]
    fn blank_and_garbage_configs_fall_back_to_defaults() {
        assert!(origin_list("").is_empty());
        assert!(origin_list(" , ,").is_empty());
        // Still ends up with a non-empty allow-list, never a wildcard.
        let _ = parse_allowed_origins(" , ,");
    }

    #[test]
    fn non_origin_entries_are_dropped() {
        let origins =
            origin_list("https://tickets.example.com, not a url, ftp://files.example.com, *");
        assert_eq!(origins.len(), 1);
        assert_eq!(origins[0], "https://tickets.example.com");
    }

    #[test]
    fn wildcard_config_falls_back_instead_of_aborting() {
        assert!(origin_list("*").is_empty());
        // Must never hand a wildcard to AllowOrigin::list.
        let _ = parse_allowed_origins("*");
    }
}
