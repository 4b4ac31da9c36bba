use std::env;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::header::{
    HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY,
    STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};
use axum::http::{Request, Response};
use pin_project::pin_project;
use tower::{Layer, Service};

/// Stamps hardening headers onto every response.
///
/// The API serves per-user purchase and point data, so responses are
/// marked `no-store`; the CSP assumes no HTML is ever served. The set
/// is assembled once at startup and shared by every service clone.
#[derive(Clone)]
pub struct SecurityHeadersLayer {
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl SecurityHeadersLayer {
    pub fn new(include_hsts: bool) -> Self {
        let mut set: Vec<(HeaderName, HeaderValue)> = vec![
            (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            (X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
            (
                CONTENT_SECURITY_POLICY,
                HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
            ),
            (
                REFERRER_POLICY,
                HeaderValue::from_static("strict-origin-when-cross-origin"),
            ),
            (CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ];
        if include_hsts {
            set.push((
                STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_static("max-age=31536000; includeSubDomains"),
            ));
        }

        Self { headers: set.into() }
    }

    /// HSTS only when `RUST_ENV=production`; a plain-HTTP dev setup
    /// must not teach browsers to force TLS on localhost.
    pub fn from_env() -> Self {
        let production = env::var("RUST_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        tracing::info!(hsts = production, "Security headers configured");
        Self::new(production)
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService {
            inner,
            headers: self.headers.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SecurityHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = SecurityHeadersFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        SecurityHeadersFuture {
            future: self.inner.call(request),
            headers: self.headers.clone(),
        }
    }
}

#[pin_project]
pub struct SecurityHeadersFuture<F> {
    #[pin]
    future: F,
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl<F, ResBody, E> Future for SecurityHeadersFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        this.future.poll(cx).map_ok(|mut response| {
            let target = response.headers_mut();
            for (name, value) in this.headers.iter() {
                target.insert(name.clone(), value.clone());
            }
            response
        })
    }
}

pub fn create_security_headers_layer() -> SecurityHeadersLayer {
    SecurityHeadersLayer::from_env()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsts_joins_the_set_only_when_asked() {
        let dev = SecurityHeadersLayer::new(false);
        assert!(!dev
            .headers
            .iter()
            .any(|(n, _)| *n == STRICT_TRANSPORT_SECURITY));

        let prod = SecurityHeadersLayer::new(true);
        assert!(prod
            .headers
            .iter()
            .any(|(n, _)| *n == STRICT_TRANSPORT_SECURITY));
    }

    #[test]
    fn responses_are_never_cacheable() {
        let layer = SecurityHeadersLayer::new(false);
        let cache = layer
            .headers
            .iter()
            .find(|(n, _)| *n == CACHE_CONTROL)
            .map(|(_, v)| v.clone());
        assert_eq!(cache, Some(HeaderValue::from_static("no-store")));
    }

    #[test]
    fn from_env_defaults_to_no_hsts() {
        std::env::remove_var("RUST_ENV");
        let layer = SecurityHeadersLayer::from_env();
        assert!(!layer
            .headers
            .iter()
            .any(|(n, _)| *n == STRICT_TRANSPORT_SECURITY));
    }
}
