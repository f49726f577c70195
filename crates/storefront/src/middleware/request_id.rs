//! Request ID middleware.
//!
//! Reuses a well-formed `x-request-id` from an upstream proxy or generates a
//! UUID v4, then records it in the tracing span, the Sentry scope and the
//! response headers.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream request ID that is trusted.
const MAX_REQUEST_ID_LENGTH: usize = 128;

/// Attach a request ID to the span, Sentry scope and response.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(accept_upstream_id)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", &request_id);

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Upstream IDs must be short, non-empty, visible ASCII.
fn accept_upstream_id(raw: &str) -> Option<&str> {
    let id = raw.trim();
    let valid = !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LENGTH
        && id.bytes().all(|b| b.is_ascii_graphic());
    valid.then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_proxy_ids() {
        assert_eq!(accept_upstream_id("8c2f-41aa"), Some("8c2f-41aa"));
        assert_eq!(accept_upstream_id(" abc "), Some("abc"));
    }

    #[test]
    fn rejects_blank_long_or_spaced_ids() {
        assert_eq!(accept_upstream_id("   "), None);
        assert_eq!(accept_upstream_id("a b"), None);
        assert_eq!(accept_upstream_id(&"x".repeat(129)), None);
    }
}
