//! Authentication: per-client sign-in sessions and the PSK layer guarding the HTTP API.
//!
//! The PSK check uses constant-time comparison to mitigate timing attacks.

mod gate;
mod registry;

pub use gate::*;
pub use registry::*;

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// PSK layer for `/api`. With no key configured every request passes.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    match provided_key(request.headers()) {
        Some(key) if constant_time_compare(key, &expected) => next.run(request).await,
        Some(_) => AppError::Unauthorized("Invalid API key".to_string()).into_response(),
        None => AppError::Unauthorized("Missing API key".to_string()).into_response(),
    }
}

/// The API key from `x-api-key`, falling back to a bearer token.
fn provided_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn guarded(psk: Option<&str>) -> Router {
        let psk = psk.map(str::to_string);
        Router::new()
            .route("/statuses", get(|| async { "[]" }))
            .layer(middleware::from_fn(move |req, next| {
                psk_auth_layer(psk.clone(), req, next)
            }))
    }

    async fn status_for(router: Router, headers: &[(&str, &str)]) -> StatusCode {
        let mut request = Request::builder().uri("/statuses");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        router
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_api_key_header_or_bearer_is_accepted() {
        let router = guarded(Some("store-key"));

        assert_eq!(
            status_for(router.clone(), &[("x-api-key", "store-key")]).await,
            StatusCode::OK
        );
        assert_eq!(
            status_for(router, &[("authorization", "Bearer store-key")]).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_wrong_or_missing_key_is_rejected() {
        let router = guarded(Some("store-key"));

        assert_eq!(
            status_for(router.clone(), &[("x-api-key", "store-kez")]).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(router.clone(), &[("authorization", "Basic store-key")]).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_for(router, &[]).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_open_when_no_key_configured() {
        assert_eq!(status_for(guarded(None), &[]).await, StatusCode::OK);
    }

    #[test]
    fn test_header_key_takes_precedence_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, "from-header".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer from-bearer".parse().unwrap());
        assert_eq!(provided_key(&headers), Some("from-header"));

        headers.remove(API_KEY_HEADER);
        assert_eq!(provided_key(&headers), Some("from-bearer"));
    }
}
