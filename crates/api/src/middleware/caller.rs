//! Caller identity middleware.
//!
//! Rejects requests without a usable `X-User-Id` and stores the resolved
//! [`Caller`] in request extensions for the rate limiter and handlers.

use axum::{body::Body, http::Request, middleware::Next, response::IntoResponse, response::Response};

use crate::extractors::Caller;

/// Middleware that requires gateway identity headers.
pub async fn require_caller(mut req: Request<Body>, next: Next) -> Response {
    match Caller::from_headers(req.headers()) {
        Ok(caller) => {
            tracing::Span::current().record("user_id", tracing::field::display(caller.user_id));
            req.extensions_mut().insert(caller);
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(error = %err, "Rejected request without caller identity");
            err.into_response()
        }
    }
}
