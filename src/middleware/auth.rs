use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};

use crate::auth::{verify_token, AuthError};
use crate::extractors::Requester;
use crate::AppState;

/// Extract the token from a `Bearer` credential; the scheme is case-insensitive
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty()).then_some(token)
}

/// Middleware that resolves the caller's identity from a bearer token
///
/// Requests without an `Authorization` header continue as anonymous.
/// A header that is present but malformed, expired or badly signed is
/// rejected with 401 on every route.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let requester = match request.headers().get(AUTHORIZATION) {
        None => Requester::anonymous(),
        Some(value) => {
            let token = value
                .to_str()
                .ok()
                .and_then(bearer_token)
                .ok_or_else(|| {
                    tracing::warn!("Malformed authorization header");
                    AuthError::MalformedHeader
                })?;

            let user_id = verify_token(token, &state.config.jwt_secret).inspect_err(|e| {
                tracing::warn!(error = %e, "Rejected bearer token");
            })?;

            Requester::authenticated(user_id)
        }
    };

    request.extensions_mut().insert(requester);
    Ok(next.run(request).await)
}
