use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

/// Identity of the caller, resolved by the authentication middleware.
///
/// Anonymous when no credentials were sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requester(Option<String>);

impl Requester {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self(Some(user_id.into()))
    }

    pub fn user_id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Requester>()
            .cloned()
            .unwrap_or_default())
    }
}
