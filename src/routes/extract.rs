use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    error::{AppError, ServiceError},
    services::identity::Identity,
    state::SharedState,
};

/// Identity of the caller, resolved through the configured identity provider.
///
/// Rejects anonymous requests with `401 Unauthorized`.
pub struct Caller(pub Identity);

impl FromRequestParts<SharedState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        state
            .identity_provider()
            .identify(&parts.headers)
            .map(Caller)
            .ok_or_else(|| ServiceError::AuthenticationRequired.into())
    }
}
