use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::{Claims, TokenValidator};
use crate::error::ApiError;

/// Identity of the bearer, attached to the request extensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub subject: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { subject: claims.sub }
    }
}

/// Rejects the request with 401 unless it carries a valid bearer token.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|v| v.to_str().map_err(|_| ApiError::unauthorized("Invalid Authorization header format")))
        .transpose()?;

    let token = TokenValidator::bearer_token(header)?;
    let claims = state.tokens.validate(token).map_err(|e| {
        tracing::debug!("rejected bearer token: {}", e);
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}
