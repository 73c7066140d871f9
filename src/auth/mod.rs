use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.into(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Authorization header must use Bearer token format")]
    InvalidScheme,

    #[error("Empty JWT token")]
    EmptyToken,

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("JWT secret not configured")]
    SecretNotConfigured,
}

/// Verifies HS256 bearer tokens against a shared secret.
#[derive(Clone)]
pub struct TokenValidator {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl TokenValidator {
    /// An empty secret yields a validator that rejects every token.
    pub fn new(secret: &str) -> Self {
        let key = (!secret.is_empty()).then(|| DecodingKey::from_secret(secret.as_bytes()));
        Self {
            key,
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let key = self.key.as_ref().ok_or(AuthError::SecretNotConfigured)?;
        decode::<Claims>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Pull the token out of an `Authorization: Bearer <token>` value.
    pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
        let header = header.ok_or(AuthError::MissingHeader)?;
        let token = header.strip_prefix("Bearer ").ok_or(AuthError::InvalidScheme)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        Ok(token)
    }
}

/// Sign claims with the shared secret. Token issuance lives outside this
/// service; this exists for operators and tests.
pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::SecretNotConfigured);
    }
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn accepts_tokens_signed_with_the_secret() {
        let claims = Claims::new("registrar", Duration::hours(1));
        let token = encode_token(&claims, SECRET).unwrap();
        assert_eq!(TokenValidator::new(SECRET).validate(&token).unwrap(), claims);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let validator = TokenValidator::new(SECRET);
        let other = encode_token(&Claims::new("x", Duration::hours(1)), "other-secret").unwrap();
        assert!(matches!(validator.validate(&other), Err(AuthError::InvalidToken(_))));

        let expired = encode_token(&Claims::new("x", Duration::hours(-2)), SECRET).unwrap();
        assert!(matches!(validator.validate(&expired), Err(AuthError::InvalidToken(_))));
        assert!(validator.validate("garbage").is_err());
    }

    #[test]
    fn unconfigured_secret_rejects_everything() {
        let token = encode_token(&Claims::new("x", Duration::hours(1)), SECRET).unwrap();
        assert_eq!(TokenValidator::new("").validate(&token), Err(AuthError::SecretNotConfigured));
    }

    #[test]
    fn extracts_bearer_tokens() {
        assert_eq!(TokenValidator::bearer_token(Some("Bearer abc")), Ok("abc"));
        assert_eq!(TokenValidator::bearer_token(None), Err(AuthError::MissingHeader));
        assert_eq!(TokenValidator::bearer_token(Some("Basic abc")), Err(AuthError::InvalidScheme));
        assert_eq!(TokenValidator::bearer_token(Some("Bearer   ")), Err(AuthError::EmptyToken));
    }
}
