//! JWT bearer authentication for the REST lifecycle endpoints.
//!
//! Tokens are issued by the main Kawayan backend; this service only
//! verifies them (HS256, shared secret) and extracts the caller's
//! identity and role. The signaling WebSocket itself is unauthenticated:
//! room names are rendezvous keys, not a security boundary.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::RelayError;

/// Role claim carried in every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular end user of the platform.
    User,
    /// Support agent.
    Support,
    /// Administrator.
    Admin,
}

impl Role {
    /// Whether this role may use the agent-side endpoints (active-call
    /// list, call history, ticket resolution).
    #[must_use]
    pub const fn is_support(self) -> bool {
        matches!(self, Self::Support | Self::Admin)
    }
}

/// JWT claims for Kawayan user tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id).
    pub sub: String,
    /// User's email.
    pub email: String,
    /// Caller role.
    pub role: Role,
    /// Expiration (unix seconds).
    pub exp: u64,
    /// Issued at (unix seconds).
    pub iat: u64,
}

/// HS256 key pair derived from the shared secret.
#[derive(Clone)]
pub struct AuthKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl std::fmt::Debug for AuthKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthKeys").finish_non_exhaustive()
    }
}

impl AuthKeys {
    /// Derives encoding and decoding keys from the shared secret.
    #[must_use]
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }

    /// Signs a token for the given claims.
    ///
    /// Used by tests and operational tooling; production tokens come from
    /// the main backend.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Internal`] if signing fails.
    pub fn encode_token(&self, claims: &Claims) -> Result<String, RelayError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| RelayError::Internal(e.to_string()))
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`] on an invalid or expired token.
    pub fn decode_token(&self, token: &str) -> Result<Claims, RelayError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| RelayError::Unauthorized(e.to_string()))
    }
}

/// Authenticated caller, extracted from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// User id from the `sub` claim.
    pub user_id: String,
    /// Email claim.
    pub email: String,
    /// Role claim.
    pub role: Role,
}

impl AuthUser {
    /// Ensures the caller holds the support or admin role.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Forbidden`] otherwise.
    pub fn require_support(&self) -> Result<(), RelayError> {
        if self.role.is_support() {
            Ok(())
        } else {
            Err(RelayError::Forbidden)
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = RelayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RelayError::Unauthorized("missing bearer token".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| RelayError::Unauthorized("malformed authorization header".to_string()))?;

        let claims = state.auth.decode_token(token)?;
        Ok(Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn claims(role: Role) -> Claims {
        let now = chrono::Utc::now().timestamp().unsigned_abs();
        Claims {
            sub: "5f3c9d00-0000-0000-0000-00000000ab12".to_string(),
            email: "maria@example.com".to_string(),
            role,
            exp: now + 900,
            iat: now,
        }
    }

    #[test]
    fn token_round_trip() {
        let keys = AuthKeys::from_secret("test-secret");
        let Ok(token) = keys.encode_token(&claims(Role::Support)) else {
            panic!("encode failed");
        };
        let Ok(back) = keys.decode_token(&token) else {
            panic!("decode failed");
        };
        assert_eq!(back.role, Role::Support);
        assert_eq!(back.email, "maria@example.com");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let keys = AuthKeys::from_secret("test-secret");
        let Ok(token) = keys.encode_token(&claims(Role::User)) else {
            panic!("encode failed");
        };
        let other = AuthKeys::from_secret("other-secret");
        assert!(matches!(
            other.decode_token(&token),
            Err(RelayError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = AuthKeys::from_secret("test-secret");
        let mut expired = claims(Role::User);
        expired.iat -= 3600;
        expired.exp = expired.iat + 60;
        let Ok(token) = keys.encode_token(&expired) else {
            panic!("encode failed");
        };
        assert!(keys.decode_token(&token).is_err());
    }

    #[test]
    fn only_support_and_admin_pass_role_gate() {
        let user = AuthUser {
            user_id: "u".to_string(),
            email: "u@example.com".to_string(),
            role: Role::User,
        };
        assert!(matches!(user.require_support(), Err(RelayError::Forbidden)));

        for role in [Role::Support, Role::Admin] {
            let agent = AuthUser { role, ..user.clone() };
            assert!(agent.require_support().is_ok());
        }
    }
}
