//! HS256 access tokens.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use clayhouse_core::{UserId, UserRole};

use crate::config::JwtConfig;
use crate::models::user::User;

/// Errors from issuing or checking a token.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Encode(String),
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: UserId,
    pub email: String,
    pub role: UserRole,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: config.ttl,
        }
    }

    /// Issue a token for a user.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encode` if signing fails.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user.id,
            email: user.email.as_str().to_string(),
            role: user.role,
            iat,
            exp: iat.saturating_add(ttl),
        };
        self.sign(&claims)
    }

    /// Sign arbitrary claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encode` if signing fails.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Check the signature and expiry of a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` for an expired token and
    /// `TokenError::Invalid` for anything else that fails validation.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clayhouse_core::{AuthProvider, Email};
    use secrecy::SecretString;

    fn keys(secret: &str) -> TokenKeys {
        TokenKeys::new(&JwtConfig {
            secret: SecretString::from(secret.to_string()),
            ttl: Duration::from_secs(3600),
        })
    }

    fn user(role: UserRole) -> User {
        User {
            id: UserId::new(),
            email: Email::parse("potter@example.com").unwrap(),
            password_hash: None,
            provider: AuthProvider::Email,
            provider_id: None,
            full_name: None,
            phone: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let keys = keys("z8#Kq!2mP@x7$Lw9^Rt4&Vb6*Nc1%Hd3");
        let admin = user(UserRole::Admin);
        let claims = keys.verify(&keys.issue(&admin).unwrap()).unwrap();

        assert_eq!(claims.sub, admin.id);
        assert_eq!(claims.email, "potter@example.com");
        assert!(claims.is_admin());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = keys("z8#Kq!2mP@x7$Lw9^Rt4&Vb6*Nc1%Hd3")
            .issue(&user(UserRole::Member))
            .unwrap();
        let result = keys("a1!Bb2@Cc3#Dd4$Ee5%Ff6^Gg7&Hh8*I").verify(&token);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_expired_token() {
        let keys = keys("z8#Kq!2mP@x7$Lw9^Rt4&Vb6*Nc1%Hd3");
        let now = Utc::now().timestamp();
        let token = keys
            .sign(&Claims {
                sub: UserId::new(),
                email: "potter@example.com".to_string(),
                role: UserRole::Member,
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();
        assert!(matches!(keys.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_garbage_token() {
        let keys = keys("z8#Kq!2mP@x7$Lw9^Rt4&Vb6*Nc1%Hd3");
        assert!(matches!(keys.verify("not-a-jwt"), Err(TokenError::Invalid(_))));
    }
}
