//! JWT access tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{Role, User};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    /// Token id, the denylist key on logout.
    pub jti: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

/// Signs and verifies HS256 access tokens with the configured secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue(&self, user: &User) -> Result<AccessToken, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4(),
        };
        let access_token = self.sign(&claims)?;

        Ok(AccessToken {
            access_token,
            token_type: "bearer",
            expires_in: self.ttl_seconds(),
        })
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token signing failed: {e}")))
    }

    /// Verifies signature and expiry. Any failure is a 401.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Rejected access token: {e}");
                AppError::Unauthorized("Could not validate credentials".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-test-secret-test-secret";

    fn make_user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            full_name: "Jane Doe".to_string(),
            password_hash: String::new(),
            role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issued_token_verifies_with_same_claims() {
        let service = TokenService::new(SECRET, 30);
        let user = make_user(Role::AccountManager);

        let token = service.issue(&user).unwrap();
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_in, 30 * 60);

        let claims = service.verify(&token.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "jdoe");
        assert_eq!(claims.role, Role::AccountManager);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_each_token_gets_a_fresh_jti() {
        let service = TokenService::new(SECRET, 30);
        let user = make_user(Role::Recruiter);
        let a = service.verify(&service.issue(&user).unwrap().access_token).unwrap();
        let b = service.verify(&service.issue(&user).unwrap().access_token).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = TokenService::new(SECRET, 30);
        let other = TokenService::new("another-secret-another-secret-12345", 30);
        let token = issuer.issue(&make_user(Role::Admin)).unwrap();
        assert!(matches!(
            other.verify(&token.access_token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = TokenService::new(SECRET, 30);
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "old".to_string(),
            role: Role::Recruiter,
            iat: now - 7200,
            exp: now - 3600,
            jti: Uuid::new_v4(),
        };
        let token = service.sign(&claims).unwrap();
        assert!(service.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let service = TokenService::new(SECRET, 30);
        assert!(service.verify("not.a.jwt").is_err());
        assert!(service.verify("").is_err());
    }
}
