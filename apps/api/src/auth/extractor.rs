use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::roles::can_access_assigned;
use crate::errors::AppError;
use crate::models::user::Role;
use crate::state::AppState;

/// The caller behind a valid, unrevoked bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub jti: Uuid,
    pub exp: i64,
}

impl AuthUser {
    /// Fails with 403 unless `allowed` holds for the caller's role.
    pub fn require(&self, allowed: bool, message: &str) -> Result<(), AppError> {
        if allowed {
            Ok(())
        } else {
            Err(AppError::Forbidden(message.to_string()))
        }
    }

    /// Fails with 403 when a recruiter touches a row assigned to someone else.
    pub fn require_assigned(&self, assignee: Option<Uuid>, what: &str) -> Result<(), AppError> {
        self.require(
            can_access_assigned(self.role, self.id, assignee),
            &format!("Not authorized to access this {what}"),
        )
    }

    /// Time left before the token expires; used as the denylist TTL.
    pub fn remaining_lifetime(&self) -> Duration {
        let secs = (self.exp - Utc::now().timestamp()).max(0);
        Duration::from_secs(secs as u64)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

        let claims = state.tokens.verify(token)?;

        if state.denylist.is_revoked(claims.jti).await? {
            return Err(AppError::Unauthorized("Token has been revoked".to_string()));
        }

        Ok(AuthUser {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
            jti: claims.jti,
            exp: claims.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Basic dXNlcjpwdw=="))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[test]
    fn test_require_assigned_scopes_recruiters() {
        let me = AuthUser {
            id: Uuid::new_v4(),
            username: "rec".to_string(),
            role: Role::Recruiter,
            jti: Uuid::new_v4(),
            exp: Utc::now().timestamp() + 60,
        };
        assert!(me.require_assigned(Some(me.id), "application").is_ok());
        let err = me
            .require_assigned(Some(Uuid::new_v4()), "application")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Forbidden: Not authorized to access this application"
        );
        assert!(me.remaining_lifetime() <= Duration::from_secs(60));
    }
}
