// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! JWT claims and authenticated user representation.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::AuthError;
use super::roles::Role;

/// Session token lifetime.
const SESSION_TOKEN_TTL_HOURS: i64 = 1;

/// Claims carried by issued JWTs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the canonical user ID.
    pub sub: String,
    /// Issued-at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
    /// Role name (`client` or `admin`).
    #[serde(default)]
    pub role: Option<String>,
    /// Token purpose; absent for sessions, `password_reset` for reset links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

/// Authenticated user extracted from a verified session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim).
    pub user_id: String,
    /// User's role.
    pub role: Role,
}

impl AuthenticatedUser {
    /// Check whether this user is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Issue a session token for a user.
pub fn issue_session_token(secret: &str, user_id: &str, role: Role) -> Result<String, AuthError> {
    issue(secret, user_id, role, None)
}

/// Issue a password-reset token for a user.
pub fn issue_reset_token(secret: &str, user_id: &str) -> Result<String, AuthError> {
    issue(secret, user_id, Role::Client, Some("password_reset"))
}

fn issue(
    secret: &str,
    user_id: &str,
    role: Role,
    purpose: Option<&str>,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(SESSION_TOKEN_TTL_HOURS)).timestamp(),
        role: Some(role.as_str().to_string()),
        purpose: purpose.map(str::to_string),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))
}

/// Verify a session token and extract the authenticated user.
///
/// Reset tokens are rejected here: a `purpose` claim disqualifies a token
/// from being used as a session.
pub fn verify_session_token(secret: &str, token: &str) -> Result<AuthenticatedUser, AuthError> {
    let claims = verify(secret, token)?;
    if claims.purpose.is_some() {
        return Err(AuthError::MalformedToken);
    }

    let role = claims
        .role
        .as_deref()
        .and_then(Role::from_str)
        .unwrap_or_default();

    Ok(AuthenticatedUser {
        user_id: claims.sub,
        role,
    })
}

/// Verify a password-reset token and return the user ID it was issued for.
pub fn verify_reset_token(secret: &str, token: &str) -> Result<String, AuthError> {
    let claims = verify(secret, token)?;
    if claims.purpose.as_deref() != Some("password_reset") {
        return Err(AuthError::MalformedToken);
    }
    Ok(claims.sub)
}

fn verify(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::MalformedToken,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn session_token_round_trips() {
        let token = issue_session_token(SECRET, "user-42", Role::Admin).unwrap();
        let user = verify_session_token(SECRET, &token).unwrap();
        assert_eq!(user.user_id, "user-42");
        assert_eq!(user.role, Role::Admin);
        assert!(user.is_admin());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_session_token(SECRET, "user-42", Role::Client).unwrap();
        let result = verify_session_token("other-secret", &token);
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn garbage_token_is_malformed() {
        let result = verify_session_token(SECRET, "not.a.token");
        assert!(matches!(result, Err(AuthError::MalformedToken)));
    }

    #[test]
    fn reset_token_is_not_a_session() {
        let token = issue_reset_token(SECRET, "user-42").unwrap();
        assert!(matches!(
            verify_session_token(SECRET, &token),
            Err(AuthError::MalformedToken)
        ));
        assert_eq!(verify_reset_token(SECRET, &token).unwrap(), "user-42");
    }

    #[test]
    fn session_token_is_not_a_reset() {
        let token = issue_session_token(SECRET, "user-42", Role::Client).unwrap();
        assert!(matches!(
            verify_reset_token(SECRET, &token),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn missing_role_defaults_to_client() {
        let now = Utc::now();
        let claims = Claims {
            sub: "user-7".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
            role: None,
            purpose: None,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let user = verify_session_token(SECRET, &token).unwrap();
        assert_eq!(user.role, Role::Client);
    }
}
