// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! User account API: signup, login, profile and password reset.
//!
//! Signup provisions the ledger side as well: a fresh keypair, an
//! on-ledger account funded by the distribution account, and the initial
//! trust line for the custom asset signed by the new keypair. The secret
//! seed is stored custodially and never leaves the service.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::{
        claims::{issue_reset_token, issue_session_token, verify_reset_token},
        Auth, AuthError, Role,
    },
    error::ApiError,
    ledger::{ensure_trustline, HorizonError, Keypair, LedgerGateway, TransactionBuilder},
    state::AppState,
    storage::{AuditEvent, AuditEventType, StorageError, StoredUser, UserRepository},
};

/// Native-unit balance every new ledger account is funded with.
const STARTING_BALANCE: &str = "20";

/// Request body for signup.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Response body for signup.
#[derive(Debug, Serialize, ToSchema)]
pub struct SignupResponse {
    pub message: String,
    pub user_id: String,
}

/// Request body for login.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Email address or username.
    pub identifier: String,
    pub password: String,
}

/// Profile fields exposed to the client. The custodial secret seed is
/// never included.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub ledger_public_key: String,
}

/// Response body for login.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub profile: ProfileResponse,
}

/// Request body for requesting a password reset.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetRequest {
    pub email: String,
}

/// Request body for applying a password reset.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Generic message response.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn validate_signup(request: &SignupRequest) -> Result<(), ApiError> {
    if request.username.trim().is_empty()
        || request.email.trim().is_empty()
        || request.first_name.trim().is_empty()
        || request.last_name.trim().is_empty()
    {
        return Err(ApiError::bad_request("All fields are required"));
    }
    if !request.email.contains('@') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }
    if request.password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

fn map_ledger_error(error: HorizonError) -> ApiError {
    match error {
        HorizonError::Rejected { result_codes } => ApiError::bad_gateway(format!(
            "Ledger rejected account provisioning: {result_codes}"
        )),
        other => ApiError::bad_gateway(format!("Ledger unavailable: {other}")),
    }
}

/// Create a user account with a funded ledger account and trust line.
#[utoipa::path(
    post,
    path = "/api/users/signup",
    tag = "Users",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = SignupResponse),
        (status = 400, description = "Invalid input or already signed up"),
        (status = 502, description = "Ledger unavailable")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    validate_signup(&request)?;

    let email = request.email.trim().to_ascii_lowercase();
    let username = request.username.trim().to_string();

    let repo = UserRepository::new(&state.storage);
    if repo.find_by_identifier(&email).is_ok() || repo.find_by_identifier(&username).is_ok() {
        return Err(ApiError::bad_request("You've already signed up!"));
    }

    // Generate the user's ledger keypair.
    let pair = Keypair::random();

    // Fund the new account with enough native units to activate it.
    let distribution = Keypair::from_secret(&state.config.distribution_account_secret)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let distribution_account = state
        .horizon
        .load_account(distribution.public_key())
        .await
        .map_err(map_ledger_error)?;

    let funding = TransactionBuilder::new(
        &state.config.network_passphrase,
        distribution.public_key(),
        distribution_account.sequence,
    )
    .create_account(pair.public_key(), STARTING_BALANCE)
    .map_err(|e| ApiError::internal(e.to_string()))?
    .build_and_sign(&[&distribution])
    .map_err(|e| ApiError::internal(e.to_string()))?;

    state
        .horizon
        .submit(&funding)
        .await
        .map_err(map_ledger_error)?;

    // Establish the trust line for the custom asset, signed by the new
    // account's own key.
    let new_account = state
        .horizon
        .load_account(pair.public_key())
        .await
        .map_err(map_ledger_error)?;
    ensure_trustline(
        state.horizon.as_ref(),
        &new_account,
        &pair,
        state.minter.asset(),
        &state.config.network_passphrase,
    )
    .await
    .map_err(|e| ApiError::bad_gateway(format!("Trust line setup failed: {e}")))?;

    let user = StoredUser {
        user_id: uuid::Uuid::new_v4().to_string(),
        username,
        email: email.clone(),
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        password_hash: hash_password(&request.password)?,
        role: Role::Client,
        ledger_public_key: pair.public_key().to_string(),
        ledger_secret_seed: pair.secret_seed(),
        created_at: Utc::now(),
    };

    repo.create(&user).map_err(|e| match e {
        StorageError::AlreadyExists(_) => ApiError::bad_request("You've already signed up!"),
        other => ApiError::internal(format!("Failed to store user: {other}")),
    })?;

    audit_log!(
        &state.storage,
        AuditEvent::new(AuditEventType::UserSignedUp)
            .with_user(&user.user_id)
            .with_resource("account", &user.ledger_public_key)
    );

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "You signed up successfully! :)".to_string(),
            user_id: user.user_id,
        }),
    ))
}

/// Log in with email/username + password and receive a session token.
#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Unknown user or wrong password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let repo = UserRepository::new(&state.storage);
    let user = repo.find_by_identifier(request.identifier.trim()).map_err(|_| {
        ApiError::bad_request("User not found! Please check your details and try again")
    })?;

    if !verify_password(&request.password, &user.password_hash) {
        audit_log!(
            &state.storage,
            AuditEvent::new(AuditEventType::LoginFailed).with_user(&user.user_id)
        );
        return Err(ApiError::bad_request(
            "The password provided is invalid! Please try again",
        ));
    }

    // Operator-configured admin grants take precedence over the stored role.
    let role = if state.config.is_admin_email(&user.email) {
        Role::Admin
    } else {
        user.role
    };

    let token = issue_session_token(&state.config.jwt_secret, &user.user_id, role)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    audit_log!(
        &state.storage,
        AuditEvent::new(AuditEventType::LoginSucceeded).with_user(&user.user_id)
    );

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        profile: ProfileResponse {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            ledger_public_key: user.ledger_public_key,
        },
    }))
}

/// Fetch the authenticated user's profile.
#[utoipa::path(
    get,
    path = "/api/users/profile",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn profile(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let stored = UserRepository::new(&state.storage)
        .get(&user.user_id)
        .map_err(|_| ApiError::not_found("User details not found"))?;

    Ok(Json(ProfileResponse {
        username: stored.username,
        email: stored.email,
        first_name: stored.first_name,
        last_name: stored.last_name,
        ledger_public_key: stored.ledger_public_key,
    }))
}

/// Issue a password-reset token for the given email.
///
/// Mail delivery is delegated to the deployment; the reset link lands in
/// the operator log.
#[utoipa::path(
    post,
    path = "/api/users/send-reset-password-email",
    tag = "Users",
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Reset link issued", body = MessageResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn send_reset_password_email(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = UserRepository::new(&state.storage)
        .find_by_identifier(request.email.trim())
        .map_err(|_| ApiError::not_found("User not found"))?;

    let token = issue_reset_token(&state.config.jwt_secret, &user.user_id)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let reset_url = format!(
        "{}/api/users/reset-password?token={token}",
        state.config.base_url
    );

    info!(user_id = %user.user_id, reset_url = %reset_url, "password reset link issued");

    Ok(Json(MessageResponse {
        message: "Check your e-mail, a password reset link has been sent".to_string(),
    }))
}

/// Apply a password reset using a previously issued token.
#[utoipa::path(
    post,
    path = "/api/users/reset-password",
    tag = "Users",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 401, description = "Token expired"),
        (status = 403, description = "Invalid token")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if request.token.trim().is_empty() || request.new_password.is_empty() {
        return Err(ApiError::bad_request("Token and new password are required"));
    }
    if request.new_password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    let user_id =
        verify_reset_token(&state.config.jwt_secret, request.token.trim()).map_err(|e| match e {
            AuthError::TokenExpired => ApiError::unauthorized("Token expired"),
            _ => ApiError::forbidden("Invalid token"),
        })?;

    let repo = UserRepository::new(&state.storage);
    let mut user = repo
        .get(&user_id)
        .map_err(|_| ApiError::not_found("User not found"))?;

    user.password_hash = hash_password(&request.new_password)?;
    repo.update(&user)
        .map_err(|e| ApiError::internal(format!("Failed to update user: {e}")))?;

    audit_log!(
        &state.storage,
        AuditEvent::new(AuditEventType::PasswordReset).with_user(&user.user_id)
    );

    Ok(Json(MessageResponse {
        message: "Password reset successful".to_string(),
    }))
}
