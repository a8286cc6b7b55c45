// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Payment API: checkout intents, verification and the payer callback.
//!
//! Both the server-to-server verify endpoint and the payer-facing
//! callback run the same reconciliation pipeline; they differ only in how
//! the outcome is rendered (JSON vs HTML).

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::{
    audit_log,
    auth::{AdminOnly, Auth},
    error::ApiError,
    ledger::{HorizonError, MintError},
    pages,
    reconcile::{ReconcileError, ReconcileOutcome},
    state::AppState,
    storage::{AuditEvent, AuditEventType, UserRepository},
};

/// Request body for creating a checkout intent.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateIntentRequest {
    /// Top-up amount as a decimal string (e.g. "500" or "25.50").
    pub amount: String,
}

/// Response body for a created checkout intent.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateIntentResponse {
    /// Hosted checkout URL to redirect the payer to.
    pub authorization_url: String,
    /// Access code for inline checkout UIs.
    pub access_code: String,
    /// Payment reference identifying this checkout attempt.
    pub reference: String,
}

/// Gateway configuration exposed to checkout UIs.
#[derive(Debug, Serialize, ToSchema)]
pub struct GatewayConfigResponse {
    pub public_key: String,
}

/// Request body for the verify endpoint.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub reference: String,
}

/// Request body for the direct mint endpoint.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MintRequest {
    pub user_id: String,
    /// Token amount as a decimal string.
    pub amount: String,
}

/// Structured outcome returned to server-to-server callers.
#[derive(Debug, Serialize, ToSchema)]
pub struct OutcomeResponse {
    pub success: bool,
    pub outcome: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_transaction_id: Option<String>,
}

/// Query parameters of the payer callback redirect.
#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    /// Payment reference.
    pub reference: Option<String>,
    /// Alternate parameter name some gateway flows use.
    pub trxref: Option<String>,
}

/// Parse a client-supplied top-up amount into gateway minor units.
fn parse_amount_to_minor(amount: &str) -> Result<u64, ApiError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request("amount must be a positive number"));
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() > 2 {
        return Err(ApiError::bad_request("amount must be a positive number"));
    }

    let whole_part = parts[0];
    if whole_part.is_empty() || !whole_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request("amount must be a positive number"));
    }
    let whole = whole_part
        .parse::<u64>()
        .map_err(|_| ApiError::bad_request("amount is too large"))?;

    let fraction_part = if parts.len() == 2 { parts[1] } else { "" };
    if !fraction_part.chars().all(|c| c.is_ascii_digit()) || fraction_part.len() > 2 {
        return Err(ApiError::bad_request(
            "amount must have at most 2 decimal places",
        ));
    }
    let fraction = match fraction_part.len() {
        0 => 0,
        1 => {
            fraction_part
                .parse::<u64>()
                .map_err(|_| ApiError::bad_request("amount must be a positive number"))?
                * 10
        }
        _ => fraction_part
            .parse::<u64>()
            .map_err(|_| ApiError::bad_request("amount must be a positive number"))?,
    };

    let minor = whole
        .checked_mul(100)
        .and_then(|base| base.checked_add(fraction))
        .ok_or_else(|| ApiError::bad_request("amount is too large"))?;

    if minor == 0 {
        return Err(ApiError::bad_request("amount must be a positive number"));
    }

    Ok(minor)
}

pub(crate) fn outcome_to_response(outcome: &ReconcileOutcome) -> OutcomeResponse {
    match outcome {
        ReconcileOutcome::Minted {
            amount, tx_hash, ..
        } => OutcomeResponse {
            success: true,
            outcome: "minted".to_string(),
            message: "Tokens minted successfully".to_string(),
            amount: Some(amount.clone()),
            ledger_transaction_id: Some(tx_hash.clone()),
        },
        ReconcileOutcome::AlreadyProcessed => OutcomeResponse {
            success: false,
            outcome: "already_processed".to_string(),
            message: "Payment reference has already been processed".to_string(),
            amount: None,
            ledger_transaction_id: None,
        },
        ReconcileOutcome::Rejected { reason } => OutcomeResponse {
            success: false,
            outcome: "rejected".to_string(),
            message: reason.clone(),
            amount: None,
            ledger_transaction_id: None,
        },
        ReconcileOutcome::MintFailed { reason } => OutcomeResponse {
            success: false,
            outcome: "mint_failed".to_string(),
            message: format!("Payment was successful but token minting failed: {reason}"),
            amount: None,
            ledger_transaction_id: None,
        },
    }
}

fn map_reconcile_error(error: ReconcileError) -> ApiError {
    match error {
        ReconcileError::Gateway(inner) => {
            ApiError::bad_gateway(format!("Failed to verify payment: {inner}"))
        }
        ReconcileError::Storage(message) => ApiError::internal(message),
    }
}

/// Expose the gateway public key for checkout UIs.
#[utoipa::path(
    get,
    path = "/api/payments/config",
    tag = "Payments",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Gateway configuration", body = GatewayConfigResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn gateway_config(
    Auth(_user): Auth,
    State(state): State<AppState>,
) -> Json<GatewayConfigResponse> {
    Json(GatewayConfigResponse {
        public_key: state.config.paystack_public_key.clone(),
    })
}

/// Create a checkout intent for the authenticated user.
///
/// The user's identity is embedded in the intent metadata so it survives
/// the round trip through the gateway and back into the callback.
#[utoipa::path(
    post,
    path = "/api/payments/intents",
    tag = "Payments",
    request_body = CreateIntentRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Checkout intent created", body = CreateIntentResponse),
        (status = 400, description = "Invalid amount"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found"),
        (status = 502, description = "Gateway unavailable")
    )
)]
pub async fn create_intent(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateIntentRequest>,
) -> Result<(StatusCode, Json<CreateIntentResponse>), ApiError> {
    let amount_minor = parse_amount_to_minor(&request.amount)?;

    let stored = UserRepository::new(&state.storage)
        .get(&user.user_id)
        .map_err(|_| ApiError::not_found("User details not found!"))?;

    let intent = state
        .gateway
        .initialize_transaction(&stored.email, amount_minor, &stored.user_id)
        .await
        .map_err(|e| ApiError::bad_gateway(format!("Failed to create payment intent: {e}")))?;

    audit_log!(
        &state.storage,
        AuditEvent::new(AuditEventType::PaymentIntentCreated)
            .with_user(&stored.user_id)
            .with_resource("reference", &intent.reference)
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateIntentResponse {
            authorization_url: intent.authorization_url,
            access_code: intent.access_code,
            reference: intent.reference,
        }),
    ))
}

/// Verify a payment reference and mint on success (JSON outcome).
#[utoipa::path(
    post,
    path = "/api/payments/verify",
    tag = "Payments",
    request_body = VerifyRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reconciliation outcome", body = OutcomeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Gateway unavailable")
    )
)]
pub async fn verify_payment(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let reference = request.reference.trim();
    if reference.is_empty() {
        return Err(ApiError::bad_request("reference is required"));
    }

    let outcome = state
        .reconciler
        .process(reference)
        .await
        .map_err(map_reconcile_error)?;

    Ok(Json(outcome_to_response(&outcome)))
}

/// Mint tokens directly to a user (operator tooling).
#[utoipa::path(
    post,
    path = "/api/payments/mint",
    tag = "Payments",
    request_body = MintRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tokens minted", body = OutcomeResponse),
        (status = 400, description = "Ledger rejected the mint"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found"),
        (status = 502, description = "Ledger unavailable")
    )
)]
pub async fn mint_tokens(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<MintRequest>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let user = UserRepository::new(&state.storage)
        .get(&request.user_id)
        .map_err(|_| ApiError::not_found("User not found"))?;

    let receipt = state
        .minter
        .mint(&user, &request.amount)
        .await
        .map_err(|e| match e {
            MintError::RecipientNotFound(account) => {
                ApiError::not_found(format!("Recipient account {account} does not exist"))
            }
            MintError::UserNotFound(user_id) => {
                ApiError::not_found(format!("User {user_id} not found"))
            }
            MintError::Ledger(HorizonError::Rejected { result_codes }) => {
                ApiError::bad_request(format!("Mint tokens failed: {result_codes}"))
            }
            MintError::Build(inner) => ApiError::bad_request(inner.to_string()),
            other => ApiError::bad_gateway(format!("Mint tokens failed: {other}")),
        })?;

    audit_log!(
        &state.storage,
        AuditEvent::new(AuditEventType::TokensMinted)
            .with_user(&request.user_id)
            .with_resource("transaction", &receipt.tx_hash)
    );

    Ok(Json(OutcomeResponse {
        success: true,
        outcome: "minted".to_string(),
        message: "Tokens minted successfully".to_string(),
        amount: Some(receipt.amount),
        ledger_transaction_id: Some(receipt.tx_hash),
    }))
}

/// Payer-facing callback hit by the gateway redirect after checkout.
///
/// Always answers with a rendered HTML page, never a bare error.
#[utoipa::path(
    get,
    path = "/api/payments/callback",
    tag = "Payments",
    params(CallbackQuery),
    responses(
        (status = 200, description = "Payment applied or already processed", content_type = "text/html"),
        (status = 400, description = "Verification failed", content_type = "text/html"),
        (status = 500, description = "Mint failed after payment", content_type = "text/html")
    )
)]
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> (StatusCode, Html<String>) {
    let Some(reference) = query
        .reference
        .or(query.trxref)
        .filter(|value| !value.trim().is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Html(pages::payment_verification_failed(
                "Missing payment reference. Please contact support if you completed a payment.",
            )),
        );
    };

    match state.reconciler.process(reference.trim()).await {
        Ok(ReconcileOutcome::Minted { amount, .. }) => {
            (StatusCode::OK, Html(pages::payment_success(&amount)))
        }
        Ok(ReconcileOutcome::AlreadyProcessed) => {
            (StatusCode::OK, Html(pages::payment_already_processed()))
        }
        Ok(ReconcileOutcome::Rejected { .. }) => (
            StatusCode::BAD_REQUEST,
            Html(pages::payment_verification_failed(
                "We could not verify your payment. \
                 Please contact support if you believe this is an error.",
            )),
        ),
        Ok(ReconcileOutcome::MintFailed { .. }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(pages::payment_mint_failed()),
        ),
        Err(e) => {
            error!(reference = %reference, error = %e, "callback processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::payment_verification_failed(
                    "An error occurred while processing your payment. Please contact support.",
                )),
            )
        }
    }
}
