// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Admin API: supply issuance, balance inspection and the operator-facing
//! reconciliation tooling for mint failures.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    audit_log,
    auth::AdminOnly,
    error::ApiError,
    ledger::{ensure_trustline, HorizonError, Keypair, LedgerGateway, TransactionBuilder},
    reconcile::ReconcileError,
    state::AppState,
    storage::{
        AuditEvent, AuditEventType, ReconcileState, ReconciliationRecord,
        ReconciliationRepository,
    },
};

use super::payments::OutcomeResponse;

/// Request body for issuing new supply.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueSupplyRequest {
    /// Amount of the asset to issue to the distribution account.
    pub amount: String,
}

/// Response body for a supply issuance.
#[derive(Debug, Serialize, ToSchema)]
pub struct IssueSupplyResponse {
    pub message: String,
    pub ledger_transaction_id: String,
}

/// Normalized balance entry for the admin view.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminBalance {
    pub asset_code: String,
    pub asset_issuer: String,
    pub balance: String,
}

/// Admin balance response.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminBalanceResponse {
    pub balances: Vec<AdminBalance>,
}

/// Query parameters for listing reconciliation records.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ReconciliationListQuery {
    /// Optional state filter (`verifying`, `minted`, `rejected`, `mint_failed`).
    pub state: Option<String>,
}

/// Reconciliation listing response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReconciliationListResponse {
    pub records: Vec<ReconciliationRecord>,
    pub total: usize,
}

fn map_ledger_error(error: HorizonError) -> ApiError {
    match error {
        HorizonError::NotFound(account) => {
            ApiError::not_found(format!("Account {account} does not exist"))
        }
        HorizonError::Rejected { result_codes } => {
            ApiError::bad_request(format!("Transaction failed with error: {result_codes}"))
        }
        other => ApiError::bad_gateway(format!("Ledger unavailable: {other}")),
    }
}

/// Issue new supply: an issuing-account-signed payment of the asset to the
/// distribution account, provisioning the distribution trust line first.
#[utoipa::path(
    post,
    path = "/api/admin/assets",
    tag = "Admin",
    request_body = IssueSupplyRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Supply issued", body = IssueSupplyResponse),
        (status = 400, description = "Ledger rejected the issuance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 502, description = "Ledger unavailable")
    )
)]
pub async fn issue_supply(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<IssueSupplyRequest>,
) -> Result<Json<IssueSupplyResponse>, ApiError> {
    let issuing = Keypair::from_secret(&state.config.issuing_account_secret)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let distribution = Keypair::from_secret(&state.config.distribution_account_secret)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let asset = state.minter.asset();

    let distribution_account = state
        .horizon
        .load_account(distribution.public_key())
        .await
        .map_err(map_ledger_error)?;
    ensure_trustline(
        state.horizon.as_ref(),
        &distribution_account,
        &distribution,
        asset,
        &state.config.network_passphrase,
    )
    .await
    .map_err(|e| ApiError::bad_gateway(format!("Trust line setup failed: {e}")))?;

    let issuing_account = state
        .horizon
        .load_account(issuing.public_key())
        .await
        .map_err(map_ledger_error)?;

    let envelope = TransactionBuilder::new(
        &state.config.network_passphrase,
        issuing.public_key(),
        issuing_account.sequence,
    )
    .payment(distribution.public_key(), asset, request.amount.trim())
    .map_err(|e| ApiError::bad_request(e.to_string()))?
    .build_and_sign(&[&issuing])
    .map_err(|e| ApiError::internal(e.to_string()))?;

    let result = state
        .horizon
        .submit(&envelope)
        .await
        .map_err(map_ledger_error)?;

    audit_log!(
        &state.storage,
        AuditEvent::new(AuditEventType::AssetIssued)
            .with_user(&admin.user_id)
            .with_resource("transaction", &result.hash)
    );

    Ok(Json(IssueSupplyResponse {
        message: "You've successfully created more tokens!".to_string(),
        ledger_transaction_id: result.hash,
    }))
}

/// Check any account's balances, normalized for the admin view.
#[utoipa::path(
    get,
    path = "/api/admin/balance/{public_key}",
    tag = "Admin",
    params(("public_key" = String, Path, description = "Account public key")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Normalized balances", body = AdminBalanceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Account does not exist")
    )
)]
pub async fn admin_balance(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Path(public_key): Path<String>,
) -> Result<Json<AdminBalanceResponse>, ApiError> {
    let account = state
        .horizon
        .load_account(&public_key)
        .await
        .map_err(map_ledger_error)?;

    let balances = account
        .balances
        .into_iter()
        .map(|line| {
            if line.asset_type == "native" {
                AdminBalance {
                    asset_code: "XLM".to_string(),
                    asset_issuer: String::new(),
                    balance: line.balance,
                }
            } else {
                AdminBalance {
                    asset_code: line.asset_code.unwrap_or_default(),
                    asset_issuer: line.asset_issuer.unwrap_or_default(),
                    balance: line.balance,
                }
            }
        })
        .collect();

    Ok(Json(AdminBalanceResponse { balances }))
}

/// List reconciliation records, optionally filtered by state.
#[utoipa::path(
    get,
    path = "/api/admin/reconciliation",
    tag = "Admin",
    params(ReconciliationListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reconciliation records", body = ReconciliationListResponse),
        (status = 400, description = "Unknown state filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_reconciliation(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Query(query): Query<ReconciliationListQuery>,
) -> Result<Json<ReconciliationListResponse>, ApiError> {
    let filter = match query.state.as_deref() {
        None => None,
        Some("verifying") => Some(ReconcileState::Verifying),
        Some("minted") => Some(ReconcileState::Minted),
        Some("rejected") => Some(ReconcileState::Rejected),
        Some("mint_failed") => Some(ReconcileState::MintFailed),
        Some(other) => {
            return Err(ApiError::bad_request(format!(
                "Unknown state filter `{other}`"
            )))
        }
    };

    let records = ReconciliationRepository::new(&state.storage)
        .list(filter)
        .map_err(|e| ApiError::internal(format!("Failed to list records: {e}")))?;

    Ok(Json(ReconciliationListResponse {
        total: records.len(),
        records,
    }))
}

/// Replay the mint for a reference stuck in `mint_failed`.
#[utoipa::path(
    post,
    path = "/api/admin/reconciliation/{reference}/retry",
    tag = "Admin",
    params(("reference" = String, Path, description = "Payment reference")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Replay outcome", body = OutcomeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 422, description = "Reference is not in mint_failed state")
    )
)]
pub async fn retry_reconciliation(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let outcome = state
        .reconciler
        .retry_mint(reference.trim())
        .await
        .map_err(|e| match e {
            ReconcileError::Storage(message) => ApiError::unprocessable(message),
            other => ApiError::bad_gateway(other.to_string()),
        })?;

    Ok(Json(super::payments::outcome_to_response(&outcome)))
}
