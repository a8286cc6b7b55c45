// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Ledger API: balances, user-to-user transfers and transaction history.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::Auth,
    error::ApiError,
    ledger::{HorizonError, Keypair, LedgerGateway, TransactionBuilder},
    state::AppState,
    storage::{
        AuditEvent, AuditEventType, StoredTransaction, TransactionRepository, UserRepository,
    },
};

use crate::ledger::horizon::BalanceLine;

/// Balance listing for an account.
#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub balances: Vec<BalanceLine>,
}

/// Request body for a user-to-user transfer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequest {
    pub receiver_public_key: String,
    /// Token amount as a decimal string.
    pub amount: String,
}

/// Response body for a submitted transfer.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferResponse {
    pub message: String,
    pub ledger_transaction_id: String,
}

/// Local transaction history response.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListResponse {
    pub transactions: Vec<StoredTransaction>,
    pub total: usize,
}

fn map_ledger_error(error: HorizonError) -> ApiError {
    match error {
        HorizonError::NotFound(_) => {
            ApiError::bad_request("The receiver account does not exist!")
        }
        HorizonError::Rejected { result_codes } => {
            ApiError::bad_request(format!("Transaction failed with error: {result_codes}"))
        }
        other => ApiError::bad_gateway(format!("Ledger unavailable: {other}")),
    }
}

/// Check the balance list of any ledger account.
#[utoipa::path(
    get,
    path = "/api/ledger/balance/{public_key}",
    tag = "Ledger",
    params(("public_key" = String, Path, description = "Account public key")),
    responses(
        (status = 200, description = "Balance list", body = BalanceResponse),
        (status = 400, description = "Account does not exist"),
        (status = 502, description = "Ledger unavailable")
    )
)]
pub async fn check_balance(
    State(state): State<AppState>,
    Path(public_key): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account = state
        .horizon
        .load_account(&public_key)
        .await
        .map_err(map_ledger_error)?;

    Ok(Json(BalanceResponse {
        balances: account.balances,
    }))
}

/// Transfer the custom asset from the authenticated user to another account.
#[utoipa::path(
    post,
    path = "/api/ledger/transfer",
    tag = "Ledger",
    request_body = TransferRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Transfer submitted", body = TransferResponse),
        (status = 400, description = "Invalid input or ledger rejection"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found"),
        (status = 502, description = "Ledger unavailable")
    )
)]
pub async fn transfer(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    let stored = UserRepository::new(&state.storage)
        .get(&user.user_id)
        .map_err(|_| ApiError::not_found("User not found"))?;

    let sender = Keypair::from_secret(&stored.ledger_secret_seed)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let account = state
        .horizon
        .load_account(sender.public_key())
        .await
        .map_err(map_ledger_error)?;

    let envelope = TransactionBuilder::new(
        &state.config.network_passphrase,
        sender.public_key(),
        account.sequence,
    )
    .payment(
        request.receiver_public_key.trim(),
        state.minter.asset(),
        request.amount.trim(),
    )
    .map_err(|e| ApiError::bad_request(e.to_string()))?
    .build_and_sign(&[&sender])
    .map_err(|e| ApiError::internal(e.to_string()))?;

    let result = state
        .horizon
        .submit(&envelope)
        .await
        .map_err(map_ledger_error)?;

    let record = StoredTransaction::new(
        result.hash.clone(),
        sender.public_key().to_string(),
        request.receiver_public_key.trim().to_string(),
        request.amount.trim().to_string(),
        state.minter.asset().code.clone(),
        stored.user_id.clone(),
    );
    TransactionRepository::new(&state.storage)
        .create(&record)
        .map_err(|e| ApiError::internal(format!("Failed to record transaction: {e}")))?;

    audit_log!(
        &state.storage,
        AuditEvent::new(AuditEventType::TransferSubmitted)
            .with_user(&stored.user_id)
            .with_resource("transaction", &result.hash)
    );

    Ok(Json(TransferResponse {
        message: "Transaction successful!".to_string(),
        ledger_transaction_id: result.hash,
    }))
}

/// List the authenticated user's local transaction history, newest first.
#[utoipa::path(
    get,
    path = "/api/ledger/transactions",
    tag = "Ledger",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Transaction history", body = TransactionListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_transactions(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let transactions = TransactionRepository::new(&state.storage)
        .list_by_user(&user.user_id)
        .map_err(|e| ApiError::internal(format!("Failed to list transactions: {e}")))?;

    Ok(Json(TransactionListResponse {
        total: transactions.len(),
        transactions,
    }))
}

/// List recent on-ledger transactions for any account.
#[utoipa::path(
    get,
    path = "/api/ledger/accounts/{public_key}/transactions",
    tag = "Ledger",
    params(("public_key" = String, Path, description = "Account public key")),
    responses(
        (status = 200, description = "On-ledger transactions"),
        (status = 400, description = "Account does not exist"),
        (status = 502, description = "Ledger unavailable")
    )
)]
pub async fn account_transactions(
    State(state): State<AppState>,
    Path(public_key): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let records = state
        .horizon
        .account_transactions(&public_key, 20)
        .await
        .map_err(map_ledger_error)?;

    Ok(Json(records))
}
