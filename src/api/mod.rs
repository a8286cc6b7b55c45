// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod admin;
pub mod health;
pub mod ledger;
pub mod payments;
pub mod users;

pub fn router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/signup", post(users::signup))
        .route("/login", post(users::login))
        .route("/profile", get(users::profile))
        .route(
            "/send-reset-password-email",
            post(users::send_reset_password_email),
        )
        .route("/reset-password", post(users::reset_password));

    let payment_routes = Router::new()
        .route("/config", get(payments::gateway_config))
        .route("/intents", post(payments::create_intent))
        .route("/verify", post(payments::verify_payment))
        .route("/mint", post(payments::mint_tokens))
        .route("/callback", get(payments::callback));

    let ledger_routes = Router::new()
        .route("/balance/{public_key}", get(ledger::check_balance))
        .route("/transfer", post(ledger::transfer))
        .route("/transactions", get(ledger::list_transactions))
        .route(
            "/accounts/{public_key}/transactions",
            get(ledger::account_transactions),
        );

    let admin_routes = Router::new()
        .route("/assets", post(admin::issue_supply))
        .route("/balance/{public_key}", get(admin::admin_balance))
        .route("/reconciliation", get(admin::list_reconciliation))
        .route(
            "/reconciliation/{reference}/retry",
            post(admin::retry_reconciliation),
        );

    let api_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/payments", payment_routes)
        .nest("/ledger", ledger_routes)
        .nest("/admin", admin_routes);

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        users::signup,
        users::login,
        users::profile,
        users::send_reset_password_email,
        users::reset_password,
        payments::gateway_config,
        payments::create_intent,
        payments::verify_payment,
        payments::mint_tokens,
        payments::callback,
        ledger::check_balance,
        ledger::transfer,
        ledger::list_transactions,
        ledger::account_transactions,
        admin::issue_supply,
        admin::admin_balance,
        admin::list_reconciliation,
        admin::retry_reconciliation,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            users::SignupRequest,
            users::SignupResponse,
            users::LoginRequest,
            users::LoginResponse,
            users::ProfileResponse,
            users::ResetRequest,
            users::ResetPasswordRequest,
            users::MessageResponse,
            payments::CreateIntentRequest,
            payments::CreateIntentResponse,
            payments::GatewayConfigResponse,
            payments::VerifyRequest,
            payments::MintRequest,
            payments::OutcomeResponse,
            ledger::BalanceResponse,
            ledger::TransferRequest,
            ledger::TransferResponse,
            ledger::TransactionListResponse,
            admin::IssueSupplyRequest,
            admin::IssueSupplyResponse,
            admin::AdminBalance,
            admin::AdminBalanceResponse,
            admin::ReconciliationListResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            crate::ledger::horizon::BalanceLine,
            crate::storage::StoredTransaction,
            crate::storage::ReconciliationRecord,
            crate::storage::ReconcileState
        )
    ),
    tags(
        (name = "Users", description = "Accounts, sessions and password reset"),
        (name = "Payments", description = "Checkout intents and mint reconciliation"),
        (name = "Ledger", description = "Balances, transfers and history"),
        (name = "Admin", description = "Issuance and reconciliation tooling"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::for_tests());
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }
}
