// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Ledger gateway: connectivity to the network's public HTTP endpoint.
//!
//! Wraps account loading, signed-transaction submission, and transaction
//! listing. Rejections carry the raw result codes the ledger returned so
//! callers and operators can diagnose them; nothing here retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::tx::SignedEnvelope;

/// Request timeout for every ledger HTTP call. A hung endpoint must not
/// suspend the handling request indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// One entry of an account's balance list.
///
/// Native balances carry no code/issuer; credit balances carry both, and
/// the pair is what trust-line checks match on.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceLine {
    /// `native`, `credit_alphanum4` or `credit_alphanum12`.
    pub asset_type: String,
    /// Asset code for credit balances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_code: Option<String>,
    /// Issuing account for credit balances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_issuer: Option<String>,
    /// Decimal-string balance.
    pub balance: String,
}

/// Account state as loaded from the ledger.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRecord {
    /// The account's public key.
    #[serde(rename = "account_id")]
    pub account_id: String,
    /// Current sequence number (serialized as a string on the wire).
    #[serde(with = "sequence_string")]
    pub sequence: i64,
    /// Current trust-line/balance list.
    pub balances: Vec<BalanceLine>,
}

mod sequence_string {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<i64>().map_err(serde::de::Error::custom)
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResult {
    /// Ledger transaction hash.
    pub hash: String,
    /// Ledger the transaction was included in.
    #[serde(default)]
    pub ledger: Option<u64>,
}

/// Result codes attached to a ledger rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultCodes {
    /// Transaction-level code (e.g. `tx_bad_seq`, `tx_failed`).
    #[serde(default)]
    pub transaction: Option<String>,
    /// Per-operation codes (e.g. `op_no_trust`, `op_underfunded`).
    #[serde(default)]
    pub operations: Vec<String>,
}

impl std::fmt::Display for ResultCodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tx = self.transaction.as_deref().unwrap_or("unknown");
        if self.operations.is_empty() {
            write!(f, "{tx}")
        } else {
            write!(f, "{tx} [{}]", self.operations.join(", "))
        }
    }
}

/// Errors raised by ledger gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum HorizonError {
    #[error("account {0} not found on the ledger")]
    NotFound(String),

    #[error("ledger rejected transaction: {result_codes}")]
    Rejected { result_codes: ResultCodes },

    #[error("ledger request failed: {0}")]
    Request(String),

    #[error("ledger response was invalid: {0}")]
    InvalidResponse(String),
}

/// Gateway contract for account loading and transaction submission.
///
/// Provisioning and minting are written against this trait so they can be
/// exercised without a live network.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Load current account state, including the balance list and sequence.
    async fn load_account(&self, public_key: &str) -> Result<AccountRecord, HorizonError>;

    /// Submit a signed envelope and return the ledger transaction hash.
    async fn submit(&self, envelope: &SignedEnvelope) -> Result<SubmitResult, HorizonError>;
}

/// HTTP client for the ledger's Horizon-style endpoint.
#[derive(Debug, Clone)]
pub struct HorizonClient {
    base_url: String,
    http: Client,
}

impl HorizonClient {
    pub fn new(base_url: &str) -> Result<Self, HorizonError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HorizonError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// The configured endpoint base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List recent on-ledger transactions for an account (newest first).
    pub async fn account_transactions(
        &self,
        public_key: &str,
        limit: u8,
    ) -> Result<Vec<Value>, HorizonError> {
        let url = format!(
            "{}/accounts/{public_key}/transactions?order=desc&limit={limit}",
            self.base_url
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| HorizonError::Request(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(HorizonError::NotFound(public_key.to_string()));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(HorizonError::Request(format!(
                "transaction listing returned {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| HorizonError::InvalidResponse(e.to_string()))?;

        body.pointer("/_embedded/records")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| {
                HorizonError::InvalidResponse("missing _embedded.records".to_string())
            })
    }

    /// Whether the endpoint root answers; used by the health check.
    pub async fn ping(&self) -> bool {
        match self.http.get(&self.base_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl LedgerGateway for HorizonClient {
    async fn load_account(&self, public_key: &str) -> Result<AccountRecord, HorizonError> {
        let url = format!("{}/accounts/{public_key}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| HorizonError::Request(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(HorizonError::NotFound(public_key.to_string()));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(HorizonError::Request(format!(
                "account load returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| HorizonError::InvalidResponse(e.to_string()))
    }

    async fn submit(&self, envelope: &SignedEnvelope) -> Result<SubmitResult, HorizonError> {
        let url = format!("{}/transactions", self.base_url);
        let response = self
            .http
            .post(&url)
            .form(&[("tx", envelope.envelope_xdr.as_str())])
            .send()
            .await
            .map_err(|e| HorizonError::Request(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| HorizonError::InvalidResponse(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_value(body)
                .map_err(|e| HorizonError::InvalidResponse(e.to_string()));
        }

        // Rejections arrive as a problem document with result codes under
        // extras; anything without them is a transport-level failure.
        match parse_result_codes(&body) {
            Some(result_codes) => Err(HorizonError::Rejected { result_codes }),
            None => Err(HorizonError::Request(format!(
                "submission returned {status}: {body}"
            ))),
        }
    }
}

fn parse_result_codes(body: &Value) -> Option<ResultCodes> {
    let codes = body.pointer("/extras/result_codes")?;
    serde_json::from_value(codes.clone()).ok()
}
