// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Paystack integration for fiat top-ups.
//!
//! Two calls matter: `transaction/initialize` creates a checkout intent
//! with the internal user ID embedded in the metadata (it must survive the
//! round trip through the gateway so the callback can resolve the
//! recipient), and `transaction/verify/{reference}` confirms what the
//! gateway thinks happened. The gateway's verdict is taken as gospel:
//! amount and identity are read from the verification response, never
//! recomputed locally. A non-success status is a normal outcome, distinct
//! from a transport or malformed-response error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const DEFAULT_API_BASE_URL: &str = "https://api.paystack.co";

/// Request timeout for every gateway call. A hung gateway must not suspend
/// the handling request indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors raised by gateway calls.
#[derive(Debug, thiserror::Error)]
pub enum PaystackError {
    #[error("Paystack request failed: {0}")]
    Request(String),

    #[error("Paystack response was invalid: {0}")]
    InvalidResponse(String),
}

/// A created checkout intent.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    /// Hosted checkout URL the payer is redirected to.
    pub authorization_url: String,
    /// Access code for inline checkout UIs.
    pub access_code: String,
    /// The gateway's payment reference for this attempt.
    pub reference: String,
}

/// Outcome of verifying a payment reference with the gateway.
#[derive(Debug, Clone)]
pub struct PaymentVerification {
    /// Whether the gateway reports the payment completed.
    pub completed: bool,
    /// Token amount (decimal string), converted from minor units.
    pub amount: Option<String>,
    /// Internal user ID recovered from the intent metadata.
    pub user_id: Option<String>,
    /// The gateway's human-readable response line.
    pub gateway_response: String,
}

/// Verification contract the reconciliation controller is written against.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn verify(&self, reference: &str) -> Result<PaymentVerification, PaystackError>;
}

/// HTTP client for the Paystack API.
#[derive(Debug, Clone)]
pub struct PaystackClient {
    base_url: String,
    secret_key: String,
    callback_url: String,
    http: Client,
}

impl PaystackClient {
    pub fn new(secret_key: &str, callback_url: &str) -> Result<Self, PaystackError> {
        Self::with_base_url(secret_key, callback_url, DEFAULT_API_BASE_URL)
    }

    pub fn with_base_url(
        secret_key: &str,
        callback_url: &str,
        base_url: &str,
    ) -> Result<Self, PaystackError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PaystackError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            callback_url: callback_url.to_string(),
            http,
        })
    }

    /// Create a checkout intent for `amount_minor` minor units, payable by
    /// `email`, crediting the user identified by `user_id`.
    pub async fn initialize_transaction(
        &self,
        email: &str,
        amount_minor: u64,
        user_id: &str,
    ) -> Result<PaymentIntent, PaystackError> {
        let payload = json!({
            "amount": amount_minor,
            "email": email,
            "callback_url": self.callback_url,
            "metadata": {
                "userId": user_id,
                "custom_fields": [
                    {
                        "display_name": "User ID",
                        "variable_name": "user_id",
                        "value": user_id,
                    }
                ]
            }
        });

        let response = self
            .http
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PaystackError::Request(format!("initialize failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PaystackError::Request(format!(
                "initialize returned {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PaystackError::InvalidResponse(format!("initialize: {e}")))?;

        if !body.get("status").and_then(Value::as_bool).unwrap_or(false) {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(PaystackError::Request(format!(
                "initialize rejected: {message}"
            )));
        }

        let data = body
            .get("data")
            .ok_or_else(|| PaystackError::InvalidResponse("initialize: missing data".into()))?;
        let field = |name: &str| {
            data.get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    PaystackError::InvalidResponse(format!("initialize: missing data.{name}"))
                })
        };

        Ok(PaymentIntent {
            authorization_url: field("authorization_url")?,
            access_code: field("access_code")?,
            reference: field("reference")?,
        })
    }
}

#[async_trait]
impl PaymentVerifier for PaystackClient {
    async fn verify(&self, reference: &str) -> Result<PaymentVerification, PaystackError> {
        let response = self
            .http
            .get(format!("{}/transaction/verify/{reference}", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| PaystackError::Request(format!("verify failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PaystackError::Request(format!(
                "verify returned {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PaystackError::InvalidResponse(format!("verify: {e}")))?;

        // Top-level `status: false` means the gateway could not answer for
        // this reference at all; that is an error, not a failed payment.
        if !body.get("status").and_then(Value::as_bool).unwrap_or(false) {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(PaystackError::InvalidResponse(format!(
                "verify rejected: {message}"
            )));
        }

        let data = body
            .get("data")
            .ok_or_else(|| PaystackError::InvalidResponse("verify: missing data".into()))?;

        Ok(parse_verification(data))
    }
}

fn parse_verification(data: &Value) -> PaymentVerification {
    let completed = data.get("status").and_then(Value::as_str) == Some("success");
    let gateway_response = data
        .get("gateway_response")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let amount = data
        .get("amount")
        .and_then(Value::as_u64)
        .map(minor_to_decimal);

    PaymentVerification {
        completed,
        amount,
        user_id: extract_user_id(data.get("metadata")),
        gateway_response,
    }
}

/// Recover the internal user ID from intent metadata: `metadata.userId`,
/// falling back to the `user_id` custom field.
fn extract_user_id(metadata: Option<&Value>) -> Option<String> {
    let metadata = metadata?;

    if let Some(direct) = metadata.get("userId") {
        match direct {
            Value::String(s) if !s.is_empty() => return Some(s.clone()),
            Value::Number(n) => return Some(n.to_string()),
            _ => {}
        }
    }

    metadata
        .get("custom_fields")
        .and_then(Value::as_array)?
        .iter()
        .find(|field| field.get("variable_name").and_then(Value::as_str) == Some("user_id"))
        .and_then(|field| field.get("value"))
        .and_then(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Convert gateway minor units into a decimal-string token amount.
fn minor_to_decimal(minor: u64) -> String {
    let whole = minor / 100;
    let fraction = minor % 100;
    if fraction == 0 {
        whole.to_string()
    } else {
        format!("{whole}.{fraction:02}")
            .trim_end_matches('0')
            .to_string()
    }
}
