// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Audit logging for security-sensitive operations.
//!
//! Signups, payment verification, mints and admin actions are appended to
//! a daily JSONL log so operators can reconstruct what happened to any
//! payment reference or account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Storage, StorageResult};

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Account events
    UserSignedUp,
    LoginSucceeded,
    LoginFailed,
    PasswordReset,

    // Payment events
    PaymentIntentCreated,
    PaymentVerified,
    PaymentRejected,

    // Mint events
    TokensMinted,
    MintFailed,
    MintRetried,

    // Ledger events
    TransferSubmitted,

    // Admin events
    AssetIssued,
    AdminAccess,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// User who triggered the event (if known).
    pub user_id: Option<String>,
    /// Resource affected (payment reference, tx hash, account).
    pub resource_id: Option<String>,
    /// Resource type (reference, transaction, account).
    pub resource_type: Option<String>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if the operation failed.
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user_id: None,
            resource_id: None,
            resource_type: None,
            success: true,
            error: None,
        }
    }

    /// Set the user ID.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the resource.
    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Mark as failed with an error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    storage: &'a Storage,
}

impl<'a> AuditRepository<'a> {
    /// Create a new audit repository.
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Log an audit event.
    ///
    /// Events are appended to a daily log file in JSONL format.
    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let path = self.storage.paths().audit_events_file(&date);
        let line = serde_json::to_string(event)?;
        self.storage.append_line(&path, &line)
    }

    /// Read audit events for a specific date.
    pub fn read_events(&self, date: &str) -> StorageResult<Vec<AuditEvent>> {
        let path = self.storage.paths().audit_events_file(date);
        let lines = self.storage.read_lines(&path)?;

        let mut events = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }

        Ok(events)
    }
}

/// Helper macro for logging audit events.
///
/// Logging failures are swallowed: an audit write must never fail the
/// operation it describes.
#[macro_export]
macro_rules! audit_log {
    ($storage:expr, $event:expr) => {{
        let repo = $crate::storage::AuditRepository::new($storage);
        if let Err(error) = repo.log(&$event) {
            tracing::warn!(error = %error, "failed to write audit event");
        }
    }};
}
