// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Payment-reference reconciliation records.
//!
//! One record per payment reference, persisted the moment the reference is
//! claimed so deduplication survives process restarts. `claim` relies on
//! the filesystem's create-exclusive semantics: the first writer wins and
//! every later claim observes `AlreadyExists`.
//!
//! State machine per reference:
//!
//! ```text
//! (unseen) -> Verifying -> Minted       terminal
//!                       -> MintFailed   terminal, operator replay only
//! (unseen) -> Rejected                  payment did not complete
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{Storage, StorageError, StorageResult};

/// Processing state of a payment reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileState {
    /// Claimed: payment verified, mint in flight.
    Verifying,
    /// Mint landed on the ledger.
    Minted,
    /// Gateway reported the payment did not complete.
    Rejected,
    /// Payment confirmed but the mint failed; needs operator attention.
    MintFailed,
}

/// Persisted reconciliation record for one payment reference.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconciliationRecord {
    /// The gateway's payment reference.
    pub reference: String,
    /// Current state.
    pub state: ReconcileState,
    /// Recipient user, once resolved from gateway metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Token amount, once resolved (decimal string).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    /// Ledger transaction hash of the mint, when minted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Failure detail for Rejected/MintFailed states.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// When the reference was first seen.
    pub created_at: DateTime<Utc>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
}

impl ReconciliationRecord {
    /// A freshly claimed reference with resolved identity and amount.
    pub fn new_claimed(reference: String, user_id: String, amount: String) -> Self {
        let now = Utc::now();
        Self {
            reference,
            state: ReconcileState::Verifying,
            user_id: Some(user_id),
            amount: Some(amount),
            tx_hash: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A rejected reference (payment did not complete).
    pub fn new_rejected(reference: String, reason: String) -> Self {
        let now = Utc::now();
        Self {
            reference,
            state: ReconcileState::Rejected,
            user_id: None,
            amount: None,
            tx_hash: None,
            failure_reason: Some(reason),
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to Minted.
    pub fn mark_minted(&mut self, tx_hash: String) {
        self.state = ReconcileState::Minted;
        self.tx_hash = Some(tx_hash);
        self.failure_reason = None;
        self.updated_at = Utc::now();
    }

    /// Transition to MintFailed.
    pub fn mark_mint_failed(&mut self, reason: String) {
        self.state = ReconcileState::MintFailed;
        self.failure_reason = Some(reason);
        self.updated_at = Utc::now();
    }
}

/// Repository for reconciliation records.
pub struct ReconciliationRepository<'a> {
    storage: &'a Storage,
}

impl<'a> ReconciliationRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Check if a reference has a record.
    pub fn exists(&self, reference: &str) -> bool {
        self.storage
            .exists(self.storage.paths().reconciliation(reference))
    }

    /// Get the record for a reference.
    pub fn get(&self, reference: &str) -> StorageResult<ReconciliationRecord> {
        let path = self.storage.paths().reconciliation(reference);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Reference {reference}")));
        }
        self.storage.read_json(path)
    }

    /// Claim a reference: persist its first record.
    ///
    /// Fails with `AlreadyExists` if any record for the reference exists;
    /// the caller treats that as "already processed".
    pub fn claim(&self, record: &ReconciliationRecord) -> StorageResult<()> {
        if self.exists(&record.reference) {
            return Err(StorageError::AlreadyExists(format!(
                "Reference {}",
                record.reference
            )));
        }
        self.storage
            .write_json(self.storage.paths().reconciliation(&record.reference), record)
    }

    /// Update an existing record.
    pub fn update(&self, record: &ReconciliationRecord) -> StorageResult<()> {
        if !self.exists(&record.reference) {
            return Err(StorageError::NotFound(format!(
                "Reference {}",
                record.reference
            )));
        }
        self.storage
            .write_json(self.storage.paths().reconciliation(&record.reference), record)
    }

    /// Record (or refresh) a rejection. Rejections are not claims: a later
    /// callback may re-verify the same reference.
    pub fn record_rejection(&self, record: &ReconciliationRecord) -> StorageResult<()> {
        self.storage
            .write_json(self.storage.paths().reconciliation(&record.reference), record)
    }

    /// List all records, optionally filtered by state, newest first.
    pub fn list(&self, state: Option<ReconcileState>) -> StorageResult<Vec<ReconciliationRecord>> {
        let references = self
            .storage
            .list_files(self.storage.paths().reconciliation_dir(), "json")?;

        let mut records = Vec::new();
        for reference in references {
            if let Ok(record) = self.get(&reference) {
                if state.is_none() || state == Some(record.state) {
                    records.push(record);
                }
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
