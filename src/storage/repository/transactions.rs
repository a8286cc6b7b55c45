// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Local transaction history.
//!
//! One record per successful on-ledger transfer, written only after the
//! ledger accepted the transaction. Records are append-only: the core
//! never mutates or deletes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{Storage, StorageError, StorageResult};

/// Stored transaction record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredTransaction {
    /// Ledger transaction hash.
    pub tx_hash: String,
    /// Sender account public key.
    pub from: String,
    /// Recipient account public key.
    pub to: String,
    /// Amount transferred (decimal string).
    pub amount: String,
    /// Asset code.
    pub asset_code: String,
    /// User this record belongs to.
    pub user_id: String,
    /// When the transaction was recorded.
    pub created_at: DateTime<Utc>,
}

impl StoredTransaction {
    /// Create a record for a just-accepted ledger transaction.
    pub fn new(
        tx_hash: String,
        from: String,
        to: String,
        amount: String,
        asset_code: String,
        user_id: String,
    ) -> Self {
        Self {
            tx_hash,
            from,
            to,
            amount,
            asset_code,
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// Repository for transaction records.
pub struct TransactionRepository<'a> {
    storage: &'a Storage,
}

impl<'a> TransactionRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Store a new transaction record.
    pub fn create(&self, tx: &StoredTransaction) -> StorageResult<()> {
        let path = self.storage.paths().transaction(&tx.tx_hash);
        if self.storage.exists(&path) {
            return Err(StorageError::AlreadyExists(format!(
                "Transaction {}",
                tx.tx_hash
            )));
        }
        self.storage.write_json(path, tx)
    }

    /// Get a transaction by hash.
    pub fn get(&self, tx_hash: &str) -> StorageResult<StoredTransaction> {
        let path = self.storage.paths().transaction(tx_hash);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Transaction {tx_hash}")));
        }
        self.storage.read_json(path)
    }

    /// List all transactions belonging to a user, newest first.
    pub fn list_by_user(&self, user_id: &str) -> StorageResult<Vec<StoredTransaction>> {
        let hashes = self
            .storage
            .list_files(self.storage.paths().transactions_dir(), "json")?;

        let mut transactions = Vec::new();
        for hash in hashes {
            match self.get(&hash) {
                Ok(tx) if tx.user_id == user_id => transactions.push(tx),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Failed to read transaction {}: {}", hash, e);
                }
            }
        }

        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }
}
