// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Path constants and utilities for the storage layout.

use std::path::{Path, PathBuf};

/// Default base directory for persistent storage.
pub const DATA_ROOT: &str = "/data";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all persistent data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== User Paths ==========

    /// Directory containing all user records.
    pub fn users_dir(&self) -> PathBuf {
        self.root.join("users")
    }

    /// Path to a specific user record.
    pub fn user(&self, user_id: &str) -> PathBuf {
        self.users_dir().join(format!("{user_id}.json"))
    }

    // ========== Transaction Paths ==========

    /// Directory containing local transaction history.
    pub fn transactions_dir(&self) -> PathBuf {
        self.root.join("transactions")
    }

    /// Path to a specific transaction record.
    pub fn transaction(&self, tx_hash: &str) -> PathBuf {
        self.transactions_dir().join(format!("{tx_hash}.json"))
    }

    // ========== Reconciliation Paths ==========

    /// Directory containing payment-reference reconciliation records.
    pub fn reconciliation_dir(&self) -> PathBuf {
        self.root.join("reconciliation")
    }

    /// Path to the record for a specific payment reference.
    pub fn reconciliation(&self, reference: &str) -> PathBuf {
        self.reconciliation_dir().join(format!("{reference}.json"))
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific date's audit logs.
    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Path to a daily audit events file (JSONL format).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}
