// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! # Persistent Storage Module
//!
//! JSON-file storage rooted at `DATA_DIR`. One file per entity, grouped by
//! kind, plus an append-only daily audit log.
//!
//! ## Storage Layout
//!
//! ```text
//! /data/
//!   users/
//!     {user_id}.json            # User record (credentials + custodial keypair)
//!   transactions/
//!     {tx_hash}.json            # Local transaction history (append-only)
//!   reconciliation/
//!     {reference}.json          # Payment-reference saga records
//!   audit/
//!     {date}/events.jsonl       # Daily audit logs
//! ```
//!
//! Records are written whole; there is no partial update. Repositories
//! enforce `AlreadyExists`/`NotFound` on create/update so callers get
//! first-writer-wins semantics on the filesystem.

pub mod audit;
pub mod fs;
pub mod paths;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use fs::{Storage, StorageError, StorageResult};
pub use paths::StoragePaths;
pub use repository::{
    ReconcileState, ReconciliationRecord, ReconciliationRepository, StoredTransaction,
    StoredUser, TransactionRepository, UserRepository,
};
