// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Entity repositories over the JSON-file storage.

pub mod reconciliation;
pub mod transactions;
pub mod users;

pub use reconciliation::{ReconcileState, ReconciliationRecord, ReconciliationRepository};
pub use transactions::{StoredTransaction, TransactionRepository};
pub use users::{StoredUser, UserRepository};
