// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Ledger integration module.
//!
//! This module provides functionality for:
//! - Loading account state and submitting signed transactions via the
//!   network's public Horizon-style HTTP endpoint
//! - Building and signing transaction envelopes (payments, trust lines,
//!   account creation)
//! - Idempotent trust-line provisioning for the custom asset
//! - Executing funded mints from the distribution account

pub mod horizon;
pub mod keys;
pub mod mint;
#[cfg(test)]
pub mod testing;
pub mod trust;
pub mod tx;

pub use horizon::{AccountRecord, HorizonClient, HorizonError, LedgerGateway, SubmitResult};
pub use keys::{CustodialKeyStore, KeyError, Keypair, RecipientSigner};
pub use mint::{MintError, MintExecutor, MintReceipt};
pub use trust::{ensure_trustline, has_trustline, TrustlineStatus};
pub use tx::{format_amount, parse_amount, IssuedAsset, TransactionBuilder};
