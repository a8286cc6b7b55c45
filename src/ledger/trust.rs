// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Idempotent trust-line provisioning.
//!
//! An account cannot receive a non-native asset until it has explicitly
//! opted in with a trust line for that exact (code, issuer) pair; this is
//! enforced by the ledger itself. Provisioning is read-before-write: the
//! loaded balance list decides whether a change-trust transaction is
//! submitted at all. Re-invocation on an account that already trusts the
//! asset submits nothing.

use super::horizon::{AccountRecord, HorizonError, LedgerGateway};
use super::keys::Keypair;
use super::tx::{IssuedAsset, TransactionBuilder, TxError};

/// Outcome of a provisioning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustlineStatus {
    /// The trust line already existed; no transaction was submitted.
    AlreadyTrusted,
    /// A change-trust transaction was submitted; carries the ledger hash.
    Established { tx_hash: String },
}

/// Errors raised during provisioning.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    #[error(transparent)]
    Ledger(#[from] HorizonError),

    #[error(transparent)]
    Build(#[from] TxError),
}

/// Whether `account`'s balance list already carries a trust line for `asset`.
pub fn has_trustline(account: &AccountRecord, asset: &IssuedAsset) -> bool {
    account.balances.iter().any(|line| {
        line.asset_code.as_deref() == Some(asset.code.as_str())
            && line.asset_issuer.as_deref() == Some(asset.issuer.as_str())
    })
}

/// Ensure `account` trusts `asset`, submitting a change-trust transaction
/// only if the trust line is absent.
///
/// A trust line is a unilateral declaration by the account owner, so the
/// transaction is signed with the account's own key. The caller supplies
/// freshly loaded account state; the sequence number in it is consumed if
/// a transaction is submitted.
pub async fn ensure_trustline(
    ledger: &dyn LedgerGateway,
    account: &AccountRecord,
    signing_key: &Keypair,
    asset: &IssuedAsset,
    network_passphrase: &str,
) -> Result<TrustlineStatus, TrustError> {
    if has_trustline(account, asset) {
        return Ok(TrustlineStatus::AlreadyTrusted);
    }

    let envelope = TransactionBuilder::new(network_passphrase, &account.account_id, account.sequence)
        .change_trust(asset)?
        .build_and_sign(&[signing_key])?;

    let result = ledger.submit(&envelope).await?;
    Ok(TrustlineStatus::Established {
        tx_hash: result.hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::horizon::BalanceLine;
    use crate::ledger::testing::FakeLedger;

    const ISSUER: &str = "GCPKVX7BGMOPV4AHGX62Z3QONXJ5F4L7YQ7DKK75CQB4EGRBIDOLLDN3";
    const OTHER_ISSUER: &str = "GCMWECXOBV2O3ZAHNWITKYDA5S2DEVWOMNPTW6JZK7QUSAUEGRHBKADO";
    const NETWORK: &str = "Test SDF Network ; September 2015";

    fn fuc() -> IssuedAsset {
        IssuedAsset::new("FUC", ISSUER)
    }

    fn account_with(balances: Vec<BalanceLine>) -> AccountRecord {
        AccountRecord {
            account_id: "GDCE6SEGKVWI6QGL2MPY5REZAD6BCWGBJY2LKV56Q2WA34QDJYDEUXTQ".to_string(),
            sequence: 42,
            balances,
        }
    }

    fn credit_line(code: &str, issuer: &str) -> BalanceLine {
        BalanceLine {
            asset_type: "credit_alphanum4".to_string(),
            asset_code: Some(code.to_string()),
            asset_issuer: Some(issuer.to_string()),
            balance: "0.0000000".to_string(),
        }
    }

    fn native_line() -> BalanceLine {
        BalanceLine {
            asset_type: "native".to_string(),
            asset_code: None,
            asset_issuer: None,
            balance: "20.0000000".to_string(),
        }
    }

    #[test]
    fn trustline_check_matches_code_and_issuer() {
        let account = account_with(vec![native_line(), credit_line("FUC", ISSUER)]);
        assert!(has_trustline(&account, &fuc()));

        // Same code from a different issuer is a different asset.
        let account = account_with(vec![credit_line("FUC", OTHER_ISSUER)]);
        assert!(!has_trustline(&account, &fuc()));

        let account = account_with(vec![native_line()]);
        assert!(!has_trustline(&account, &fuc()));
    }

    #[tokio::test]
    async fn existing_trustline_submits_nothing() {
        let ledger = FakeLedger::default();
        let signer = Keypair::random();
        let account = account_with(vec![credit_line("FUC", ISSUER)]);

        let status = ensure_trustline(&ledger, &account, &signer, &fuc(), NETWORK)
            .await
            .unwrap();

        assert_eq!(status, TrustlineStatus::AlreadyTrusted);
        assert_eq!(ledger.submissions().len(), 0);
    }

    #[tokio::test]
    async fn missing_trustline_submits_exactly_one_transaction() {
        let ledger = FakeLedger::default();
        let signer = Keypair::random();
        let account = account_with(vec![native_line()]);

        let status = ensure_trustline(&ledger, &account, &signer, &fuc(), NETWORK)
            .await
            .unwrap();

        assert!(matches!(status, TrustlineStatus::Established { .. }));
        assert_eq!(ledger.submissions().len(), 1);
    }

    #[tokio::test]
    async fn submission_failure_propagates() {
        let ledger = FakeLedger::default();
        ledger.reject_next("op_low_reserve");
        let signer = Keypair::random();
        let account = account_with(vec![native_line()]);

        let result = ensure_trustline(&ledger, &account, &signer, &fuc(), NETWORK).await;
        assert!(matches!(
            result,
            Err(TrustError::Ledger(HorizonError::Rejected { .. }))
        ));
    }
}
