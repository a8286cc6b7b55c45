// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Mint executor: funded token transfers from the distribution account.
//!
//! A mint moves `amount` of the custom asset from the distribution account
//! to a recipient the service custodies keys for. Both trust lines are
//! provisioned lazily (distribution on first mint, recipient before its
//! first receipt), the distribution account is reloaded after any
//! trust-line submission so the payment is built against a fresh sequence
//! number, and failures propagate with the ledger's result codes. Nothing
//! here retries.
//!
//! Submissions that consume a given account's sequence number are
//! serialized through a per-account lock registry; two mints for the same
//! recipient (or any two mints, via the distribution lock) cannot race
//! each other's sequence numbers inside this process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::storage::StoredUser;

use super::horizon::{HorizonError, LedgerGateway};
use super::keys::{KeyError, Keypair, RecipientSigner};
use super::trust::{ensure_trustline, TrustError};
use super::tx::{IssuedAsset, TransactionBuilder, TxError};

/// Errors raised by a mint attempt.
#[derive(Debug, thiserror::Error)]
pub enum MintError {
    #[error("recipient account {0} does not exist on the ledger")]
    RecipientNotFound(String),

    #[error("user {0} not found")]
    UserNotFound(String),

    #[error(transparent)]
    Ledger(HorizonError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Build(#[from] TxError),
}

impl From<HorizonError> for MintError {
    fn from(e: HorizonError) -> Self {
        match e {
            HorizonError::NotFound(account) => MintError::RecipientNotFound(account),
            other => MintError::Ledger(other),
        }
    }
}

impl From<TrustError> for MintError {
    fn from(e: TrustError) -> Self {
        match e {
            TrustError::Ledger(inner) => MintError::Ledger(inner),
            TrustError::Build(inner) => MintError::Build(inner),
        }
    }
}

/// Result of a successful mint.
#[derive(Debug, Clone)]
pub struct MintReceipt {
    /// Ledger transaction hash of the payment.
    pub tx_hash: String,
    /// Distribution account public key.
    pub from: String,
    /// Recipient account public key.
    pub to: String,
    /// Minted amount (decimal string, as transmitted).
    pub amount: String,
    /// Asset code of the minted token.
    pub asset_code: String,
}

/// Executes funded mints against the ledger.
pub struct MintExecutor {
    ledger: Arc<dyn LedgerGateway>,
    recipient_signer: Arc<dyn RecipientSigner>,
    distribution: Keypair,
    asset: IssuedAsset,
    network_passphrase: String,
    locks: AccountLocks,
}

impl MintExecutor {
    pub fn new(
        ledger: Arc<dyn LedgerGateway>,
        recipient_signer: Arc<dyn RecipientSigner>,
        distribution: Keypair,
        asset: IssuedAsset,
        network_passphrase: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            recipient_signer,
            distribution,
            asset,
            network_passphrase: network_passphrase.into(),
            locks: AccountLocks::default(),
        }
    }

    /// The asset this executor mints.
    pub fn asset(&self) -> &IssuedAsset {
        &self.asset
    }

    /// The distribution account public key.
    pub fn distribution_public_key(&self) -> &str {
        self.distribution.public_key()
    }

    /// Mint `amount` of the asset to `recipient`'s ledger account.
    pub async fn mint(&self, recipient: &StoredUser, amount: &str) -> Result<MintReceipt, MintError> {
        let recipient_key = self.recipient_signer.signer_for(recipient)?;
        let recipient_public = recipient_key.public_key().to_string();

        // Recipient lock first, distribution lock second, always in that
        // order; both are held across every sequence-consuming submission.
        let recipient_lock = self.locks.for_account(&recipient_public).await;
        let _recipient_guard = recipient_lock.lock().await;
        let distribution_lock = self
            .locks
            .for_account(self.distribution.public_key())
            .await;
        let _distribution_guard = distribution_lock.lock().await;

        let distribution_account = self
            .ledger
            .load_account(self.distribution.public_key())
            .await
            .map_err(MintError::Ledger)?;
        ensure_trustline(
            self.ledger.as_ref(),
            &distribution_account,
            &self.distribution,
            &self.asset,
            &self.network_passphrase,
        )
        .await?;

        let recipient_account = self.ledger.load_account(&recipient_public).await?;
        ensure_trustline(
            self.ledger.as_ref(),
            &recipient_account,
            &recipient_key,
            &self.asset,
            &self.network_passphrase,
        )
        .await?;

        // Fresh sequence state: the trust-line submission above may have
        // consumed the previously loaded sequence number.
        let distribution_account = self
            .ledger
            .load_account(self.distribution.public_key())
            .await
            .map_err(MintError::Ledger)?;

        let envelope = TransactionBuilder::new(
            &self.network_passphrase,
            &distribution_account.account_id,
            distribution_account.sequence,
        )
        .payment(&recipient_public, &self.asset, amount)?
        .build_and_sign(&[&self.distribution])?;

        let result = self
            .ledger
            .submit(&envelope)
            .await
            .map_err(MintError::Ledger)?;

        tracing::info!(
            recipient = %recipient_public,
            amount = %amount,
            tx_hash = %result.hash,
            "mint submitted"
        );

        Ok(MintReceipt {
            tx_hash: result.hash,
            from: self.distribution.public_key().to_string(),
            to: recipient_public,
            amount: amount.to_string(),
            asset_code: self.asset.code.clone(),
        })
    }
}

/// Registry of per-account async locks.
#[derive(Default)]
struct AccountLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    async fn for_account(&self, public_key: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().await;
        map.entry(public_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::horizon::{AccountRecord, BalanceLine};
    use crate::ledger::keys::CustodialKeyStore;
    use crate::ledger::testing::FakeLedger;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use stellar_xdr::curr as xdr;
    use stellar_xdr::curr::ReadXdr;

    const NETWORK: &str = "Test SDF Network ; September 2015";
    const ISSUER: &str = "GCPKVX7BGMOPV4AHGX62Z3QONXJ5F4L7YQ7DKK75CQB4EGRBIDOLLDN3";
    const DISTRIBUTION_SEED: &str = "SAYOBYD64Y3NN6B7DDBBG6GXIAS56QVD4FYKQWDLKCTEJQMGKPXJVPNA";

    fn credit_line(code: &str, issuer: &str) -> BalanceLine {
        BalanceLine {
            asset_type: "credit_alphanum4".to_string(),
            asset_code: Some(code.to_string()),
            asset_issuer: Some(issuer.to_string()),
            balance: "100000.0000000".to_string(),
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

    fn account(public_key: &str, balances: Vec<BalanceLine>) -> AccountRecord {
        AccountRecord {
            account_id: public_key.to_string(),
            sequence: 10,
            balances,
        }
    }

    fn recipient_user(pair: &Keypair) -> StoredUser {
        let mut user = StoredUser::sample_for_tests();
        user.ledger_public_key = pair.public_key().to_string();
        user.ledger_secret_seed = pair.secret_seed();
        user
    }

    fn executor(ledger: Arc<FakeLedger>) -> MintExecutor {
        MintExecutor::new(
            ledger,
            Arc::new(CustodialKeyStore),
            Keypair::from_secret(DISTRIBUTION_SEED).unwrap(),
            IssuedAsset::new("FUC", ISSUER),
            NETWORK,
        )
    }

    fn decode_tx(envelope_xdr: &str) -> xdr::Transaction {
        let raw = BASE64.decode(envelope_xdr).unwrap();
        match xdr::TransactionEnvelope::from_xdr(raw, xdr::Limits::none()).unwrap() {
            xdr::TransactionEnvelope::Tx(inner) => inner.tx,
            other => panic!("unexpected envelope variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn mint_provisions_recipient_then_pays() {
        let ledger = Arc::new(FakeLedger::default());
        let distribution = Keypair::from_secret(DISTRIBUTION_SEED).unwrap();
        let recipient = Keypair::random();

        ledger.put_account(account(
            distribution.public_key(),
            vec![native_line(), credit_line("FUC", ISSUER)],
        ));
        ledger.put_account(account(recipient.public_key(), vec![native_line()]));

        let receipt = executor(ledger.clone())
            .mint(&recipient_user(&recipient), "500")
            .await
            .unwrap();

        // Trust establishment for the recipient, then the payment.
        let submissions = ledger.submissions();
        assert_eq!(submissions.len(), 2);

        let trust_tx = decode_tx(&submissions[0].envelope_xdr);
        assert!(matches!(
            trust_tx.operations[0].body,
            xdr::OperationBody::ChangeTrust(_)
        ));

        let payment_tx = decode_tx(&submissions[1].envelope_xdr);
        match &payment_tx.operations[0].body {
            xdr::OperationBody::Payment(op) => assert_eq!(op.amount, 5_000_000_000),
            other => panic!("unexpected operation: {other:?}"),
        }

        assert_eq!(receipt.amount, "500");
        assert_eq!(receipt.asset_code, "FUC");
        assert_eq!(receipt.to, recipient.public_key());
        assert_eq!(receipt.from, distribution.public_key());
    }

    #[tokio::test]
    async fn mint_provisions_distribution_lazily() {
        let ledger = Arc::new(FakeLedger::default());
        let distribution = Keypair::from_secret(DISTRIBUTION_SEED).unwrap();
        let recipient = Keypair::random();

        // Neither account trusts the asset yet.
        ledger.put_account(account(distribution.public_key(), vec![native_line()]));
        ledger.put_account(account(recipient.public_key(), vec![native_line()]));

        executor(ledger.clone())
            .mint(&recipient_user(&recipient), "5")
            .await
            .unwrap();

        // Distribution trust line, recipient trust line, payment.
        assert_eq!(ledger.submissions().len(), 3);
    }

    #[tokio::test]
    async fn mint_skips_provisioning_when_both_trust() {
        let ledger = Arc::new(FakeLedger::default());
        let distribution = Keypair::from_secret(DISTRIBUTION_SEED).unwrap();
        let recipient = Keypair::random();

        ledger.put_account(account(
            distribution.public_key(),
            vec![credit_line("FUC", ISSUER)],
        ));
        ledger.put_account(account(
            recipient.public_key(),
            vec![credit_line("FUC", ISSUER)],
        ));

        executor(ledger.clone())
            .mint(&recipient_user(&recipient), "1.5")
            .await
            .unwrap();

        assert_eq!(ledger.submissions().len(), 1);
    }

    #[tokio::test]
    async fn missing_recipient_account_is_not_found() {
        let ledger = Arc::new(FakeLedger::default());
        let distribution = Keypair::from_secret(DISTRIBUTION_SEED).unwrap();
        let recipient = Keypair::random();

        ledger.put_account(account(
            distribution.public_key(),
            vec![credit_line("FUC", ISSUER)],
        ));

        let result = executor(ledger.clone())
            .mint(&recipient_user(&recipient), "5")
            .await;

        assert!(matches!(result, Err(MintError::RecipientNotFound(_))));
        assert_eq!(ledger.submissions().len(), 0);
    }

    #[tokio::test]
    async fn payment_rejection_propagates_result_codes() {
        let ledger = Arc::new(FakeLedger::default());
        let distribution = Keypair::from_secret(DISTRIBUTION_SEED).unwrap();
        let recipient = Keypair::random();

        ledger.put_account(account(
            distribution.public_key(),
            vec![credit_line("FUC", ISSUER)],
        ));
        ledger.put_account(account(
            recipient.public_key(),
            vec![credit_line("FUC", ISSUER)],
        ));
        ledger.reject_next("op_underfunded");

        let result = executor(ledger.clone())
            .mint(&recipient_user(&recipient), "5")
            .await;

        match result {
            Err(MintError::Ledger(HorizonError::Rejected { result_codes })) => {
                assert_eq!(result_codes.operations, vec!["op_underfunded".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        // The rejected payment was not retried.
        assert_eq!(ledger.submissions().len(), 0);
    }
}
