// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Payment-to-mint reconciliation.
//!
//! This is the correctness-critical path: it ties an external payment
//! confirmation to an at-most-once ledger mint across two systems that
//! share no transaction boundary.
//!
//! Per payment reference the controller walks
//! `UNSEEN -> VERIFYING -> {MINTED | REJECTED | MINT_FAILED}`:
//!
//! 1. Dedup check. A reference that is claimed, minted or mint-failed is
//!    permanently inert and reports [`ReconcileOutcome::AlreadyProcessed`].
//! 2. Verify with the gateway. A non-success verdict is
//!    [`ReconcileOutcome::Rejected`]; rejected references stay
//!    re-verifiable since the gateway will keep answering the same way.
//! 3. Claim the reference BEFORE minting. The claim goes into an
//!    in-process set (under one lock, closing the concurrent-callback
//!    race) and a persisted record (so dedup survives restarts).
//! 4. Mint. A failure here is [`ReconcileOutcome::MintFailed`]: the claim
//!    is NOT rolled back, the payment is never re-verified or retried for
//!    this reference, and the persisted record carries the failure for
//!    operator replay via [`Reconciler::retry_mint`].

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::audit_log;
use crate::ledger::{MintError, MintExecutor, MintReceipt};
use crate::providers::{PaymentVerifier, PaystackError};
use crate::storage::{
    AuditEvent, AuditEventType, ReconcileState, ReconciliationRecord, ReconciliationRepository,
    Storage, StoredTransaction, TransactionRepository, UserRepository,
};

/// Minting contract the controller is written against.
#[async_trait]
pub trait TokenMinter: Send + Sync {
    /// Mint `amount` of the asset to the user identified by `user_id`.
    async fn mint(&self, user_id: &str, amount: &str) -> Result<MintReceipt, MintError>;
}

/// Token minter resolving the recipient from storage before executing.
pub struct MintService {
    storage: Arc<Storage>,
    executor: Arc<MintExecutor>,
}

impl MintService {
    pub fn new(storage: Arc<Storage>, executor: Arc<MintExecutor>) -> Self {
        Self { storage, executor }
    }
}

#[async_trait]
impl TokenMinter for MintService {
    async fn mint(&self, user_id: &str, amount: &str) -> Result<MintReceipt, MintError> {
        let user = UserRepository::new(&self.storage)
            .get(user_id)
            .map_err(|_| MintError::UserNotFound(user_id.to_string()))?;
        self.executor.mint(&user, amount).await
    }
}

/// Terminal outcome of processing a payment reference.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// Payment verified and tokens minted.
    Minted {
        amount: String,
        user_id: String,
        tx_hash: String,
    },
    /// The reference was already processed; nothing was done.
    AlreadyProcessed,
    /// The gateway reports the payment did not complete.
    Rejected { reason: String },
    /// Payment confirmed but the mint failed; operator attention required.
    MintFailed { reason: String },
}

/// Errors that abort processing before an outcome is reached.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Gateway(#[from] PaystackError),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// The reconciliation controller.
pub struct Reconciler {
    storage: Arc<Storage>,
    verifier: Arc<dyn PaymentVerifier>,
    minter: Arc<dyn TokenMinter>,
    /// In-process claim set; guards the window between two concurrent
    /// callbacks for the same reference passing verification.
    claimed: Mutex<HashSet<String>>,
}

impl Reconciler {
    pub fn new(
        storage: Arc<Storage>,
        verifier: Arc<dyn PaymentVerifier>,
        minter: Arc<dyn TokenMinter>,
    ) -> Self {
        Self {
            storage,
            verifier,
            minter,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    /// Process a payment reference end to end.
    pub async fn process(&self, reference: &str) -> Result<ReconcileOutcome, ReconcileError> {
        if self.is_processed(reference).await {
            info!(reference, "reference already processed");
            return Ok(ReconcileOutcome::AlreadyProcessed);
        }

        let verification = self.verifier.verify(reference).await?;

        if !verification.completed {
            let reason = if verification.gateway_response.is_empty() {
                "payment did not complete".to_string()
            } else {
                verification.gateway_response.clone()
            };
            self.record_rejection(reference, &reason);
            audit_log!(
                &self.storage,
                AuditEvent::new(AuditEventType::PaymentRejected)
                    .with_resource("reference", reference)
                    .failed(&reason)
            );
            return Ok(ReconcileOutcome::Rejected { reason });
        }

        let (Some(user_id), Some(amount)) =
            (verification.user_id.clone(), verification.amount.clone())
        else {
            // The intent metadata must carry the recipient; without it the
            // payment cannot be applied and is not claimed.
            let reason = "payment metadata is missing the user identity".to_string();
            warn!(reference, "verified payment without embedded user id");
            self.record_rejection(reference, &reason);
            return Ok(ReconcileOutcome::Rejected { reason });
        };

        // Claim before minting. Whoever loses this race observes the
        // reference as already processed and never reaches the mint call.
        if !self.claim(reference, &user_id, &amount).await? {
            info!(reference, "lost claim race; reference already processed");
            return Ok(ReconcileOutcome::AlreadyProcessed);
        }

        audit_log!(
            &self.storage,
            AuditEvent::new(AuditEventType::PaymentVerified)
                .with_user(&user_id)
                .with_resource("reference", reference)
        );

        Ok(self.execute_mint(reference, &user_id, &amount).await)
    }

    /// Operator replay for a reference stuck in MintFailed.
    pub async fn retry_mint(&self, reference: &str) -> Result<ReconcileOutcome, ReconcileError> {
        let repo = ReconciliationRepository::new(&self.storage);
        let record = repo
            .get(reference)
            .map_err(|e| ReconcileError::Storage(e.to_string()))?;

        if record.state != ReconcileState::MintFailed {
            return Err(ReconcileError::Storage(format!(
                "reference {reference} is not in mint_failed state"
            )));
        }
        let (Some(user_id), Some(amount)) = (record.user_id.clone(), record.amount.clone()) else {
            return Err(ReconcileError::Storage(format!(
                "reference {reference} record is missing identity or amount"
            )));
        };

        audit_log!(
            &self.storage,
            AuditEvent::new(AuditEventType::MintRetried)
                .with_user(&user_id)
                .with_resource("reference", reference)
        );

        Ok(self.execute_mint(reference, &user_id, &amount).await)
    }

    async fn execute_mint(&self, reference: &str, user_id: &str, amount: &str) -> ReconcileOutcome {
        match self.minter.mint(user_id, amount).await {
            Ok(receipt) => {
                self.finish(reference, |record| {
                    record.mark_minted(receipt.tx_hash.clone())
                });

                // The durable trace of the mint: the local transaction log.
                let tx = StoredTransaction::new(
                    receipt.tx_hash.clone(),
                    receipt.from.clone(),
                    receipt.to.clone(),
                    receipt.amount.clone(),
                    receipt.asset_code.clone(),
                    user_id.to_string(),
                );
                if let Err(e) = TransactionRepository::new(&self.storage).create(&tx) {
                    warn!(reference, error = %e, "failed to record mint transaction");
                }

                audit_log!(
                    &self.storage,
                    AuditEvent::new(AuditEventType::TokensMinted)
                        .with_user(user_id)
                        .with_resource("reference", reference)
                );

                ReconcileOutcome::Minted {
                    amount: amount.to_string(),
                    user_id: user_id.to_string(),
                    tx_hash: receipt.tx_hash,
                }
            }
            Err(e) => {
                // Payment confirmed, mint failed: the one state the system
                // cannot self-heal. The claim stays; operators replay it.
                let reason = e.to_string();
                error!(reference, user_id, amount, error = %reason, "mint failed after confirmed payment");
                self.finish(reference, |record| {
                    record.mark_mint_failed(reason.clone())
                });

                audit_log!(
                    &self.storage,
                    AuditEvent::new(AuditEventType::MintFailed)
                        .with_user(user_id)
                        .with_resource("reference", reference)
                        .failed(&reason)
                );

                ReconcileOutcome::MintFailed { reason }
            }
        }
    }

    /// Whether the reference is permanently inert.
    async fn is_processed(&self, reference: &str) -> bool {
        if self.claimed.lock().await.contains(reference) {
            return true;
        }

        match ReconciliationRepository::new(&self.storage).get(reference) {
            Ok(record) => matches!(
                record.state,
                ReconcileState::Verifying | ReconcileState::Minted | ReconcileState::MintFailed
            ),
            Err(_) => false,
        }
    }

    /// Atomically claim the reference. Returns false if it was already
    /// claimed by a concurrent caller or a previous run.
    async fn claim(
        &self,
        reference: &str,
        user_id: &str,
        amount: &str,
    ) -> Result<bool, ReconcileError> {
        let mut claimed = self.claimed.lock().await;
        if claimed.contains(reference) {
            return Ok(false);
        }

        let repo = ReconciliationRepository::new(&self.storage);
        let record = ReconciliationRecord::new_claimed(
            reference.to_string(),
            user_id.to_string(),
            amount.to_string(),
        );

        // A rejected record is not a claim; replace it. Anything else
        // already claimed the reference durably.
        match repo.get(reference) {
            Ok(existing) if existing.state != ReconcileState::Rejected => return Ok(false),
            Ok(_) => repo
                .update(&record)
                .map_err(|e| ReconcileError::Storage(e.to_string()))?,
            Err(_) => repo
                .claim(&record)
                .map_err(|e| ReconcileError::Storage(e.to_string()))?,
        }

        claimed.insert(reference.to_string());
        Ok(true)
    }

    fn record_rejection(&self, reference: &str, reason: &str) {
        let record =
            ReconciliationRecord::new_rejected(reference.to_string(), reason.to_string());
        if let Err(e) = ReconciliationRepository::new(&self.storage).record_rejection(&record) {
            warn!(reference, error = %e, "failed to persist rejection record");
        }
    }

    fn finish(&self, reference: &str, apply: impl FnOnce(&mut ReconciliationRecord)) {
        let repo = ReconciliationRepository::new(&self.storage);
        match repo.get(reference) {
            Ok(mut record) => {
                apply(&mut record);
                if let Err(e) = repo.update(&record) {
                    warn!(reference, error = %e, "failed to persist reconciliation state");
                }
            }
            Err(e) => warn!(reference, error = %e, "reconciliation record vanished"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::PaymentVerification;
    use crate::storage::StoragePaths;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    struct FakeVerifier {
        verification: PaymentVerification,
        calls: AtomicUsize,
    }

    impl FakeVerifier {
        fn success(user_id: &str, amount: &str) -> Self {
            Self {
                verification: PaymentVerification {
                    completed: true,
                    amount: Some(amount.to_string()),
                    user_id: Some(user_id.to_string()),
                    gateway_response: "Successful".to_string(),
                },
                calls: AtomicUsize::new(0),
            }
        }

        fn declined() -> Self {
            Self {
                verification: PaymentVerification {
                    completed: false,
                    amount: Some("500".to_string()),
                    user_id: Some("42".to_string()),
                    gateway_response: "Declined".to_string(),
                },
                calls: AtomicUsize::new(0),
            }
        }

        fn missing_identity() -> Self {
            Self {
                verification: PaymentVerification {
                    completed: true,
                    amount: Some("500".to_string()),
                    user_id: None,
                    gateway_response: "Successful".to_string(),
                },
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PaymentVerifier for FakeVerifier {
        async fn verify(&self, _reference: &str) -> Result<PaymentVerification, PaystackError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.verification.clone())
        }
    }

    #[derive(Default)]
    struct FakeMinter {
        mints: StdMutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl FakeMinter {
        fn failing() -> Self {
            Self {
                mints: StdMutex::new(Vec::new()),
                fail: true,
            }
        }

        fn mints(&self) -> Vec<(String, String)> {
            self.mints.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TokenMinter for FakeMinter {
        async fn mint(&self, user_id: &str, amount: &str) -> Result<MintReceipt, MintError> {
            if self.fail {
                return Err(MintError::UserNotFound(user_id.to_string()));
            }
            self.mints
                .lock()
                .unwrap()
                .push((user_id.to_string(), amount.to_string()));
            Ok(MintReceipt {
                tx_hash: format!("hash-{user_id}-{amount}"),
                from: "GDISTRIBUTION".to_string(),
                to: "GRECIPIENT".to_string(),
                amount: amount.to_string(),
                asset_code: "FUC".to_string(),
            })
        }
    }

    fn test_storage() -> (Arc<Storage>, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut storage = Storage::new(StoragePaths::new(dir.path()));
        storage.initialize().expect("initialize storage");
        (Arc::new(storage), dir)
    }

    fn reconciler(
        storage: Arc<Storage>,
        verifier: Arc<FakeVerifier>,
        minter: Arc<FakeMinter>,
    ) -> Reconciler {
        Reconciler::new(storage, verifier, minter)
    }

    #[tokio::test]
    async fn successful_payment_mints_exactly_the_verified_pair() {
        let (storage, _dir) = test_storage();
        let verifier = Arc::new(FakeVerifier::success("42", "500"));
        let minter = Arc::new(FakeMinter::default());
        let controller = reconciler(storage.clone(), verifier, minter.clone());

        let outcome = controller.process("ref123").await.unwrap();
        match outcome {
            ReconcileOutcome::Minted {
                amount, user_id, ..
            } => {
                assert_eq!(amount, "500");
                assert_eq!(user_id, "42");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert_eq!(minter.mints(), vec![("42".to_string(), "500".to_string())]);

        // The local transaction record was written with the asset code.
        let txs = TransactionRepository::new(&storage)
            .list_by_user("42")
            .unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].asset_code, "FUC");
        assert_eq!(txs[0].amount, "500");
    }

    #[tokio::test]
    async fn second_submission_observes_already_processed() {
        let (storage, _dir) = test_storage();
        let verifier = Arc::new(FakeVerifier::success("42", "500"));
        let minter = Arc::new(FakeMinter::default());
        let controller = reconciler(storage, verifier, minter.clone());

        let first = controller.process("ref123").await.unwrap();
        assert!(matches!(first, ReconcileOutcome::Minted { .. }));

        let second = controller.process("ref123").await.unwrap();
        assert!(matches!(second, ReconcileOutcome::AlreadyProcessed));

        // Exactly one mint ever happened.
        assert_eq!(minter.mints().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_duplicate_callbacks_mint_once() {
        let (storage, _dir) = test_storage();
        let verifier = Arc::new(FakeVerifier::success("42", "500"));
        let minter = Arc::new(FakeMinter::default());
        let controller = Arc::new(reconciler(storage, verifier, minter.clone()));

        let a = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.process("ref123").await.unwrap() })
        };
        let b = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.process("ref123").await.unwrap() })
        };

        let outcomes = [a.await.unwrap(), b.await.unwrap()];
        let minted = outcomes
            .iter()
            .filter(|o| matches!(o, ReconcileOutcome::Minted { .. }))
            .count();
        let deduped = outcomes
            .iter()
            .filter(|o| matches!(o, ReconcileOutcome::AlreadyProcessed))
            .count();

        assert_eq!(minted, 1);
        assert_eq!(deduped, 1);
        assert_eq!(minter.mints().len(), 1);
    }

    #[tokio::test]
    async fn declined_payment_is_rejected_without_minting() {
        let (storage, _dir) = test_storage();
        let verifier = Arc::new(FakeVerifier::declined());
        let minter = Arc::new(FakeMinter::default());
        let controller = reconciler(storage.clone(), verifier, minter.clone());

        let outcome = controller.process("ref123").await.unwrap();
        match outcome {
            ReconcileOutcome::Rejected { reason } => assert_eq!(reason, "Declined"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(minter.mints().is_empty());

        // Rejected references stay re-verifiable.
        let again = controller.process("ref123").await.unwrap();
        assert!(matches!(again, ReconcileOutcome::Rejected { .. }));

        let record = ReconciliationRepository::new(&storage)
            .get("ref123")
            .unwrap();
        assert_eq!(record.state, ReconcileState::Rejected);
    }

    #[tokio::test]
    async fn missing_identity_is_rejected_without_claiming() {
        let (storage, _dir) = test_storage();
        let verifier = Arc::new(FakeVerifier::missing_identity());
        let minter = Arc::new(FakeMinter::default());
        let controller = reconciler(storage, verifier, minter.clone());

        let outcome = controller.process("ref123").await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Rejected { .. }));
        assert!(minter.mints().is_empty());
    }

    #[tokio::test]
    async fn mint_failure_is_terminal_and_not_retried() {
        let (storage, _dir) = test_storage();
        let verifier = Arc::new(FakeVerifier::success("42", "500"));
        let minter = Arc::new(FakeMinter::failing());
        let controller = reconciler(storage.clone(), verifier.clone(), minter);

        let outcome = controller.process("ref123").await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::MintFailed { .. }));

        let record = ReconciliationRepository::new(&storage)
            .get("ref123")
            .unwrap();
        assert_eq!(record.state, ReconcileState::MintFailed);
        assert_eq!(record.user_id.as_deref(), Some("42"));
        assert_eq!(record.amount.as_deref(), Some("500"));

        // A duplicate callback neither re-verifies nor re-mints.
        let calls_before = verifier.calls.load(Ordering::SeqCst);
        let again = controller.process("ref123").await.unwrap();
        assert!(matches!(again, ReconcileOutcome::AlreadyProcessed));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), calls_before);
    }

    #[tokio::test]
    async fn operator_retry_replays_a_failed_mint() {
        let (storage, _dir) = test_storage();
        let verifier = Arc::new(FakeVerifier::success("42", "500"));

        // First run fails the mint.
        let failing = Arc::new(FakeMinter::failing());
        let controller = reconciler(storage.clone(), verifier.clone(), failing);
        let outcome = controller.process("ref123").await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::MintFailed { .. }));

        // Operator replays against a healthy minter.
        let healthy = Arc::new(FakeMinter::default());
        let controller = reconciler(storage.clone(), verifier, healthy.clone());
        let outcome = controller.retry_mint("ref123").await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Minted { .. }));
        assert_eq!(healthy.mints(), vec![("42".to_string(), "500".to_string())]);

        let record = ReconciliationRepository::new(&storage)
            .get("ref123")
            .unwrap();
        assert_eq!(record.state, ReconcileState::Minted);

        // Retrying a minted reference is refused.
        assert!(controller.retry_mint("ref123").await.is_err());
    }

    #[tokio::test]
    async fn dedup_survives_a_new_controller_instance() {
        let (storage, _dir) = test_storage();
        let verifier = Arc::new(FakeVerifier::success("42", "500"));
        let minter = Arc::new(FakeMinter::default());

        let controller = reconciler(storage.clone(), verifier.clone(), minter.clone());
        controller.process("ref123").await.unwrap();

        // Simulated restart: fresh in-process set, same storage.
        let restarted = reconciler(storage, verifier, minter.clone());
        let outcome = restarted.process("ref123").await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::AlreadyProcessed));
        assert_eq!(minter.mints().len(), 1);
    }
}
