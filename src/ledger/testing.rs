// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Test double for the ledger gateway.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::horizon::{AccountRecord, HorizonError, LedgerGateway, ResultCodes, SubmitResult};
use super::tx::SignedEnvelope;

/// In-memory [`LedgerGateway`] recording every submission.
#[derive(Default)]
pub struct FakeLedger {
    accounts: Mutex<HashMap<String, AccountRecord>>,
    submissions: Mutex<Vec<SignedEnvelope>>,
    rejections: Mutex<VecDeque<String>>,
}

impl FakeLedger {
    /// Register (or replace) an account record.
    pub fn put_account(&self, record: AccountRecord) {
        self.accounts
            .lock()
            .unwrap()
            .insert(record.account_id.clone(), record);
    }

    /// Every envelope submitted so far, in order.
    pub fn submissions(&self) -> Vec<SignedEnvelope> {
        self.submissions.lock().unwrap().clone()
    }

    /// Queue a rejection (by operation result code) for the next submission.
    pub fn reject_next(&self, op_code: &str) {
        self.rejections
            .lock()
            .unwrap()
            .push_back(op_code.to_string());
    }
}

#[async_trait]
impl LedgerGateway for FakeLedger {
    async fn load_account(&self, public_key: &str) -> Result<AccountRecord, HorizonError> {
        self.accounts
            .lock()
            .unwrap()
            .get(public_key)
            .cloned()
            .ok_or_else(|| HorizonError::NotFound(public_key.to_string()))
    }

    async fn submit(&self, envelope: &SignedEnvelope) -> Result<SubmitResult, HorizonError> {
        if let Some(op_code) = self.rejections.lock().unwrap().pop_front() {
            return Err(HorizonError::Rejected {
                result_codes: ResultCodes {
                    transaction: Some("tx_failed".to_string()),
                    operations: vec![op_code],
                },
            });
        }

        self.submissions.lock().unwrap().push(envelope.clone());
        Ok(SubmitResult {
            hash: envelope.hash.clone(),
            ledger: Some(1),
        })
    }
}
