// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Transaction building and signing.
//!
//! Envelopes are assembled through the network's XDR wire types, signed
//! over `SHA256(network_id || tagged transaction)`, and base64-encoded for
//! submission. Every transaction carries a time bound; once it passes, the
//! envelope is expired and must be rebuilt against fresh sequence state.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use stellar_xdr::curr as xdr;
use stellar_xdr::curr::WriteXdr;

use super::keys::{decode_public, KeyError, Keypair};

/// Base fee per operation, in stroops.
pub const BASE_FEE: u32 = 100;

/// Default validity window for built transactions, in seconds.
pub const DEFAULT_TX_TIMEOUT_SECS: u64 = 100;

/// Number of fractional decimal digits in ledger amounts.
pub const AMOUNT_DECIMALS: u32 = 7;

const STROOPS_PER_UNIT: i64 = 10_000_000;

/// Errors raised while building or signing a transaction.
#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error("invalid amount `{0}`: {1}")]
    InvalidAmount(String, String),

    #[error("invalid asset code `{0}`")]
    InvalidAssetCode(String),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("XDR encoding failed: {0}")]
    Xdr(String),

    #[error("transaction has no operations")]
    NoOperations,
}

impl From<xdr::Error> for TxError {
    fn from(e: xdr::Error) -> Self {
        TxError::Xdr(e.to_string())
    }
}

/// A custom asset identified by its code and issuing account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedAsset {
    pub code: String,
    pub issuer: String,
}

impl IssuedAsset {
    pub fn new(code: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            issuer: issuer.into(),
        }
    }

    fn to_xdr_asset(&self) -> Result<xdr::Asset, TxError> {
        let issuer = account_id(&self.issuer)?;
        let code = self.code.as_bytes();
        match code.len() {
            1..=4 => {
                let mut padded = [0u8; 4];
                padded[..code.len()].copy_from_slice(code);
                Ok(xdr::Asset::CreditAlphanum4(xdr::AlphaNum4 {
                    asset_code: xdr::AssetCode4(padded),
                    issuer,
                }))
            }
            5..=12 => {
                let mut padded = [0u8; 12];
                padded[..code.len()].copy_from_slice(code);
                Ok(xdr::Asset::CreditAlphanum12(xdr::AlphaNum12 {
                    asset_code: xdr::AssetCode12(padded),
                    issuer,
                }))
            }
            _ => Err(TxError::InvalidAssetCode(self.code.clone())),
        }
    }

    fn to_change_trust_asset(&self) -> Result<xdr::ChangeTrustAsset, TxError> {
        Ok(match self.to_xdr_asset()? {
            xdr::Asset::CreditAlphanum4(inner) => xdr::ChangeTrustAsset::CreditAlphanum4(inner),
            xdr::Asset::CreditAlphanum12(inner) => xdr::ChangeTrustAsset::CreditAlphanum12(inner),
            xdr::Asset::Native => xdr::ChangeTrustAsset::Native,
        })
    }
}

/// A signed transaction ready for submission.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    /// Base64-encoded envelope XDR.
    pub envelope_xdr: String,
    /// Hex-encoded transaction hash (the payload the signatures cover).
    pub hash: String,
}

/// Builder for signed transaction envelopes.
///
/// The source account's sequence number is consumed by the ledger per
/// submitted transaction; callers must build from freshly loaded state.
pub struct TransactionBuilder {
    network_passphrase: String,
    source: String,
    sequence: i64,
    timeout_secs: u64,
    memo: Option<String>,
    operations: Vec<xdr::Operation>,
}

impl TransactionBuilder {
    /// Start a transaction for `source`, whose current sequence is `sequence`.
    pub fn new(network_passphrase: &str, source: &str, sequence: i64) -> Self {
        Self {
            network_passphrase: network_passphrase.to_string(),
            source: source.to_string(),
            sequence,
            timeout_secs: DEFAULT_TX_TIMEOUT_SECS,
            memo: None,
            operations: Vec::new(),
        }
    }

    /// Override the validity window.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Attach a text memo (truncated to the wire limit of 28 bytes).
    pub fn with_memo_text(mut self, text: &str) -> Self {
        let truncated: String = text.chars().take(28).collect();
        self.memo = Some(truncated);
        self
    }

    /// Add a payment of `amount` (decimal string) of `asset` to `destination`.
    pub fn payment(
        mut self,
        destination: &str,
        asset: &IssuedAsset,
        amount: &str,
    ) -> Result<Self, TxError> {
        let op = xdr::Operation {
            source_account: None,
            body: xdr::OperationBody::Payment(xdr::PaymentOp {
                destination: muxed_account(destination)?,
                asset: asset.to_xdr_asset()?,
                amount: parse_amount(amount)?,
            }),
        };
        self.operations.push(op);
        Ok(self)
    }

    /// Add a native-asset payment (for fees/funding flows).
    pub fn native_payment(mut self, destination: &str, amount: &str) -> Result<Self, TxError> {
        let op = xdr::Operation {
            source_account: None,
            body: xdr::OperationBody::Payment(xdr::PaymentOp {
                destination: muxed_account(destination)?,
                asset: xdr::Asset::Native,
                amount: parse_amount(amount)?,
            }),
        };
        self.operations.push(op);
        Ok(self)
    }

    /// Add a change-trust operation establishing the source's trust line
    /// for `asset` with the maximum limit.
    pub fn change_trust(mut self, asset: &IssuedAsset) -> Result<Self, TxError> {
        let op = xdr::Operation {
            source_account: None,
            body: xdr::OperationBody::ChangeTrust(xdr::ChangeTrustOp {
                line: asset.to_change_trust_asset()?,
                limit: i64::MAX,
            }),
        };
        self.operations.push(op);
        Ok(self)
    }

    /// Add a create-account operation funding `destination` with
    /// `starting_balance` native units.
    pub fn create_account(
        mut self,
        destination: &str,
        starting_balance: &str,
    ) -> Result<Self, TxError> {
        let op = xdr::Operation {
            source_account: None,
            body: xdr::OperationBody::CreateAccount(xdr::CreateAccountOp {
                destination: account_id(destination)?,
                starting_balance: parse_amount(starting_balance)?,
            }),
        };
        self.operations.push(op);
        Ok(self)
    }

    /// Build the transaction and sign it with each of `signers`.
    pub fn build_and_sign(self, signers: &[&Keypair]) -> Result<SignedEnvelope, TxError> {
        if self.operations.is_empty() {
            return Err(TxError::NoOperations);
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let memo = match &self.memo {
            Some(text) => xdr::Memo::Text(
                text.as_bytes()
                    .to_vec()
                    .try_into()
                    .map_err(|_| TxError::Xdr("memo too long".to_string()))?,
            ),
            None => xdr::Memo::None,
        };

        let fee = BASE_FEE
            .checked_mul(self.operations.len() as u32)
            .ok_or_else(|| TxError::Xdr("fee overflow".to_string()))?;

        let tx = xdr::Transaction {
            source_account: muxed_account(&self.source)?,
            fee,
            // The envelope consumes the next sequence number.
            seq_num: xdr::SequenceNumber(self.sequence + 1),
            cond: xdr::Preconditions::Time(xdr::TimeBounds {
                min_time: xdr::TimePoint(0),
                max_time: xdr::TimePoint(now + self.timeout_secs),
            }),
            memo,
            operations: self
                .operations
                .try_into()
                .map_err(|_| TxError::Xdr("too many operations".to_string()))?,
            ext: xdr::TransactionExt::V0,
        };

        let network_id = Sha256::digest(self.network_passphrase.as_bytes());
        let payload = xdr::TransactionSignaturePayload {
            network_id: xdr::Hash(network_id.into()),
            tagged_transaction: xdr::TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
        };
        let payload_xdr = payload.to_xdr(xdr::Limits::none())?;
        let hash = Sha256::digest(&payload_xdr);

        let mut signatures = Vec::with_capacity(signers.len());
        for signer in signers {
            let signature = signer.sign(&hash);
            signatures.push(xdr::DecoratedSignature {
                hint: xdr::SignatureHint(signer.hint()),
                signature: xdr::Signature(
                    signature
                        .to_vec()
                        .try_into()
                        .map_err(|_| TxError::Xdr("signature length".to_string()))?,
                ),
            });
        }

        let envelope = xdr::TransactionEnvelope::Tx(xdr::TransactionV1Envelope {
            tx,
            signatures: signatures
                .try_into()
                .map_err(|_| TxError::Xdr("too many signatures".to_string()))?,
        });

        let envelope_bytes = envelope.to_xdr(xdr::Limits::none())?;
        Ok(SignedEnvelope {
            envelope_xdr: BASE64.encode(envelope_bytes),
            hash: hex::encode(hash),
        })
    }
}

fn account_id(public: &str) -> Result<xdr::AccountId, TxError> {
    let bytes = decode_public(public)?;
    Ok(xdr::AccountId(xdr::PublicKey::PublicKeyTypeEd25519(
        xdr::Uint256(bytes),
    )))
}

fn muxed_account(public: &str) -> Result<xdr::MuxedAccount, TxError> {
    let bytes = decode_public(public)?;
    Ok(xdr::MuxedAccount::Ed25519(xdr::Uint256(bytes)))
}

/// Parse a decimal-string amount into stroops (7 fractional digits).
///
/// Amounts travel as decimal strings end to end to avoid floating-point
/// precision loss; the ledger enforces the fixed-precision representation.
pub fn parse_amount(amount: &str) -> Result<i64, TxError> {
    let trimmed = amount.trim();
    let invalid = |reason: &str| TxError::InvalidAmount(amount.to_string(), reason.to_string());

    if trimmed.is_empty() {
        return Err(invalid("empty"));
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() > 2 {
        return Err(invalid("multiple decimal points"));
    }

    let whole_part = parts[0];
    if whole_part.is_empty() || !whole_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("whole part must be digits"));
    }
    let whole = whole_part
        .parse::<i64>()
        .map_err(|_| invalid("whole part out of range"))?;

    let fraction_part = if parts.len() == 2 { parts[1] } else { "" };
    if !fraction_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("fraction must be digits"));
    }
    if fraction_part.len() > AMOUNT_DECIMALS as usize {
        return Err(invalid("more than 7 decimal places"));
    }
    let fraction = if fraction_part.is_empty() {
        0
    } else {
        let padded = format!("{fraction_part:0<7}");
        padded
            .parse::<i64>()
            .map_err(|_| invalid("fraction out of range"))?
    };

    let stroops = whole
        .checked_mul(STROOPS_PER_UNIT)
        .and_then(|base| base.checked_add(fraction))
        .ok_or_else(|| invalid("amount overflow"))?;

    if stroops <= 0 {
        return Err(invalid("amount must be positive"));
    }

    Ok(stroops)
}

/// Format stroops back into a decimal-string amount.
pub fn format_amount(stroops: i64) -> String {
    let whole = stroops / STROOPS_PER_UNIT;
    let fraction = (stroops % STROOPS_PER_UNIT).abs();

    if fraction == 0 {
        whole.to_string()
    } else {
        let fraction_str = format!("{fraction:07}");
        let trimmed = fraction_str.trim_end_matches('0');
        format!("{whole}.{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_xdr::curr::ReadXdr;

    const NETWORK: &str = "Test SDF Network ; September 2015";
    const SOURCE_SEED: &str = "SCO4UPI6F36UM4PZOC4ULM3ZIIJTDHT2GNZDXYTVKSAA3NUFMB4DNL7L";
    const DESTINATION: &str = "GDCE6SEGKVWI6QGL2MPY5REZAD6BCWGBJY2LKV56Q2WA34QDJYDEUXTQ";
    const ISSUER: &str = "GCPKVX7BGMOPV4AHGX62Z3QONXJ5F4L7YQ7DKK75CQB4EGRBIDOLLDN3";

    fn fuc() -> IssuedAsset {
        IssuedAsset::new("FUC", ISSUER)
    }

    fn decode_envelope(envelope: &SignedEnvelope) -> xdr::TransactionV1Envelope {
        let raw = BASE64
            .decode(&envelope.envelope_xdr)
            .expect("envelope should be base64");
        let parsed = xdr::TransactionEnvelope::from_xdr(raw, xdr::Limits::none())
            .expect("envelope should decode");
        match parsed {
            xdr::TransactionEnvelope::Tx(inner) => inner,
            other => panic!("unexpected envelope variant: {other:?}"),
        }
    }

    #[test]
    fn parse_amount_whole_and_fractional() {
        assert_eq!(parse_amount("500").unwrap(), 5_000_000_000);
        assert_eq!(parse_amount("1.5").unwrap(), 15_000_000);
        assert_eq!(parse_amount("0.0000001").unwrap(), 1);
        assert_eq!(parse_amount("20").unwrap(), 200_000_000);
    }

    #[test]
    fn parse_amount_rejects_bad_input() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("1.2.3").is_err());
        assert!(parse_amount("1.23456789").is_err());
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn amount_round_trips_within_precision() {
        for amount in ["500", "1.5", "0.0000001", "12345.6789", "42"] {
            let stroops = parse_amount(amount).unwrap();
            assert_eq!(format_amount(stroops), amount);
            assert_eq!(parse_amount(&format_amount(stroops)).unwrap(), stroops);
        }
    }

    #[test]
    fn payment_envelope_has_expected_shape() {
        let source = Keypair::from_secret(SOURCE_SEED).unwrap();
        let envelope = TransactionBuilder::new(NETWORK, source.public_key(), 7)
            .payment(DESTINATION, &fuc(), "500")
            .unwrap()
            .build_and_sign(&[&source])
            .unwrap();

        let inner = decode_envelope(&envelope);
        assert_eq!(inner.tx.seq_num.0, 8);
        assert_eq!(inner.tx.fee, BASE_FEE);
        assert_eq!(inner.tx.operations.len(), 1);
        assert_eq!(inner.signatures.len(), 1);
        assert_eq!(inner.signatures[0].hint.0, source.hint());

        match &inner.tx.operations[0].body {
            xdr::OperationBody::Payment(op) => {
                assert_eq!(op.amount, 5_000_000_000);
                match &op.asset {
                    xdr::Asset::CreditAlphanum4(alpha) => {
                        assert_eq!(&alpha.asset_code.0, b"FUC\0");
                    }
                    other => panic!("unexpected asset: {other:?}"),
                }
            }
            other => panic!("unexpected operation: {other:?}"),
        }
    }

    #[test]
    fn change_trust_sets_maximum_limit() {
        let source = Keypair::from_secret(SOURCE_SEED).unwrap();
        let envelope = TransactionBuilder::new(NETWORK, source.public_key(), 0)
            .change_trust(&fuc())
            .unwrap()
            .build_and_sign(&[&source])
            .unwrap();

        let inner = decode_envelope(&envelope);
        match &inner.tx.operations[0].body {
            xdr::OperationBody::ChangeTrust(op) => assert_eq!(op.limit, i64::MAX),
            other => panic!("unexpected operation: {other:?}"),
        }
    }

    #[test]
    fn fee_scales_with_operation_count() {
        let source = Keypair::from_secret(SOURCE_SEED).unwrap();
        let envelope = TransactionBuilder::new(NETWORK, source.public_key(), 0)
            .change_trust(&fuc())
            .unwrap()
            .payment(DESTINATION, &fuc(), "1")
            .unwrap()
            .build_and_sign(&[&source])
            .unwrap();

        let inner = decode_envelope(&envelope);
        assert_eq!(inner.tx.fee, BASE_FEE * 2);
    }

    #[test]
    fn time_bound_covers_the_timeout_window() {
        let source = Keypair::from_secret(SOURCE_SEED).unwrap();
        let before = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let envelope = TransactionBuilder::new(NETWORK, source.public_key(), 0)
            .payment(DESTINATION, &fuc(), "1")
            .unwrap()
            .build_and_sign(&[&source])
            .unwrap();

        let inner = decode_envelope(&envelope);
        match inner.tx.cond {
            xdr::Preconditions::Time(bounds) => {
                assert!(bounds.max_time.0 >= before + DEFAULT_TX_TIMEOUT_SECS);
                assert!(bounds.max_time.0 <= before + DEFAULT_TX_TIMEOUT_SECS + 5);
            }
            other => panic!("unexpected preconditions: {other:?}"),
        }
    }

    #[test]
    fn signature_verifies_over_the_hash() {
        use ed25519_dalek::{Signature, Verifier, VerifyingKey};

        let source = Keypair::from_secret(SOURCE_SEED).unwrap();
        let envelope = TransactionBuilder::new(NETWORK, source.public_key(), 3)
            .payment(DESTINATION, &fuc(), "2.5")
            .unwrap()
            .build_and_sign(&[&source])
            .unwrap();

        let inner = decode_envelope(&envelope);
        let hash = hex::decode(&envelope.hash).unwrap();
        let verifying = VerifyingKey::from_bytes(&source.public_key_bytes()).unwrap();
        let signature = Signature::from_slice(inner.signatures[0].signature.0.as_slice()).unwrap();
        assert!(verifying.verify(&hash, &signature).is_ok());
    }

    #[test]
    fn empty_transaction_is_rejected() {
        let source = Keypair::from_secret(SOURCE_SEED).unwrap();
        let result =
            TransactionBuilder::new(NETWORK, source.public_key(), 0).build_and_sign(&[&source]);
        assert!(matches!(result, Err(TxError::NoOperations)));
    }

    #[test]
    fn long_asset_codes_use_alphanum12() {
        let asset = IssuedAsset::new("FUCTOKEN", ISSUER);
        let source = Keypair::from_secret(SOURCE_SEED).unwrap();
        let envelope = TransactionBuilder::new(NETWORK, source.public_key(), 0)
            .change_trust(&asset)
            .unwrap()
            .build_and_sign(&[&source])
            .unwrap();

        let inner = decode_envelope(&envelope);
        match &inner.tx.operations[0].body {
            xdr::OperationBody::ChangeTrust(op) => match &op.line {
                xdr::ChangeTrustAsset::CreditAlphanum12(alpha) => {
                    assert_eq!(&alpha.asset_code.0[..8], b"FUCTOKEN");
                }
                other => panic!("unexpected asset: {other:?}"),
            },
            other => panic!("unexpected operation: {other:?}"),
        }
    }
}
