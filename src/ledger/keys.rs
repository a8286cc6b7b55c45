// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Account keypairs and the custodial signing capability.
//!
//! Accounts are identified by strkey-encoded ed25519 keys (`G…` public,
//! `S…` secret seed). The service holds recipient seeds custodially;
//! everything that signs on a user's behalf goes through the
//! [`RecipientSigner`] trait so the custodial store can later be swapped
//! for a non-custodial flow without touching the mint path.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::storage::StoredUser;

/// Errors raised by key handling.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid secret seed: {0}")]
    InvalidSeed(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// An ed25519 keypair addressed by its strkey encoding.
#[derive(Debug, Clone)]
pub struct Keypair {
    signing: SigningKey,
    public: String,
}

impl Keypair {
    /// Decode a keypair from a strkey secret seed (`S…`).
    pub fn from_secret(secret: &str) -> Result<Self, KeyError> {
        let seed = stellar_strkey::ed25519::PrivateKey::from_string(secret)
            .map_err(|e| KeyError::InvalidSeed(format!("{e:?}")))?;
        let signing = SigningKey::from_bytes(&seed.0);
        let public = encode_public(signing.verifying_key());
        Ok(Self { signing, public })
    }

    /// Generate a fresh random keypair.
    pub fn random() -> Self {
        let signing = SigningKey::generate(&mut OsRng);
        let public = encode_public(signing.verifying_key());
        Self { signing, public }
    }

    /// The strkey public key (`G…`).
    pub fn public_key(&self) -> &str {
        &self.public
    }

    /// The strkey secret seed (`S…`).
    pub fn secret_seed(&self) -> String {
        stellar_strkey::ed25519::PrivateKey(self.signing.to_bytes()).to_string()
    }

    /// Raw 32-byte public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing.verifying_key().to_bytes()
    }

    /// Signature hint: the last four bytes of the public key.
    pub fn hint(&self) -> [u8; 4] {
        let bytes = self.public_key_bytes();
        [bytes[28], bytes[29], bytes[30], bytes[31]]
    }

    /// Sign an arbitrary payload, returning the 64-byte signature.
    pub fn sign(&self, payload: &[u8]) -> [u8; 64] {
        self.signing.sign(payload).to_bytes()
    }
}

/// Decode a strkey public key (`G…`) into its raw 32 bytes.
pub fn decode_public(public: &str) -> Result<[u8; 32], KeyError> {
    stellar_strkey::ed25519::PublicKey::from_string(public)
        .map(|key| key.0)
        .map_err(|e| KeyError::InvalidPublicKey(format!("{e:?}")))
}

fn encode_public(key: VerifyingKey) -> String {
    stellar_strkey::ed25519::PublicKey(key.to_bytes()).to_string()
}

/// Signing capability for accounts the service holds custodially.
///
/// Implementations resolve the keypair that may sign on a given user's
/// behalf. The default implementation reads the seed stored with the user
/// record; a non-custodial deployment would return an error or delegate
/// to an external signer.
pub trait RecipientSigner: Send + Sync {
    fn signer_for(&self, user: &StoredUser) -> Result<Keypair, KeyError>;
}

/// Custodial key store backed by the seeds kept on user records.
#[derive(Debug, Default)]
pub struct CustodialKeyStore;

impl RecipientSigner for CustodialKeyStore {
    fn signer_for(&self, user: &StoredUser) -> Result<Keypair, KeyError> {
        Keypair::from_secret(&user.ledger_secret_seed)
    }
}
