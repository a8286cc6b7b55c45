// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

use std::sync::Arc;

use crate::config::AppConfig;
use crate::ledger::{
    CustodialKeyStore, HorizonClient, IssuedAsset, Keypair, LedgerGateway, MintExecutor,
};
use crate::providers::PaystackClient;
use crate::reconcile::{MintService, Reconciler};
use crate::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<Storage>,
    pub horizon: Arc<HorizonClient>,
    pub gateway: Arc<PaystackClient>,
    pub minter: Arc<MintExecutor>,
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    /// Wire up all components from validated configuration and
    /// initialized storage.
    pub fn new(config: AppConfig, storage: Storage) -> Result<Self, String> {
        let config = Arc::new(config);
        let storage = Arc::new(storage);

        let horizon = Arc::new(
            HorizonClient::new(&config.horizon_url).map_err(|e| e.to_string())?,
        );
        let gateway = Arc::new(
            PaystackClient::new(&config.paystack_secret_key, &config.payment_callback_url())
                .map_err(|e| e.to_string())?,
        );

        let issuing = Keypair::from_secret(&config.issuing_account_secret)
            .map_err(|e| e.to_string())?;
        let distribution = Keypair::from_secret(&config.distribution_account_secret)
            .map_err(|e| e.to_string())?;
        let asset = IssuedAsset::new(config.asset_code.clone(), issuing.public_key());

        let ledger: Arc<dyn LedgerGateway> = horizon.clone();
        let minter = Arc::new(MintExecutor::new(
            ledger,
            Arc::new(CustodialKeyStore),
            distribution,
            asset,
            config.network_passphrase.clone(),
        ));

        let reconciler = Arc::new(Reconciler::new(
            storage.clone(),
            gateway.clone(),
            Arc::new(MintService::new(storage.clone(), minter.clone())),
        ));

        Ok(Self {
            config,
            storage,
            horizon,
            gateway,
            minter,
            reconciler,
        })
    }
}

#[cfg(test)]
impl AppState {
    /// Fully wired state over temp storage and throwaway keys, for tests.
    pub fn for_tests() -> Self {
        use crate::storage::StoragePaths;

        let test_dir =
            std::env::temp_dir().join(format!("fuo-wallet-test-{}", uuid::Uuid::new_v4()));
        let paths = StoragePaths::new(&test_dir);
        let mut storage = Storage::new(paths);
        storage.initialize().expect("initialize test storage");

        let config = AppConfig::from_source(|name| {
            match name {
                "HORIZON_URL" => Some("https://horizon-testnet.example.org".to_string()),
                "NETWORK_PASSPHRASE" => Some("Test SDF Network ; September 2015".to_string()),
                "ISSUING_ACCOUNT_SECRET" => {
                    Some("SCO4UPI6F36UM4PZOC4ULM3ZIIJTDHT2GNZDXYTVKSAA3NUFMB4DNL7L".to_string())
                }
                "DISTRIBUTION_ACCOUNT_SECRET" => {
                    Some("SAYOBYD64Y3NN6B7DDBBG6GXIAS56QVD4FYKQWDLKCTEJQMGKPXJVPNA".to_string())
                }
                "PAYSTACK_SECRET_KEY" => Some("sk_test_abc".to_string()),
                "PAYSTACK_PUBLIC_KEY" => Some("pk_test_abc".to_string()),
                "BASE_URL" => Some("https://wallet.example.org".to_string()),
                "JWT_SECRET" => Some("test-jwt-secret".to_string()),
                "DATA_DIR" => Some(test_dir.to_string_lossy().to_string()),
                _ => None,
            }
        })
        .expect("test config should load");

        Self::new(config, storage).expect("test state should build")
    }
}
