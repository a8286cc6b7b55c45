// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! # Runtime Configuration
//!
//! All configuration is loaded from the environment at startup. Every
//! required variable is validated before the server binds; the process
//! refuses to start if any is missing or malformed.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HORIZON_URL` | Ledger network public HTTP endpoint | Required |
//! | `NETWORK_PASSPHRASE` | Ledger network identifier for signing | Required |
//! | `ISSUING_ACCOUNT_SECRET` | Secret seed of the asset-issuing account | Required |
//! | `DISTRIBUTION_ACCOUNT_SECRET` | Secret seed of the distribution account | Required |
//! | `ASSET_CODE` | Custom asset code (1-12 alphanumeric) | `FUC` |
//! | `PAYSTACK_SECRET_KEY` | Paystack API secret key | Required |
//! | `PAYSTACK_PUBLIC_KEY` | Paystack public key for checkout UIs | Required |
//! | `BASE_URL` | Public base URL used to build the callback URL | Required |
//! | `JWT_SECRET` | HS256 signing secret for session tokens | Required |
//! | `DATA_DIR` | Root directory for persistent storage | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `ADMIN_EMAILS` | Comma-separated emails granted the admin role | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::HashSet;

use crate::ledger::keys::Keypair;

/// Environment variable name for the storage root directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Validated process-wide configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Ledger network public HTTP endpoint.
    pub horizon_url: String,
    /// Network passphrase hashed into every transaction signature.
    pub network_passphrase: String,
    /// Secret seed of the account that issues the custom asset.
    pub issuing_account_secret: String,
    /// Secret seed of the account that holds working supply and pays users.
    pub distribution_account_secret: String,
    /// Custom asset code (e.g. `FUC`).
    pub asset_code: String,
    /// Paystack API secret key.
    pub paystack_secret_key: String,
    /// Paystack public key, exposed to checkout UIs.
    pub paystack_public_key: String,
    /// Public base URL of this service (no trailing slash).
    pub base_url: String,
    /// HS256 signing secret for session tokens.
    pub jwt_secret: String,
    /// Root directory for persistent storage.
    pub data_dir: String,
    /// Server bind address.
    pub host: String,
    /// Server bind port.
    pub port: u16,
    /// Emails granted the admin role at login.
    pub admin_emails: HashSet<String>,
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is missing or empty")]
    Missing(&'static str),

    #[error("environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl AppConfig {
    /// Load and validate configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary lookup (used by tests).
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let horizon_url = required(&lookup, "HORIZON_URL")?;
        url::Url::parse(&horizon_url).map_err(|e| ConfigError::Invalid {
            name: "HORIZON_URL",
            reason: e.to_string(),
        })?;

        let network_passphrase = required(&lookup, "NETWORK_PASSPHRASE")?;

        let issuing_account_secret = required(&lookup, "ISSUING_ACCOUNT_SECRET")?;
        Keypair::from_secret(&issuing_account_secret).map_err(|e| ConfigError::Invalid {
            name: "ISSUING_ACCOUNT_SECRET",
            reason: e.to_string(),
        })?;

        let distribution_account_secret = required(&lookup, "DISTRIBUTION_ACCOUNT_SECRET")?;
        Keypair::from_secret(&distribution_account_secret).map_err(|e| ConfigError::Invalid {
            name: "DISTRIBUTION_ACCOUNT_SECRET",
            reason: e.to_string(),
        })?;

        let asset_code = optional(&lookup, "ASSET_CODE").unwrap_or_else(|| "FUC".to_string());
        if asset_code.is_empty()
            || asset_code.len() > 12
            || !asset_code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::Invalid {
                name: "ASSET_CODE",
                reason: "must be 1-12 alphanumeric characters".to_string(),
            });
        }

        let paystack_secret_key = required(&lookup, "PAYSTACK_SECRET_KEY")?;
        let paystack_public_key = required(&lookup, "PAYSTACK_PUBLIC_KEY")?;

        let base_url = required(&lookup, "BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url).map_err(|e| ConfigError::Invalid {
            name: "BASE_URL",
            reason: e.to_string(),
        })?;

        let jwt_secret = required(&lookup, "JWT_SECRET")?;

        let data_dir = optional(&lookup, DATA_DIR_ENV).unwrap_or_else(|| "/data".to_string());
        let host = optional(&lookup, "HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match optional(&lookup, "PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => 8080,
        };

        let admin_emails = optional(&lookup, "ADMIN_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(|email| email.trim().to_ascii_lowercase())
                    .filter(|email| !email.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            horizon_url,
            network_passphrase,
            issuing_account_secret,
            distribution_account_secret,
            asset_code,
            paystack_secret_key,
            paystack_public_key,
            base_url,
            jwt_secret,
            data_dir,
            host,
            port,
            admin_emails,
        })
    }

    /// The callback URL handed to the payment gateway at intent creation.
    pub fn payment_callback_url(&self) -> String {
        format!("{}/api/payments/callback", self.base_url)
    }

    /// Whether an email address is granted the admin role.
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.contains(&email.to_ascii_lowercase())
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional(lookup, name).ok_or(ConfigError::Missing(name))
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Throwaway testnet seeds (never funded).
    const ISSUER_SECRET: &str = "SCO4UPI6F36UM4PZOC4ULM3ZIIJTDHT2GNZDXYTVKSAA3NUFMB4DNL7L";
    const DISTRIBUTION_SECRET: &str = "SAYOBYD64Y3NN6B7DDBBG6GXIAS56QVD4FYKQWDLKCTEJQMGKPXJVPNA";

    fn full_env(name: &str) -> Option<String> {
        match name {
            "HORIZON_URL" => Some("https://horizon-testnet.example.org".to_string()),
            "NETWORK_PASSPHRASE" => Some("Test SDF Network ; September 2015".to_string()),
            "ISSUING_ACCOUNT_SECRET" => Some(ISSUER_SECRET.to_string()),
            "DISTRIBUTION_ACCOUNT_SECRET" => Some(DISTRIBUTION_SECRET.to_string()),
            "PAYSTACK_SECRET_KEY" => Some("sk_test_abc".to_string()),
            "PAYSTACK_PUBLIC_KEY" => Some("pk_test_abc".to_string()),
            "BASE_URL" => Some("https://wallet.example.org/".to_string()),
            "JWT_SECRET" => Some("super-secret".to_string()),
            "ADMIN_EMAILS" => Some("Ops@Example.org, support@example.org".to_string()),
            _ => None,
        }
    }

    #[test]
    fn loads_full_configuration() {
        let config = AppConfig::from_source(full_env).expect("config should load");
        assert_eq!(config.asset_code, "FUC");
        assert_eq!(config.port, 8080);
        assert_eq!(config.base_url, "https://wallet.example.org");
        assert_eq!(
            config.payment_callback_url(),
            "https://wallet.example.org/api/payments/callback"
        );
    }

    #[test]
    fn missing_required_variable_fails() {
        let result = AppConfig::from_source(|name| {
            if name == "PAYSTACK_SECRET_KEY" {
                None
            } else {
                full_env(name)
            }
        });
        assert!(matches!(
            result,
            Err(ConfigError::Missing("PAYSTACK_SECRET_KEY"))
        ));
    }

    #[test]
    fn blank_required_variable_fails() {
        let result = AppConfig::from_source(|name| {
            if name == "JWT_SECRET" {
                Some("   ".to_string())
            } else {
                full_env(name)
            }
        });
        assert!(matches!(result, Err(ConfigError::Missing("JWT_SECRET"))));
    }

    #[test]
    fn invalid_horizon_url_fails() {
        let result = AppConfig::from_source(|name| {
            if name == "HORIZON_URL" {
                Some("not a url".to_string())
            } else {
                full_env(name)
            }
        });
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                name: "HORIZON_URL",
                ..
            })
        ));
    }

    #[test]
    fn invalid_distribution_seed_fails() {
        let result = AppConfig::from_source(|name| {
            if name == "DISTRIBUTION_ACCOUNT_SECRET" {
                Some("SNOTASEED".to_string())
            } else {
                full_env(name)
            }
        });
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                name: "DISTRIBUTION_ACCOUNT_SECRET",
                ..
            })
        ));
    }

    #[test]
    fn asset_code_must_be_alphanumeric() {
        let result = AppConfig::from_source(|name| {
            if name == "ASSET_CODE" {
                Some("FU-C".to_string())
            } else {
                full_env(name)
            }
        });
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                name: "ASSET_CODE",
                ..
            })
        ));
    }

    #[test]
    fn admin_emails_are_normalized() {
        let config = AppConfig::from_source(full_env).expect("config should load");
        assert!(config.is_admin_email("ops@example.org"));
        assert!(config.is_admin_email("OPS@EXAMPLE.ORG"));
        assert!(!config.is_admin_email("user@example.org"));
    }
}
