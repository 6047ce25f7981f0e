//! Signing key configuration.

use std::fs;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Environment variable holding the primary wallet key.
pub const PRIMARY_KEY_ENV: &str = "WALLET_PRIVATE_KEY";

/// Wallet configuration for signing transactions.
/// Private key is loaded from `WALLET_PRIVATE_KEY` env var at runtime (never from config file).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    /// Optional keystore path for encrypted wallet storage.
    #[serde(default)]
    pub keystore_path: Option<String>,
    /// Private key loaded from `WALLET_PRIVATE_KEY` env var at runtime
    #[serde(skip)]
    pub private_key: Option<String>,
}

impl WalletConfig {
    /// Fill `private_key` from the environment or the configured keystore.
    #[allow(clippy::result_large_err)]
    pub(crate) fn load_key(&mut self) -> Result<()> {
        self.private_key = std::env::var(PRIMARY_KEY_ENV).ok();
        if self.private_key.is_none() {
            if let Some(ref keystore_path) = self.keystore_path {
                let password = read_keystore_password()?;
                self.private_key = Some(decrypt_keystore_private_key(keystore_path, &password)?);
            }
        }
        Ok(())
    }
}

/// A secondary sending account, used to run pairs concurrently.
///
/// Its key is read from the environment variable named by `key_env`.
#[derive(Debug, Clone, Deserialize)]
pub struct LaneConfig {
    pub name: String,
    pub key_env: String,
}

impl LaneConfig {
    #[allow(clippy::result_large_err)]
    pub fn private_key(&self) -> Result<String> {
        std::env::var(&self.key_env).map_err(|_| {
            ConfigError::InvalidValue {
                field: "lanes.key_env",
                reason: format!("environment variable {} is not set", self.key_env),
            }
            .into()
        })
    }
}

fn read_keystore_password() -> Result<String> {
    if let Ok(password) = std::env::var("SEEDPOOL_KEYSTORE_PASSWORD") {
        return Ok(password);
    }
    if let Ok(path) = std::env::var("SEEDPOOL_KEYSTORE_PASSWORD_FILE") {
        let contents = fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let password = contents.trim().to_string();
        if password.is_empty() {
            return Err(ConfigError::MissingField {
                field: "SEEDPOOL_KEYSTORE_PASSWORD_FILE",
            }
            .into());
        }
        return Ok(password);
    }

    Err(ConfigError::MissingField {
        field: "SEEDPOOL_KEYSTORE_PASSWORD",
    }
    .into())
}

#[cfg(feature = "rpc")]
fn decrypt_keystore_private_key(path: &str, password: &str) -> Result<String> {
    use alloy_signer_local::PrivateKeySigner;

    let signer = PrivateKeySigner::decrypt_keystore(path, password).map_err(|e| {
        ConfigError::InvalidValue {
            field: "keystore_path",
            reason: e.to_string(),
        }
    })?;
    Ok(format!("{:x}", signer.to_bytes()))
}

#[cfg(not(feature = "rpc"))]
fn decrypt_keystore_private_key(_path: &str, _password: &str) -> Result<String> {
    Err(ConfigError::InvalidValue {
        field: "keystore_path",
        reason: "keystore support requires the rpc feature".to_string(),
    }
    .into())
}
