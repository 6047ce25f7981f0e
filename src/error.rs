use thiserror::Error;

use crate::domain::TxId;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("unknown token '{symbol}' referenced by pair {pair}")]
    UnknownToken { symbol: String, pair: usize },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Failures reported by a [`ChainClient`](crate::port::ChainClient).
///
/// `Reverted` carries the transaction hash whenever the transaction was
/// actually broadcast, so callers can record spent gas even on failure.
#[derive(Error, Debug, Clone)]
pub enum ChainError {
    #[error("transaction reverted: {reason}")]
    Reverted { tx_id: Option<TxId>, reason: String },

    #[error("no receipt for broadcast transaction {tx_id}: {reason}")]
    ReceiptUnavailable { tx_id: TxId, reason: String },

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("signer error: {0}")]
    Signer(String),
}

impl ChainError {
    /// Transaction hash of a broadcast transaction, if any.
    pub fn tx_id(&self) -> Option<TxId> {
        match self {
            ChainError::Reverted { tx_id, .. } => *tx_id,
            ChainError::ReceiptUnavailable { tx_id, .. } => Some(*tx_id),
            ChainError::Rpc(_) | ChainError::Signer(_) => None,
        }
    }

    /// Revert reason, when the failure was an on-chain revert.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            ChainError::Reverted { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;
