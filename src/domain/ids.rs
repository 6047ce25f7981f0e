//! Domain identifier types with proper encapsulation.

use std::fmt;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Transaction hash of a broadcast transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(B256);

impl TxId {
    /// Wrap a raw transaction hash.
    pub const fn new(hash: B256) -> Self {
        Self(hash)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<B256> for TxId {
    fn from(hash: B256) -> Self {
        Self::new(hash)
    }
}

/// Pair identifier used as the ledger key - newtype for type safety.
///
/// The inner String is private to ensure all construction goes through
/// the defined constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairId(String);

impl PairId {
    /// Create a new PairId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the pair ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PairId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for PairId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_id_display() {
        let id = PairId::new("USDC/WETH");
        assert_eq!(format!("{id}"), "USDC/WETH");
        assert_eq!(id.as_str(), "USDC/WETH");
    }

    #[test]
    fn tx_id_serializes_as_hex_string() {
        let id = TxId::new(B256::repeat_byte(0xab));
        let json = serde_json::to_string(&id).unwrap();
        assert!(json.starts_with("\"0xabab"));
        let back: TxId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
