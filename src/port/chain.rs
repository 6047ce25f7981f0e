//! Chain port for contract reads and transaction submission.
//!
//! This is the only seam between the workflow and a remote ledger. Every
//! submitting method blocks until the transaction is included (or the
//! adapter's bounded receipt wait elapses) and returns its receipt.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::TxId;
use crate::error::ChainError;

/// A `Transfer(from, to, value)` event found in a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLog {
    /// Contract that emitted the event.
    pub emitter: Address,
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// Receipt of an included, successful transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash.
    pub tx_id: TxId,
    /// Block the transaction was included in, when known.
    pub block_number: Option<u64>,
    /// Transfer events emitted during execution.
    pub transfers: Vec<TransferLog>,
}

impl TxReceipt {
    /// Sum of pool shares minted by `pair` to `recipient`.
    ///
    /// A mint is a transfer emitted by the pair from the zero address.
    pub fn minted_to(&self, pair: Address, recipient: Address) -> Option<U256> {
        let mut found = false;
        let mut total = U256::ZERO;
        for log in &self.transfers {
            if log.emitter == pair && log.from == Address::ZERO && log.to == recipient {
                found = true;
                total = total.saturating_add(log.value);
            }
        }
        found.then_some(total)
    }
}

/// Pool reserves as stored by the pair contract (canonical order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reserves {
    pub reserve0: U256,
    pub reserve1: U256,
    pub block_timestamp_last: u32,
}

/// Deployed protocol contracts the workflow drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    pub factory: Address,
    pub router: Address,
    pub oracle: Address,
    /// Wrapped native-asset token accepted by the router's native entry point.
    pub wrapped_native: Option<Address>,
}

/// Arguments of the router's dual-token `addLiquidity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidity {
    pub token_a: Address,
    pub token_b: Address,
    pub amount_a_desired: U256,
    pub amount_b_desired: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
    pub deadline: DateTime<Utc>,
}

/// Arguments of the router's payable `addLiquidityNative`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidityNative {
    pub token: Address,
    pub amount_token_desired: U256,
    pub amount_token_min: U256,
    pub amount_native_min: U256,
    /// Native value attached to the call.
    pub value: U256,
    pub to: Address,
    pub deadline: DateTime<Utc>,
}

/// Read/write access to the chain for a single sending account.
///
/// Implementations submit transactions from [`ChainClient::sender`] in call
/// order; the workflow never issues two submissions concurrently on one
/// client.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Account that signs and sends transactions.
    fn sender(&self) -> Address;

    /// Deployed bytecode at `address` (empty when nothing is deployed).
    async fn code_at(&self, address: Address) -> Result<Vec<u8>, ChainError>;

    /// Native-asset balance of `owner`.
    async fn native_balance(&self, owner: Address) -> Result<U256, ChainError>;

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError>;

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxReceipt, ChainError>;

    /// Factory registry lookup; the zero address means unregistered.
    async fn get_pair(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Address, ChainError>;

    async fn create_pair(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<TxReceipt, ChainError>;

    /// `(token0, token1)` as stored by the pair contract.
    async fn pair_tokens(&self, pair: Address) -> Result<(Address, Address), ChainError>;

    async fn get_reserves(&self, pair: Address) -> Result<Reserves, ChainError>;

    async fn total_supply(&self, pair: Address) -> Result<U256, ChainError>;

    /// Force the pair's reserves to match its balances.
    async fn sync(&self, pair: Address) -> Result<TxReceipt, ChainError>;

    async fn add_liquidity(
        &self,
        router: Address,
        call: &AddLiquidity,
    ) -> Result<TxReceipt, ChainError>;

    async fn add_liquidity_native(
        &self,
        router: Address,
        call: &AddLiquidityNative,
    ) -> Result<TxReceipt, ChainError>;

    async fn is_pair_supported(&self, oracle: Address, pair: Address) -> Result<bool, ChainError>;

    async fn add_oracle_pair(
        &self,
        oracle: Address,
        pair: Address,
        token0: Address,
        token1: Address,
    ) -> Result<TxReceipt, ChainError>;
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;

    use super::*;

    #[test]
    fn minted_to_sums_mints_from_pair_only() {
        let pair = Address::repeat_byte(0x50);
        let me = Address::repeat_byte(0x01);
        let receipt = TxReceipt {
            tx_id: TxId::new(B256::ZERO),
            block_number: Some(1),
            transfers: vec![
                // locked minimum liquidity
                TransferLog {
                    emitter: pair,
                    from: Address::ZERO,
                    to: Address::ZERO,
                    value: U256::from(1000u64),
                },
                TransferLog {
                    emitter: pair,
                    from: Address::ZERO,
                    to: me,
                    value: U256::from(4000u64),
                },
                // token pulled from the caller, not a mint
                TransferLog {
                    emitter: Address::repeat_byte(0xaa),
                    from: me,
                    to: pair,
                    value: U256::from(100u64),
                },
            ],
        };
        assert_eq!(receipt.minted_to(pair, me), Some(U256::from(4000u64)));
        assert_eq!(receipt.minted_to(Address::repeat_byte(0x51), me), None);
    }
}
