//! [`ChainClient`] over HTTP JSON-RPC.
//!
//! Providers are built per call from the configured endpoint. Submissions
//! wait for the configured number of confirmations, bounded by the receipt
//! timeout; a receipt with failed status maps to [`ChainError::Reverted`]
//! carrying the transaction hash. Receipts carry no revert data, so the
//! reason is recovered by replaying the call with `eth_call` at the block
//! that included it.

use std::str::FromStr;
use std::time::Duration;

use alloy_contract::{CallBuilder, CallDecoder};
use alloy_primitives::{Address, U256};
use alloy_provider::network::{Ethereum, EthereumWallet};
use alloy_provider::{PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::contracts::{IPair, IPairFactory, IPriceOracle, IRouter, IERC20};
use crate::config::NetworkConfig;
use crate::domain::TxId;
use crate::error::{ChainError, ConfigError, Result};
use crate::port::{AddLiquidity, AddLiquidityNative, ChainClient, Reserves, TransferLog, TxReceipt};

/// Reason reported when the replay does not reproduce the revert.
const UNKNOWN_REVERT: &str = "execution reverted";

/// How a broadcast transaction ended up on chain.
enum Inclusion {
    Succeeded(TxReceipt),
    Reverted { tx_id: TxId, block: Option<u64> },
}

/// Chain client signing with a local private key.
pub struct EvmChainClient {
    signer: PrivateKeySigner,
    rpc_url: url::Url,
    confirmations: u64,
    receipt_timeout: Duration,
}

impl EvmChainClient {
    /// Create a client for `network` sending from the account of `private_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the private key is missing or invalid, or the RPC
    /// URL does not parse.
    #[allow(clippy::result_large_err)]
    pub fn new(private_key: &str, network: &NetworkConfig) -> Result<Self> {
        if private_key.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "WALLET_PRIVATE_KEY",
            }
            .into());
        }

        let signer = PrivateKeySigner::from_str(private_key.trim()).map_err(|e| {
            ConfigError::InvalidValue {
                field: "WALLET_PRIVATE_KEY",
                reason: e.to_string(),
            }
        })?;
        let rpc_url = url::Url::parse(&network.rpc_url)?;

        Ok(Self {
            signer,
            rpc_url,
            confirmations: network.confirmations,
            receipt_timeout: Duration::from_secs(network.receipt_timeout_secs),
        })
    }

    /// Chain id reported by the endpoint.
    pub async fn chain_id(&self) -> std::result::Result<u64, ChainError> {
        self.read_provider()
            .get_chain_id()
            .await
            .map_err(|e| ChainError::Rpc(format!("failed to get chain id: {e}")))
    }

    fn read_provider(&self) -> impl Provider {
        ProviderBuilder::new().connect_http(self.rpc_url.clone())
    }

    fn write_provider(&self) -> impl Provider {
        let wallet = EthereumWallet::from(self.signer.clone());
        ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(self.rpc_url.clone())
    }

    /// Broadcast `call`, wait for inclusion and recover the reason of a
    /// mined revert.
    async fn submit<P, D>(
        &self,
        context: &str,
        call: CallBuilder<P, D>,
    ) -> std::result::Result<TxReceipt, ChainError>
    where
        P: Provider + Clone,
        D: CallDecoder,
    {
        let pending = call.send().await.map_err(|e| send_error(context, e))?;
        match self.confirm(pending).await? {
            Inclusion::Succeeded(receipt) => Ok(receipt),
            Inclusion::Reverted { tx_id, block } => {
                let reason = match block {
                    Some(block) => replay_reason(call, block).await,
                    None => UNKNOWN_REVERT.to_string(),
                };
                warn!(tx_hash = %tx_id, reason = %reason, "Transaction reverted");
                Err(ChainError::Reverted {
                    tx_id: Some(tx_id),
                    reason,
                })
            }
        }
    }

    /// Wait for inclusion and translate the receipt.
    async fn confirm(
        &self,
        pending: PendingTransactionBuilder<Ethereum>,
    ) -> std::result::Result<Inclusion, ChainError> {
        let tx_id = TxId::new(*pending.tx_hash());
        debug!(tx_hash = %tx_id, "Waiting for receipt");

        let receipt = pending
            .with_required_confirmations(self.confirmations)
            .with_timeout(Some(self.receipt_timeout))
            .get_receipt()
            .await
            .map_err(|e| ChainError::ReceiptUnavailable {
                tx_id,
                reason: e.to_string(),
            })?;

        if !receipt.status() {
            return Ok(Inclusion::Reverted {
                tx_id,
                block: receipt.block_number,
            });
        }

        let transfers = receipt
            .inner
            .logs()
            .iter()
            .filter_map(|log| {
                let decoded = log.log_decode::<IERC20::Transfer>().ok()?;
                let event = decoded.inner.data;
                Some(TransferLog {
                    emitter: log.address(),
                    from: event.from,
                    to: event.to,
                    value: event.value,
                })
            })
            .collect();

        Ok(Inclusion::Succeeded(TxReceipt {
            tx_id,
            block_number: receipt.block_number,
            transfers,
        }))
    }
}

/// Re-run a reverted call against the state and timestamp of `block`.
async fn replay_reason<P, D>(call: CallBuilder<P, D>, block: u64) -> String
where
    P: Provider + Clone,
    D: CallDecoder,
{
    match call.block(block.into()).call().await {
        Err(e) => revert_reason(&e.to_string()),
        Ok(_) => UNKNOWN_REVERT.to_string(),
    }
}

/// Extract the revert message from a node error, falling back to a generic
/// reason when the error carries none.
fn revert_reason(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    match lower.find("execution reverted") {
        Some(at) => message[at..].to_string(),
        None if lower.contains("revert") => message.to_string(),
        None => UNKNOWN_REVERT.to_string(),
    }
}

/// Failure before broadcast: a revert during gas estimation or a transport error.
fn send_error(context: &str, err: alloy_contract::Error) -> ChainError {
    let message = err.to_string();
    if message.to_ascii_lowercase().contains("revert") {
        ChainError::Reverted {
            tx_id: None,
            reason: message,
        }
    } else {
        ChainError::Rpc(format!("{context}: {message}"))
    }
}

fn read_error(context: &str, err: impl std::fmt::Display) -> ChainError {
    ChainError::Rpc(format!("{context}: {err}"))
}

fn deadline_secs(deadline: DateTime<Utc>) -> U256 {
    U256::from(u64::try_from(deadline.timestamp()).unwrap_or_default())
}

#[async_trait]
impl ChainClient for EvmChainClient {
    fn sender(&self) -> Address {
        self.signer.address()
    }

    async fn code_at(&self, address: Address) -> std::result::Result<Vec<u8>, ChainError> {
        let code = self
            .read_provider()
            .get_code_at(address)
            .await
            .map_err(|e| read_error("failed to get code", e))?;
        Ok(code.to_vec())
    }

    async fn native_balance(&self, owner: Address) -> std::result::Result<U256, ChainError> {
        self.read_provider()
            .get_balance(owner)
            .await
            .map_err(|e| read_error("failed to get native balance", e))
    }

    async fn balance_of(&self, token: Address, owner: Address) -> std::result::Result<U256, ChainError> {
        let provider = self.read_provider();
        IERC20::new(token, &provider)
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| read_error("failed to get balance", e))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> std::result::Result<U256, ChainError> {
        let provider = self.read_provider();
        IERC20::new(token, &provider)
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| read_error("failed to get allowance", e))
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> std::result::Result<TxReceipt, ChainError> {
        let provider = self.write_provider();
        let contract = IERC20::new(token, &provider);
        let tx = contract.approve(spender, amount);
        self.submit("failed to send approval", tx).await
    }

    async fn get_pair(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> std::result::Result<Address, ChainError> {
        let provider = self.read_provider();
        IPairFactory::new(factory, &provider)
            .getPair(token_a, token_b)
            .call()
            .await
            .map_err(|e| read_error("failed to query factory", e))
    }

    async fn create_pair(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> std::result::Result<TxReceipt, ChainError> {
        let provider = self.write_provider();
        let contract = IPairFactory::new(factory, &provider);
        let tx = contract.createPair(token_a, token_b);
        self.submit("failed to send createPair", tx).await
    }

    async fn pair_tokens(&self, pair: Address) -> std::result::Result<(Address, Address), ChainError> {
        let provider = self.read_provider();
        let contract = IPair::new(pair, &provider);
        let token0 = contract
            .token0()
            .call()
            .await
            .map_err(|e| read_error("failed to read token0", e))?;
        let token1 = contract
            .token1()
            .call()
            .await
            .map_err(|e| read_error("failed to read token1", e))?;
        Ok((token0, token1))
    }

    async fn get_reserves(&self, pair: Address) -> std::result::Result<Reserves, ChainError> {
        let provider = self.read_provider();
        let reserves = IPair::new(pair, &provider)
            .getReserves()
            .call()
            .await
            .map_err(|e| read_error("failed to read reserves", e))?;
        Ok(Reserves {
            reserve0: U256::from(reserves.reserve0),
            reserve1: U256::from(reserves.reserve1),
            block_timestamp_last: reserves.blockTimestampLast,
        })
    }

    async fn total_supply(&self, pair: Address) -> std::result::Result<U256, ChainError> {
        let provider = self.read_provider();
        IPair::new(pair, &provider)
            .totalSupply()
            .call()
            .await
            .map_err(|e| read_error("failed to read total supply", e))
    }

    async fn sync(&self, pair: Address) -> std::result::Result<TxReceipt, ChainError> {
        let provider = self.write_provider();
        let contract = IPair::new(pair, &provider);
        let tx = contract.sync();
        self.submit("failed to send sync", tx).await
    }

    async fn add_liquidity(
        &self,
        router: Address,
        call: &AddLiquidity,
    ) -> std::result::Result<TxReceipt, ChainError> {
        let provider = self.write_provider();
        let contract = IRouter::new(router, &provider);
        let tx = contract
            .addLiquidity(
                call.token_a,
                call.token_b,
                call.amount_a_desired,
                call.amount_b_desired,
                call.amount_a_min,
                call.amount_b_min,
                call.to,
                deadline_secs(call.deadline),
            );
        self.submit("failed to send addLiquidity", tx).await
    }

    async fn add_liquidity_native(
        &self,
        router: Address,
        call: &AddLiquidityNative,
    ) -> std::result::Result<TxReceipt, ChainError> {
        let provider = self.write_provider();
        let contract = IRouter::new(router, &provider);
        let tx = contract
            .addLiquidityNative(
                call.token,
                call.amount_token_desired,
                call.amount_token_min,
                call.amount_native_min,
                call.to,
                deadline_secs(call.deadline),
            )
            .value(call.value);
        self.submit("failed to send addLiquidityNative", tx).await
    }

    async fn is_pair_supported(
        &self,
        oracle: Address,
        pair: Address,
    ) -> std::result::Result<bool, ChainError> {
        let provider = self.read_provider();
        IPriceOracle::new(oracle, &provider)
            .isPairSupported(pair)
            .call()
            .await
            .map_err(|e| read_error("failed to query oracle", e))
    }

    async fn add_oracle_pair(
        &self,
        oracle: Address,
        pair: Address,
        token0: Address,
        token1: Address,
    ) -> std::result::Result<TxReceipt, ChainError> {
        let provider = self.write_provider();
        let contract = IPriceOracle::new(oracle, &provider);
        let tx = contract.addPair(pair, token0, token1);
        self.submit("failed to send addPair", tx).await
    }
}
