//! Pair resolution against the factory registry.
//!
//! A registry entry is only trusted once the named address carries contract
//! code and the pair contract reports the expected tokens. An entry pointing
//! at an empty account is a phantom pair and is reported, never provisioned.

use std::sync::Arc;

use alloy_primitives::Address;
use tracing::{debug, info, warn};

use super::revert::chain_failure;
use crate::domain::{CanonicalPair, ErrorKind, PairRecord, StepData, StepResult, TxId};
use crate::error::ChainError;
use crate::port::ChainClient;

/// Read-only view of what the factory knows about a token pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Factory returns the zero address.
    Unregistered,
    /// Factory names an address with no deployed code.
    Phantom(Address),
    /// Factory names a deployed contract.
    Deployed(Address),
}

pub struct PairResolver {
    chain: Arc<dyn ChainClient>,
    factory: Address,
}

impl PairResolver {
    pub fn new(chain: Arc<dyn ChainClient>, factory: Address) -> Self {
        Self { chain, factory }
    }

    /// Query the factory and inspect the returned address without sending
    /// any transaction.
    pub async fn probe(&self, token_a: Address, token_b: Address) -> Result<Probe, ChainError> {
        let address = self.chain.get_pair(self.factory, token_a, token_b).await?;
        if address == Address::ZERO {
            return Ok(Probe::Unregistered);
        }
        let code = self.chain.code_at(address).await?;
        if code.is_empty() {
            Ok(Probe::Phantom(address))
        } else {
            Ok(Probe::Deployed(address))
        }
    }

    /// Resolve the pool for `{token_a, token_b}`, creating it when missing
    /// and `allow_create` is set.
    pub async fn resolve(&self, token_a: Address, token_b: Address, allow_create: bool) -> StepResult {
        let mut tx_ids: Vec<TxId> = Vec::new();
        let mut created = false;

        let mut probe = match self.probe(token_a, token_b).await {
            Ok(probe) => probe,
            Err(e) => return chain_failure(ErrorKind::ChainUnavailable, "factory query failed", &e, &[]),
        };

        if probe == Probe::Unregistered {
            if !allow_create {
                return StepResult::failed(
                    ErrorKind::PairNotFound,
                    format!("factory has no pair for {token_a}/{token_b} and creation is disabled"),
                );
            }

            info!(token_a = %token_a, token_b = %token_b, "Creating pair");
            match self.chain.create_pair(self.factory, token_a, token_b).await {
                Ok(receipt) => {
                    tx_ids.push(receipt.tx_id);
                    created = true;
                }
                // A concurrent creator may have won the race; re-query below.
                Err(e @ ChainError::Reverted { .. }) => {
                    warn!(error = %e, "Pair creation reverted, re-querying factory");
                    tx_ids.extend(e.tx_id());
                }
                Err(e) => {
                    return chain_failure(ErrorKind::ChainUnavailable, "pair creation failed", &e, &tx_ids)
                }
            }

            probe = match self.probe(token_a, token_b).await {
                Ok(probe) => probe,
                Err(e) => {
                    return chain_failure(ErrorKind::ChainUnavailable, "factory re-query failed", &e, &tx_ids)
                }
            };
        }

        let address = match probe {
            Probe::Deployed(address) => address,
            Probe::Phantom(address) => {
                warn!(pair = %address, "Factory entry has no deployed code");
                return StepResult::failed(
                    ErrorKind::PhantomPair { pair: address },
                    format!("factory returned {address} but no contract code is deployed there"),
                )
                .with_txs(tx_ids);
            }
            Probe::Unregistered => {
                return StepResult::failed(
                    ErrorKind::TransactionReverted,
                    "factory still returns the zero address after pair creation",
                )
                .with_txs(tx_ids);
            }
        };

        let record = match self.read_record(address).await {
            Ok(record) => record,
            Err(e) => return chain_failure(ErrorKind::ChainUnavailable, "pair read failed", &e, &tx_ids),
        };

        if !CanonicalPair::new(token_a, token_b)
            .map(|expected| expected.matches(record.token0, record.token1))
            .unwrap_or(false)
        {
            return StepResult::failed(
                ErrorKind::PairMismatch {
                    pair: address,
                    token0: record.token0,
                    token1: record.token1,
                },
                format!(
                    "pair {address} holds {}/{}, expected {token_a}/{token_b}",
                    record.token0, record.token1
                ),
            )
            .with_txs(tx_ids);
        }

        debug!(pair = %address, created, "Pair resolved");
        StepResult::success(tx_ids, StepData::Pair { record, created })
    }

    /// Read token order, reserves and share supply from a deployed pair.
    pub async fn read_record(&self, address: Address) -> Result<PairRecord, ChainError> {
        read_record(self.chain.as_ref(), address).await
    }
}

pub(crate) async fn read_record(chain: &dyn ChainClient, address: Address) -> Result<PairRecord, ChainError> {
    let (token0, token1) = chain.pair_tokens(address).await?;
    let reserves = chain.get_reserves(address).await?;
    let total_shares = chain.total_supply(address).await?;
    Ok(PairRecord {
        address,
        token0,
        token1,
        has_deployed_code: true,
        reserve0: reserves.reserve0,
        reserve1: reserves.reserve1,
        total_shares,
    })
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;

    use super::*;
    use crate::adapter::simulated::{SimCall, SimulatedChain};

    const ME: Address = Address::repeat_byte(0x01);
    const FACTORY: Address = Address::repeat_byte(0xfa);
    const HIGH: Address = Address::repeat_byte(0xbb);
    const LOW: Address = Address::repeat_byte(0xaa);

    fn setup() -> (Arc<SimulatedChain>, PairResolver) {
        let chain = Arc::new(SimulatedChain::new(ME));
        chain.add_token(LOW, false);
        chain.add_token(HIGH, false);
        let resolver = PairResolver::new(chain.clone(), FACTORY);
        (chain, resolver)
    }

    fn record(step: &StepResult) -> (&PairRecord, bool) {
        match step.data() {
            Some(StepData::Pair { record, created }) => (record, *created),
            other => panic!("expected pair data, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn creates_missing_pair_and_reads_canonical_order() {
        let (chain, resolver) = setup();

        let step = resolver.resolve(HIGH, LOW, true).await;

        assert!(step.is_success(), "unexpected step: {step:?}");
        assert_eq!(step.tx_ids().len(), 1);
        let (record, created) = record(&step);
        assert!(created);
        assert_eq!(record.token0, LOW);
        assert_eq!(record.token1, HIGH);
        assert_eq!(Some(record.address), chain.pair_for(LOW, HIGH));
    }

    #[tokio::test]
    async fn missing_pair_without_create_is_not_found() {
        let (chain, resolver) = setup();

        let step = resolver.resolve(LOW, HIGH, false).await;

        assert_eq!(step.error(), Some(&ErrorKind::PairNotFound));
        assert!(chain.transactions().is_empty());
    }

    #[tokio::test]
    async fn phantom_entry_is_reported() {
        let (chain, resolver) = setup();
        let phantom = chain.register_phantom(LOW, HIGH);

        assert_eq!(resolver.probe(LOW, HIGH).await.unwrap(), Probe::Phantom(phantom));
        let step = resolver.resolve(LOW, HIGH, true).await;

        assert_eq!(step.error(), Some(&ErrorKind::PhantomPair { pair: phantom }));
        assert!(chain.transactions().is_empty());
    }

    #[tokio::test]
    async fn existing_pair_resolves_without_transactions() {
        let (chain, resolver) = setup();
        let pair = chain.deploy_pair(LOW, HIGH);
        chain.seed_reserves(pair, U256::from(5u64), U256::from(7u64), U256::from(6u64));

        let step = resolver.resolve(HIGH, LOW, false).await;

        let (record, created) = record(&step);
        assert!(!created);
        assert_eq!(record.reserve1, U256::from(7u64));
        assert_eq!(record.total_shares, U256::from(6u64));
        assert!(step.tx_ids().is_empty());
    }

    #[tokio::test]
    async fn registered_pair_is_never_recreated() {
        let (chain, resolver) = setup();
        chain.deploy_pair(LOW, HIGH);

        let step = resolver.resolve(LOW, HIGH, true).await;
        assert!(step.is_success());
        assert!(chain.transactions_of(SimCall::CreatePair).is_empty());
    }

    #[tokio::test]
    async fn reverted_creation_without_pair_fails_with_spent_tx() {
        let (chain, resolver) = setup();
        chain.fail_next(SimCall::CreatePair, "factory paused");

        let step = resolver.resolve(LOW, HIGH, true).await;

        assert_eq!(step.error(), Some(&ErrorKind::TransactionReverted));
        assert_eq!(step.tx_ids().len(), 1);
        assert_eq!(chain.transactions_of(SimCall::CreatePair).len(), 1);
    }
}
