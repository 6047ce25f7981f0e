//! Deterministic in-memory chain implementing [`ChainClient`].
//!
//! Models just enough of the token, factory, pair, router and oracle
//! contracts to drive the bootstrap workflow end to end: allowances with
//! optional zero-reset enforcement, a factory registry that can point at
//! addresses with no code (phantom pairs), first-mint and proportional-mint
//! share accounting, router deadlines and slippage bounds, and an oracle with
//! a minimum-liquidity threshold. Every submitted call is recorded so tests
//! can assert which transactions were (not) issued.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::domain::{CanonicalPair, TxId};
use crate::error::ChainError;
use crate::port::{AddLiquidity, AddLiquidityNative, ChainClient, Reserves, TransferLog, TxReceipt};

/// Shares permanently locked on the first mint.
pub const MINIMUM_LIQUIDITY: u64 = 1_000;

/// Kind of state-changing call, used for fault injection and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimCall {
    Approve,
    CreatePair,
    AddLiquidity,
    AddLiquidityNative,
    Sync,
    AddOraclePair,
}

/// A transaction the simulated chain included (successful or reverted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimTx {
    pub tx_id: TxId,
    pub call: SimCall,
    /// Contract the call targeted (token for approvals, pair otherwise).
    pub target: Address,
    /// Amount argument for approvals.
    pub amount: Option<U256>,
    pub reverted: bool,
}

#[derive(Debug, Default)]
struct SimToken {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    requires_zero_reset: bool,
}

#[derive(Debug)]
struct SimPair {
    token0: Address,
    token1: Address,
    reserve0: U256,
    reserve1: U256,
    total_supply: U256,
}

#[derive(Debug, Default)]
struct SimState {
    tokens: HashMap<Address, SimToken>,
    native: HashMap<Address, U256>,
    registry: HashMap<CanonicalPair, Address>,
    pairs: HashMap<Address, SimPair>,
    oracle_supported: HashSet<Address>,
    oracle_min_liquidity: U256,
    failures: HashMap<SimCall, VecDeque<String>>,
    transactions: Vec<SimTx>,
    wrapped_native: Option<Address>,
    clock_offset_secs: i64,
    next_tx: u64,
    next_pair: u64,
}

impl SimState {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(self.clock_offset_secs)
    }

    fn record(&mut self, call: SimCall, target: Address, amount: Option<U256>, reverted: bool) -> TxId {
        self.next_tx += 1;
        let tx_id = TxId::new(B256::left_padding_from(&self.next_tx.to_be_bytes()));
        self.transactions.push(SimTx {
            tx_id,
            call,
            target,
            amount,
            reverted,
        });
        tx_id
    }

    fn revert(&mut self, call: SimCall, target: Address, reason: impl Into<String>) -> ChainError {
        let tx_id = self.record(call, target, None, true);
        ChainError::Reverted {
            tx_id: Some(tx_id),
            reason: reason.into(),
        }
    }

    fn take_failure(&mut self, call: SimCall) -> Option<String> {
        self.failures.get_mut(&call).and_then(VecDeque::pop_front)
    }

    fn deploy_pair(&mut self, canonical: CanonicalPair) -> Address {
        self.next_pair += 1;
        let seed = 0xfeed_0000_0000u64 + self.next_pair;
        let address = Address::left_padding_from(&seed.to_be_bytes());
        self.registry.insert(canonical, address);
        self.pairs.insert(
            address,
            SimPair {
                token0: canonical.token0(),
                token1: canonical.token1(),
                reserve0: U256::ZERO,
                reserve1: U256::ZERO,
                total_supply: U256::ZERO,
            },
        );
        address
    }

    fn token_balance(&self, token: Address, owner: Address) -> U256 {
        self.tokens
            .get(&token)
            .and_then(|t| t.balances.get(&owner).copied())
            .unwrap_or_default()
    }

    fn token_allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.tokens
            .get(&token)
            .and_then(|t| t.allowances.get(&(owner, spender)).copied())
            .unwrap_or_default()
    }

    fn can_pull(&self, token: Address, owner: Address, spender: Address, amount: U256) -> bool {
        self.token_balance(token, owner) >= amount
            && self.token_allowance(token, owner, spender) >= amount
    }

    fn pull(&mut self, token: Address, owner: Address, spender: Address, to: Address, amount: U256) {
        let entry = self.tokens.entry(token).or_default();
        let allowance = entry.allowances.entry((owner, spender)).or_default();
        *allowance = allowance.saturating_sub(amount);
        let from = entry.balances.entry(owner).or_default();
        *from = from.saturating_sub(amount);
        let dest = entry.balances.entry(to).or_default();
        *dest = dest.saturating_add(amount);
    }

    /// Router quote: optimal amounts for the current reserve ratio.
    #[allow(clippy::too_many_arguments)]
    fn quote(
        &self,
        pair: &SimPair,
        token_a: Address,
        a_desired: U256,
        b_desired: U256,
        a_min: U256,
        b_min: U256,
    ) -> Result<(U256, U256), String> {
        let (reserve_a, reserve_b) = if token_a == pair.token0 {
            (pair.reserve0, pair.reserve1)
        } else {
            (pair.reserve1, pair.reserve0)
        };
        if reserve_a.is_zero() || reserve_b.is_zero() {
            return Ok((a_desired, b_desired));
        }
        let b_optimal = a_desired.saturating_mul(reserve_b) / reserve_a;
        if b_optimal <= b_desired {
            if b_optimal < b_min {
                return Err("UniswapV2Router: INSUFFICIENT_B_AMOUNT".to_string());
            }
            return Ok((a_desired, b_optimal));
        }
        let a_optimal = b_desired.saturating_mul(reserve_a) / reserve_b;
        if a_optimal < a_min {
            return Err("UniswapV2Router: INSUFFICIENT_A_AMOUNT".to_string());
        }
        Ok((a_optimal, b_desired))
    }

    /// Shares minted for depositing `amount0`/`amount1` into `pair`.
    fn shares_for(pair: &SimPair, amount0: U256, amount1: U256) -> Result<(U256, bool), String> {
        let minimum = U256::from(MINIMUM_LIQUIDITY);
        if pair.total_supply.is_zero() || pair.reserve0.is_zero() || pair.reserve1.is_zero() {
            let root = isqrt(amount0.saturating_mul(amount1));
            if root <= minimum {
                return Err("UniswapV2: INSUFFICIENT_LIQUIDITY_MINTED".to_string());
            }
            return Ok((root - minimum, true));
        }
        let by0 = amount0.saturating_mul(pair.total_supply) / pair.reserve0;
        let by1 = amount1.saturating_mul(pair.total_supply) / pair.reserve1;
        let shares = by0.min(by1);
        if shares.is_zero() {
            return Err("UniswapV2: INSUFFICIENT_LIQUIDITY_MINTED".to_string());
        }
        Ok((shares, false))
    }
}

/// Integer square root (floor).
fn isqrt(n: U256) -> U256 {
    let two = U256::from(2u64);
    if n < two {
        return n;
    }
    let mut x = n;
    let mut y = n / two + n % two;
    while y < x {
        x = y;
        y = (x + n / x) / two;
    }
    x
}

/// A paused submission: the next call of one kind blocks until released.
#[derive(Debug, Default)]
pub struct CallHold {
    reached: Notify,
    release: Notify,
}

impl CallHold {
    /// Wait until the held call has been submitted.
    pub async fn reached(&self) {
        self.reached.notified().await;
    }

    /// Let the held call execute.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// In-memory [`ChainClient`] for one sending account.
pub struct SimulatedChain {
    sender: Address,
    state: Mutex<SimState>,
    holds: Mutex<HashMap<SimCall, Arc<CallHold>>>,
}

impl SimulatedChain {
    /// Create an empty chain whose transactions are sent by `sender`.
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            state: Mutex::new(SimState::default()),
            holds: Mutex::new(HashMap::new()),
        }
    }

    /// Pause the next `call` before it executes. One-shot.
    pub fn hold(&self, call: SimCall) -> Arc<CallHold> {
        let hold = Arc::new(CallHold::default());
        self.holds.lock().insert(call, hold.clone());
        hold
    }

    async fn pass_hold(&self, call: SimCall) {
        let hold = self.holds.lock().remove(&call);
        if let Some(hold) = hold {
            hold.reached.notify_one();
            hold.release.notified().await;
        }
    }

    /// Register a token contract.
    pub fn add_token(&self, token: Address, requires_zero_reset: bool) {
        let mut state = self.state.lock();
        let entry = state.tokens.entry(token).or_default();
        entry.requires_zero_reset = requires_zero_reset;
    }

    /// Register the wrapped native-asset token used by `addLiquidityNative`.
    pub fn set_wrapped_native(&self, token: Address) {
        let mut state = self.state.lock();
        state.tokens.entry(token).or_default();
        state.wrapped_native = Some(token);
    }

    pub fn mint(&self, token: Address, owner: Address, amount: U256) {
        let mut state = self.state.lock();
        let balance = state
            .tokens
            .entry(token)
            .or_default()
            .balances
            .entry(owner)
            .or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn set_native_balance(&self, owner: Address, amount: U256) {
        self.state.lock().native.insert(owner, amount);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state
            .lock()
            .tokens
            .entry(token)
            .or_default()
            .allowances
            .insert((owner, spender), amount);
    }

    /// Deploy and register a pair contract with empty reserves.
    pub fn deploy_pair(&self, token_a: Address, token_b: Address) -> Address {
        let canonical = canonical(token_a, token_b);
        self.state.lock().deploy_pair(canonical)
    }

    /// Overwrite reserves (canonical order) and share supply of a deployed pair.
    pub fn seed_reserves(&self, pair: Address, reserve0: U256, reserve1: U256, total_supply: U256) {
        if let Some(p) = self.state.lock().pairs.get_mut(&pair) {
            p.reserve0 = reserve0;
            p.reserve1 = reserve1;
            p.total_supply = total_supply;
        }
    }

    /// Register a factory entry pointing at an address with no code.
    pub fn register_phantom(&self, token_a: Address, token_b: Address) -> Address {
        let mut state = self.state.lock();
        state.next_pair += 1;
        let seed = 0xdead_0000_0000u64 + state.next_pair;
        let address = Address::left_padding_from(&seed.to_be_bytes());
        state.registry.insert(canonical(token_a, token_b), address);
        address
    }

    pub fn set_oracle_support(&self, pair: Address) {
        self.state.lock().oracle_supported.insert(pair);
    }

    pub fn set_oracle_min_liquidity(&self, minimum: U256) {
        self.state.lock().oracle_min_liquidity = minimum;
    }

    /// Make the next `call` revert with `reason` (queued, consumed in order).
    pub fn fail_next(&self, call: SimCall, reason: impl Into<String>) {
        self.state
            .lock()
            .failures
            .entry(call)
            .or_default()
            .push_back(reason.into());
    }

    /// Move the chain clock relative to wall-clock time.
    pub fn advance_clock(&self, by: Duration) {
        self.state.lock().clock_offset_secs += by.num_seconds();
    }

    pub fn transactions(&self) -> Vec<SimTx> {
        self.state.lock().transactions.clone()
    }

    pub fn transactions_of(&self, call: SimCall) -> Vec<SimTx> {
        self.state
            .lock()
            .transactions
            .iter()
            .filter(|tx| tx.call == call)
            .cloned()
            .collect()
    }

    pub fn allowance_of(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state.lock().token_allowance(token, owner, spender)
    }

    pub fn pair_for(&self, token_a: Address, token_b: Address) -> Option<Address> {
        self.state
            .lock()
            .registry
            .get(&canonical(token_a, token_b))
            .copied()
    }

    /// Reserves in canonical order.
    pub fn reserves_of(&self, pair: Address) -> Option<(U256, U256)> {
        self.state
            .lock()
            .pairs
            .get(&pair)
            .map(|p| (p.reserve0, p.reserve1))
    }

    pub fn is_oracle_supported(&self, pair: Address) -> bool {
        self.state.lock().oracle_supported.contains(&pair)
    }

    fn deposit(
        &self,
        state: &mut SimState,
        call_kind: SimCall,
        router: Address,
        to: Address,
        key: CanonicalPair,
        sides: [(Address, U256, bool); 2],
    ) -> Result<TxReceipt, ChainError> {
        let pair_address = match state.registry.get(&key) {
            Some(address) => *address,
            None => state.deploy_pair(key),
        };
        let Some(pair) = state.pairs.get(&pair_address) else {
            return Err(state.revert(call_kind, pair_address, "call to non-contract account"));
        };

        let (amount0, amount1) = if sides[0].0 == pair.token0 {
            (sides[0].1, sides[1].1)
        } else {
            (sides[1].1, sides[0].1)
        };
        let (shares, first_mint) = match SimState::shares_for(pair, amount0, amount1) {
            Ok(minted) => minted,
            Err(reason) => return Err(state.revert(call_kind, pair_address, reason)),
        };

        let mut transfers = Vec::new();
        for (token, amount, native) in sides {
            if native {
                let balance = state.native.entry(self.sender).or_default();
                *balance = balance.saturating_sub(amount);
                let entry = state.tokens.entry(token).or_default();
                let held = entry.balances.entry(pair_address).or_default();
                *held = held.saturating_add(amount);
            } else {
                state.pull(token, self.sender, router, pair_address, amount);
            }
            transfers.push(TransferLog {
                emitter: token,
                from: self.sender,
                to: pair_address,
                value: amount,
            });
        }

        if first_mint {
            transfers.push(TransferLog {
                emitter: pair_address,
                from: Address::ZERO,
                to: Address::ZERO,
                value: U256::from(MINIMUM_LIQUIDITY),
            });
        }
        transfers.push(TransferLog {
            emitter: pair_address,
            from: Address::ZERO,
            to,
            value: shares,
        });

        if let Some(pair) = state.pairs.get_mut(&pair_address) {
            pair.reserve0 = pair.reserve0.saturating_add(amount0);
            pair.reserve1 = pair.reserve1.saturating_add(amount1);
            let locked = if first_mint {
                U256::from(MINIMUM_LIQUIDITY)
            } else {
                U256::ZERO
            };
            pair.total_supply = pair.total_supply.saturating_add(shares).saturating_add(locked);
        }

        let tx_id = state.record(call_kind, pair_address, None, false);
        Ok(TxReceipt {
            tx_id,
            block_number: Some(state.next_tx),
            transfers,
        })
    }
}

/// Canonical key for setup helpers; identical tokens are a broken fixture.
fn canonical(a: Address, b: Address) -> CanonicalPair {
    match CanonicalPair::new(a, b) {
        Ok(pair) => pair,
        Err(e) => panic!("invalid simulated pair: {e}"),
    }
}

fn receipt(tx_id: TxId, block: u64) -> TxReceipt {
    TxReceipt {
        tx_id,
        block_number: Some(block),
        transfers: Vec::new(),
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn code_at(&self, address: Address) -> Result<Vec<u8>, ChainError> {
        let state = self.state.lock();
        if state.pairs.contains_key(&address) || state.tokens.contains_key(&address) {
            Ok(vec![0x60, 0x80, 0x60, 0x40])
        } else {
            Ok(Vec::new())
        }
    }

    async fn native_balance(&self, owner: Address) -> Result<U256, ChainError> {
        Ok(self.state.lock().native.get(&owner).copied().unwrap_or_default())
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        Ok(self.state.lock().token_balance(token, owner))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        Ok(self.state.lock().token_allowance(token, owner, spender))
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxReceipt, ChainError> {
        self.pass_hold(SimCall::Approve).await;
        let mut state = self.state.lock();
        if let Some(reason) = state.take_failure(SimCall::Approve) {
            return Err(state.revert(SimCall::Approve, token, reason));
        }
        let owner = self.sender;
        let current = state.token_allowance(token, owner, spender);
        let zero_reset = state
            .tokens
            .get(&token)
            .map(|t| t.requires_zero_reset)
            .unwrap_or(false);
        if zero_reset && !current.is_zero() && !amount.is_zero() {
            return Err(state.revert(
                SimCall::Approve,
                token,
                "approve from non-zero to non-zero allowance",
            ));
        }
        state
            .tokens
            .entry(token)
            .or_default()
            .allowances
            .insert((owner, spender), amount);
        let tx_id = state.record(SimCall::Approve, token, Some(amount), false);
        Ok(receipt(tx_id, state.next_tx))
    }

    async fn get_pair(
        &self,
        _factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Address, ChainError> {
        let key = CanonicalPair::new(token_a, token_b)
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(self
            .state
            .lock()
            .registry
            .get(&key)
            .copied()
            .unwrap_or(Address::ZERO))
    }

    async fn create_pair(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<TxReceipt, ChainError> {
        self.pass_hold(SimCall::CreatePair).await;
        let mut state = self.state.lock();
        if let Some(reason) = state.take_failure(SimCall::CreatePair) {
            return Err(state.revert(SimCall::CreatePair, factory, reason));
        }
        let Ok(key) = CanonicalPair::new(token_a, token_b) else {
            return Err(state.revert(SimCall::CreatePair, factory, "UniswapV2: IDENTICAL_ADDRESSES"));
        };
        if state.registry.contains_key(&key) {
            return Err(state.revert(SimCall::CreatePair, factory, "UniswapV2: PAIR_EXISTS"));
        }
        let pair = state.deploy_pair(key);
        let tx_id = state.record(SimCall::CreatePair, pair, None, false);
        Ok(receipt(tx_id, state.next_tx))
    }

    async fn pair_tokens(&self, pair: Address) -> Result<(Address, Address), ChainError> {
        self.state
            .lock()
            .pairs
            .get(&pair)
            .map(|p| (p.token0, p.token1))
            .ok_or_else(|| ChainError::Rpc(format!("no contract code at {pair}")))
    }

    async fn get_reserves(&self, pair: Address) -> Result<Reserves, ChainError> {
        self.state
            .lock()
            .pairs
            .get(&pair)
            .map(|p| Reserves {
                reserve0: p.reserve0,
                reserve1: p.reserve1,
                block_timestamp_last: 0,
            })
            .ok_or_else(|| ChainError::Rpc(format!("no contract code at {pair}")))
    }

    async fn total_supply(&self, pair: Address) -> Result<U256, ChainError> {
        self.state
            .lock()
            .pairs
            .get(&pair)
            .map(|p| p.total_supply)
            .ok_or_else(|| ChainError::Rpc(format!("no contract code at {pair}")))
    }

    async fn sync(&self, pair: Address) -> Result<TxReceipt, ChainError> {
        self.pass_hold(SimCall::Sync).await;
        let mut state = self.state.lock();
        if let Some(reason) = state.take_failure(SimCall::Sync) {
            return Err(state.revert(SimCall::Sync, pair, reason));
        }
        if !state.pairs.contains_key(&pair) {
            return Err(state.revert(SimCall::Sync, pair, "call to non-contract account"));
        }
        let tx_id = state.record(SimCall::Sync, pair, None, false);
        Ok(receipt(tx_id, state.next_tx))
    }

    async fn add_liquidity(
        &self,
        router: Address,
        call: &AddLiquidity,
    ) -> Result<TxReceipt, ChainError> {
        self.pass_hold(SimCall::AddLiquidity).await;
        let mut state = self.state.lock();
        let Ok(key) = CanonicalPair::new(call.token_a, call.token_b) else {
            return Err(state.revert(SimCall::AddLiquidity, router, "UniswapV2Library: IDENTICAL_ADDRESSES"));
        };
        let target = state.registry.get(&key).copied().unwrap_or(router);
        if let Some(reason) = state.take_failure(SimCall::AddLiquidity) {
            return Err(state.revert(SimCall::AddLiquidity, target, reason));
        }
        if call.deadline < state.now() {
            return Err(state.revert(SimCall::AddLiquidity, target, "UniswapV2Router: EXPIRED"));
        }

        let quoted = match state.pairs.get(&target) {
            Some(pair) => state.quote(
                pair,
                call.token_a,
                call.amount_a_desired,
                call.amount_b_desired,
                call.amount_a_min,
                call.amount_b_min,
            ),
            None => Ok((call.amount_a_desired, call.amount_b_desired)),
        };
        let (amount_a, amount_b) = match quoted {
            Ok(amounts) => amounts,
            Err(reason) => return Err(state.revert(SimCall::AddLiquidity, target, reason)),
        };
        if !state.can_pull(call.token_a, self.sender, router, amount_a)
            || !state.can_pull(call.token_b, self.sender, router, amount_b)
        {
            return Err(state.revert(
                SimCall::AddLiquidity,
                target,
                "TransferHelper: TRANSFER_FROM_FAILED",
            ));
        }

        self.deposit(
            &mut state,
            SimCall::AddLiquidity,
            router,
            call.to,
            key,
            [
                (call.token_a, amount_a, false),
                (call.token_b, amount_b, false),
            ],
        )
    }

    async fn add_liquidity_native(
        &self,
        router: Address,
        call: &AddLiquidityNative,
    ) -> Result<TxReceipt, ChainError> {
        self.pass_hold(SimCall::AddLiquidityNative).await;
        let mut state = self.state.lock();
        let Some(wrapped) = state.wrapped_native else {
            return Err(state.revert(SimCall::AddLiquidityNative, router, "no wrapped native token"));
        };
        let Ok(key) = CanonicalPair::new(call.token, wrapped) else {
            return Err(state.revert(SimCall::AddLiquidityNative, router, "UniswapV2Library: IDENTICAL_ADDRESSES"));
        };
        let target = state.registry.get(&key).copied().unwrap_or(router);
        if let Some(reason) = state.take_failure(SimCall::AddLiquidityNative) {
            return Err(state.revert(SimCall::AddLiquidityNative, target, reason));
        }
        if call.deadline < state.now() {
            return Err(state.revert(
                SimCall::AddLiquidityNative,
                target,
                "UniswapV2Router: EXPIRED",
            ));
        }

        let quoted = match state.pairs.get(&target) {
            Some(pair) => state.quote(
                pair,
                call.token,
                call.amount_token_desired,
                call.value,
                call.amount_token_min,
                call.amount_native_min,
            ),
            None => Ok((call.amount_token_desired, call.value)),
        };
        let (amount_token, amount_native) = match quoted {
            Ok(amounts) => amounts,
            Err(reason) => return Err(state.revert(SimCall::AddLiquidityNative, target, reason)),
        };
        let native_balance = state.native.get(&self.sender).copied().unwrap_or_default();
        if native_balance < call.value
            || !state.can_pull(call.token, self.sender, router, amount_token)
        {
            return Err(state.revert(
                SimCall::AddLiquidityNative,
                target,
                "TransferHelper: TRANSFER_FROM_FAILED",
            ));
        }

        self.deposit(
            &mut state,
            SimCall::AddLiquidityNative,
            router,
            call.to,
            key,
            [(call.token, amount_token, false), (wrapped, amount_native, true)],
        )
    }

    async fn is_pair_supported(&self, _oracle: Address, pair: Address) -> Result<bool, ChainError> {
        Ok(self.state.lock().oracle_supported.contains(&pair))
    }

    async fn add_oracle_pair(
        &self,
        _oracle: Address,
        pair: Address,
        token0: Address,
        token1: Address,
    ) -> Result<TxReceipt, ChainError> {
        self.pass_hold(SimCall::AddOraclePair).await;
        let mut state = self.state.lock();
        if let Some(reason) = state.take_failure(SimCall::AddOraclePair) {
            return Err(state.revert(SimCall::AddOraclePair, pair, reason));
        }
        if state.oracle_supported.contains(&pair) {
            return Err(state.revert(SimCall::AddOraclePair, pair, "Oracle: PAIR_EXISTS"));
        }
        let Some((stored0, stored1, reserve0, reserve1)) = state
            .pairs
            .get(&pair)
            .map(|p| (p.token0, p.token1, p.reserve0, p.reserve1))
        else {
            return Err(state.revert(SimCall::AddOraclePair, pair, "Oracle: INVALID_PAIR"));
        };
        if stored0 != token0 || stored1 != token1 {
            return Err(state.revert(SimCall::AddOraclePair, pair, "Oracle: INVALID_TOKEN_ORDER"));
        }
        let minimum = state.oracle_min_liquidity;
        if reserve0 < minimum || reserve1 < minimum {
            return Err(state.revert(
                SimCall::AddOraclePair,
                pair,
                "Oracle: INSUFFICIENT_LIQUIDITY",
            ));
        }
        state.oracle_supported.insert(pair);
        let tx_id = state.record(SimCall::AddOraclePair, pair, None, false);
        Ok(receipt(tx_id, state.next_tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isqrt_floors() {
        assert_eq!(isqrt(U256::from(0u64)), U256::from(0u64));
        assert_eq!(isqrt(U256::from(2u64)), U256::from(1u64));
        assert_eq!(isqrt(U256::from(16u64)), U256::from(4u64));
        assert_eq!(isqrt(U256::from(30_000u64)), U256::from(173u64));
    }

    #[tokio::test]
    async fn zero_reset_token_rejects_direct_change() {
        let me = Address::repeat_byte(0x01);
        let token = Address::repeat_byte(0xaa);
        let spender = Address::repeat_byte(0x0f);
        let chain = SimulatedChain::new(me);
        chain.add_token(token, true);
        chain.set_allowance(token, me, spender, U256::from(5u64));

        let err = chain.approve(token, spender, U256::from(10u64)).await.unwrap_err();
        assert!(err.tx_id().is_some());
        chain.approve(token, spender, U256::ZERO).await.unwrap();
        chain.approve(token, spender, U256::from(10u64)).await.unwrap();
        assert_eq!(chain.allowance_of(token, me, spender), U256::from(10u64));
    }

    #[tokio::test]
    async fn first_deposit_locks_minimum_liquidity() {
        let me = Address::repeat_byte(0x01);
        let router = Address::repeat_byte(0x0f);
        let a = Address::repeat_byte(0xaa);
        let b = Address::repeat_byte(0xbb);
        let chain = SimulatedChain::new(me);
        for token in [a, b] {
            chain.add_token(token, false);
            chain.mint(token, me, U256::from(1_000_000u64));
            chain.set_allowance(token, me, router, U256::from(1_000_000u64));
        }
        let pair = chain.deploy_pair(a, b);

        let call = AddLiquidity {
            token_a: b,
            token_b: a,
            amount_a_desired: U256::from(40_000u64),
            amount_b_desired: U256::from(10_000u64),
            amount_a_min: U256::ZERO,
            amount_b_min: U256::ZERO,
            to: me,
            deadline: Utc::now() + Duration::minutes(5),
        };
        let receipt = chain.add_liquidity(router, &call).await.unwrap();

        // sqrt(40_000 * 10_000) = 20_000, minus the locked minimum
        assert_eq!(receipt.minted_to(pair, me), Some(U256::from(19_000u64)));
        assert_eq!(
            chain.reserves_of(pair),
            Some((U256::from(10_000u64), U256::from(40_000u64)))
        );
    }
}
