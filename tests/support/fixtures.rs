use std::sync::Arc;

use alloy_primitives::{Address, U256};
use chrono::{Duration, Utc};
use seedpool::adapter::simulated::SimulatedChain;
use seedpool::app::{WorkflowOptions, WorkflowOrchestrator};
use seedpool::domain::{PairSpec, Side, TokenMeta};
use seedpool::port::Deployment;

pub const ME: Address = Address::repeat_byte(0x01);
pub const OTHER: Address = Address::repeat_byte(0x02);
pub const FACTORY: Address = Address::repeat_byte(0xfa);
pub const ROUTER: Address = Address::repeat_byte(0x0f);
pub const ORACLE: Address = Address::repeat_byte(0x0c);
pub const WRAPPED: Address = Address::repeat_byte(0x77);

pub fn deployment() -> Deployment {
    Deployment {
        factory: FACTORY,
        router: ROUTER,
        oracle: ORACLE,
        wrapped_native: Some(WRAPPED),
    }
}

pub fn token(symbol: &str, byte: u8) -> TokenMeta {
    TokenMeta {
        symbol: symbol.to_string(),
        address: Address::repeat_byte(byte),
        decimals: 18,
        requires_zero_reset: false,
    }
}

/// Whole tokens at 18 decimals.
pub fn units(whole: u64) -> U256 {
    U256::from(whole) * U256::from(10u64).pow(U256::from(18u64))
}

/// 100 A against 300 B with 1% slippage, twenty minutes to go.
pub fn spec(a: TokenMeta, b: TokenMeta) -> PairSpec {
    let now = Utc::now();
    PairSpec::try_new(a, b, units(100), units(300), 100, now + Duration::minutes(20), now).unwrap()
}

/// Chain holding enough of both sides of every spec for `owner`.
pub fn funded_chain(owner: Address, specs: &[&PairSpec]) -> Arc<SimulatedChain> {
    let chain = Arc::new(SimulatedChain::new(owner));
    for spec in specs {
        for side in [Side::A, Side::B] {
            let token = spec.token(side);
            if spec.is_native(side) {
                chain.set_wrapped_native(token.address);
                chain.set_native_balance(owner, spec.amount(side).raw());
            } else {
                chain.add_token(token.address, token.requires_zero_reset);
                chain.mint(token.address, owner, spec.amount(side).raw());
            }
        }
    }
    chain
}

pub fn orchestrator(chain: &Arc<SimulatedChain>, options: WorkflowOptions) -> WorkflowOrchestrator {
    WorkflowOrchestrator::new(chain.clone(), deployment(), options)
}
