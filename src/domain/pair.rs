//! Pair specifications, canonical ordering and on-chain pair records.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::ids::PairId;
use super::token::{TokenAmount, TokenMeta, BPS_DENOMINATOR};

/// Side of a caller-ordered pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

/// Unordered token pair stored in on-chain order (`token0 < token1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalPair {
    token0: Address,
    token1: Address,
}

impl CanonicalPair {
    /// Sort two distinct tokens into canonical order.
    pub fn new(a: Address, b: Address) -> Result<Self, DomainError> {
        if a == b {
            return Err(DomainError::IdenticalTokens { token: a });
        }
        let (token0, token1) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { token0, token1 })
    }

    pub const fn token0(&self) -> Address {
        self.token0
    }

    pub const fn token1(&self) -> Address {
        self.token1
    }

    /// True when `{a, b}` is the same unordered set.
    pub fn matches(&self, a: Address, b: Address) -> bool {
        Self::new(a, b).map(|other| other == *self).unwrap_or(false)
    }
}

/// Everything needed to bootstrap one pool.
///
/// Built with [`PairSpec::try_new`], which enforces distinct tokens, slippage
/// below 100% and a future deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairSpec {
    id: PairId,
    token_a: TokenMeta,
    token_b: TokenMeta,
    amount_a: TokenAmount,
    amount_b: TokenAmount,
    slippage_bps: u16,
    deadline: DateTime<Utc>,
    native: Option<Side>,
}

impl PairSpec {
    /// Validate and build a pair spec. `now` is the reference wall-clock time.
    #[allow(clippy::too_many_arguments)]
    pub fn try_new(
        token_a: TokenMeta,
        token_b: TokenMeta,
        desired_a: U256,
        desired_b: U256,
        slippage_bps: u32,
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if token_a.address == token_b.address {
            return Err(DomainError::IdenticalTokens {
                token: token_a.address,
            });
        }
        if slippage_bps >= BPS_DENOMINATOR {
            return Err(DomainError::SlippageOutOfRange { bps: slippage_bps });
        }
        if deadline <= now {
            return Err(DomainError::DeadlineInPast {
                deadline: deadline.timestamp(),
            });
        }

        let id = PairId::new(format!("{}/{}", token_a.symbol, token_b.symbol));
        let amount_a = token_a.amount(desired_a);
        let amount_b = token_b.amount(desired_b);

        Ok(Self {
            id,
            token_a,
            token_b,
            amount_a,
            amount_b,
            // Bounded by the check above.
            slippage_bps: slippage_bps as u16,
            deadline,
            native: None,
        })
    }

    /// Override the ledger key (defaults to `SYMA/SYMB`).
    #[must_use]
    pub fn with_id(mut self, id: impl Into<PairId>) -> Self {
        self.id = id.into();
        self
    }

    /// Fund `side` with the chain's native asset instead of its wrapped token.
    #[must_use]
    pub fn with_native(mut self, side: Side) -> Self {
        self.native = Some(side);
        self
    }

    pub fn id(&self) -> &PairId {
        &self.id
    }

    pub fn token_a(&self) -> &TokenMeta {
        &self.token_a
    }

    pub fn token_b(&self) -> &TokenMeta {
        &self.token_b
    }

    pub fn token(&self, side: Side) -> &TokenMeta {
        match side {
            Side::A => &self.token_a,
            Side::B => &self.token_b,
        }
    }

    pub fn amount_a(&self) -> TokenAmount {
        self.amount_a
    }

    pub fn amount_b(&self) -> TokenAmount {
        self.amount_b
    }

    pub fn amount(&self, side: Side) -> TokenAmount {
        match side {
            Side::A => self.amount_a,
            Side::B => self.amount_b,
        }
    }

    pub fn slippage_bps(&self) -> u16 {
        self.slippage_bps
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn native(&self) -> Option<Side> {
        self.native
    }

    pub fn is_native(&self, side: Side) -> bool {
        self.native == Some(side)
    }

    /// Canonical order of the two tokens.
    pub fn canonical(&self) -> CanonicalPair {
        // Distinct tokens are guaranteed by `try_new`.
        let (token0, token1) = if self.token_a.address < self.token_b.address {
            (self.token_a.address, self.token_b.address)
        } else {
            (self.token_b.address, self.token_a.address)
        };
        CanonicalPair { token0, token1 }
    }

    /// Slippage-bounded minimums `(amountAMin, amountBMin)`.
    pub fn min_amounts(&self) -> (TokenAmount, TokenAmount) {
        (
            self.amount_a.min_with_slippage(self.slippage_bps),
            self.amount_b.min_with_slippage(self.slippage_bps),
        )
    }
}

/// On-chain view of a resolved pool contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRecord {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub has_deployed_code: bool,
    pub reserve0: U256,
    pub reserve1: U256,
    pub total_shares: U256,
}

impl PairRecord {
    /// Canonical pair as read from the pair contract itself.
    pub fn canonical(&self) -> Result<CanonicalPair, DomainError> {
        CanonicalPair::new(self.token0, self.token1)
    }

    /// Both reserves at or above `minimum`.
    pub fn meets_minimum(&self, minimum: U256) -> bool {
        self.reserve0 >= minimum && self.reserve1 >= minimum
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn meta(symbol: &str, byte: u8) -> TokenMeta {
        TokenMeta {
            symbol: symbol.to_string(),
            address: Address::repeat_byte(byte),
            decimals: 18,
            requires_zero_reset: false,
        }
    }

    fn spec(slippage: u32) -> Result<PairSpec, DomainError> {
        let now = Utc::now();
        PairSpec::try_new(
            meta("BBB", 0xbb),
            meta("AAA", 0xaa),
            U256::from(100u64),
            U256::from(300u64),
            slippage,
            now + Duration::minutes(20),
            now,
        )
    }

    #[test]
    fn canonical_sorts_regardless_of_input_order() {
        let low = Address::repeat_byte(0x01);
        let high = Address::repeat_byte(0xfe);
        let forward = CanonicalPair::new(low, high).unwrap();
        let reverse = CanonicalPair::new(high, low).unwrap();
        assert_eq!(forward, reverse);
        assert_eq!(forward.token0(), low);
        assert!(forward.token0() < forward.token1());
        assert!(forward.matches(high, low));
    }

    #[test]
    fn canonical_rejects_identical_tokens() {
        let t = Address::repeat_byte(0x05);
        assert_eq!(
            CanonicalPair::new(t, t),
            Err(DomainError::IdenticalTokens { token: t })
        );
    }

    #[test]
    fn spec_canonical_orders_reversed_input() {
        let spec = spec(100).unwrap();
        let canonical = spec.canonical();
        assert_eq!(canonical.token0(), Address::repeat_byte(0xaa));
        assert_eq!(canonical.token1(), Address::repeat_byte(0xbb));
        assert_eq!(spec.id().as_str(), "BBB/AAA");
    }

    #[test]
    fn spec_min_amounts_apply_slippage() {
        let (min_a, min_b) = spec(100).unwrap().min_amounts();
        assert_eq!(min_a.raw(), U256::from(99u64));
        assert_eq!(min_b.raw(), U256::from(297u64));

        let (exact_a, exact_b) = spec(0).unwrap().min_amounts();
        assert_eq!(exact_a.raw(), U256::from(100u64));
        assert_eq!(exact_b.raw(), U256::from(300u64));
    }

    #[test]
    fn spec_rejects_invalid_inputs() {
        assert_eq!(
            spec(10_000).unwrap_err(),
            DomainError::SlippageOutOfRange { bps: 10_000 }
        );

        let now = Utc::now();
        let past = PairSpec::try_new(
            meta("AAA", 0xaa),
            meta("BBB", 0xbb),
            U256::from(1u64),
            U256::from(1u64),
            0,
            now - Duration::seconds(1),
            now,
        );
        assert!(matches!(past, Err(DomainError::DeadlineInPast { .. })));

        let same = PairSpec::try_new(
            meta("AAA", 0xaa),
            meta("AAA", 0xaa),
            U256::from(1u64),
            U256::from(1u64),
            0,
            now + Duration::seconds(60),
            now,
        );
        assert!(matches!(same, Err(DomainError::IdenticalTokens { .. })));
    }

    #[test]
    fn record_minimum_requires_both_reserves() {
        let record = PairRecord {
            address: Address::repeat_byte(0x99),
            token0: Address::repeat_byte(0xaa),
            token1: Address::repeat_byte(0xbb),
            has_deployed_code: true,
            reserve0: U256::from(1_000u64),
            reserve1: U256::from(10u64),
            total_shares: U256::ZERO,
        };
        assert!(!record.meets_minimum(U256::from(100u64)));
        assert!(record.meets_minimum(U256::from(10u64)));
    }
}
