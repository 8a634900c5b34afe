//! Pure computation for position valuation.

pub mod liquidity;

pub use liquidity::{
    amount0_for_liquidity, amount1_for_liquidity, amounts_for_liquidity, exponentiate_decimals,
    format_ratio, price_at_sqrt_ratio, sqrt_ratio_at_tick, truncate, MathError, MAX_TICK, MIN_TICK,
};
