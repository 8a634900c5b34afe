//! Concentrated liquidity fixed-point math.
//!
//! Reproduces the AMM contract's tick and amount arithmetic exactly using
//! arbitrary-precision integers and rationals. Floating point is never used.

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use thiserror::Error;

/// Lowest tick the protocol allows.
pub const MIN_TICK: i32 = -887272;

/// Highest tick the protocol allows.
pub const MAX_TICK: i32 = 887272;

/// `sqrt(1.0001^-1)` in Q128.128, used to square down through the tick bits.
const RATIO_STEP: u128 = 0xfff97272373d413259a46990580e213a;

/// Starting accumulator for odd ticks.
const RATIO_ODD_START: u128 = 0xfffcb933bd6fad37aa2d162d1a594001;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("tick {0} outside [{MIN_TICK}, {MAX_TICK}]")]
    TickOutOfRange(i32),
}

/// 2^96, the Q64.96 scale.
pub fn q96() -> BigUint {
    BigUint::one() << 96usize
}

/// Smallest sqrt ratio, at `MIN_TICK`.
pub fn min_sqrt_ratio() -> BigUint {
    BigUint::from(4295128739u64)
}

/// Largest sqrt ratio, at `MAX_TICK`.
pub fn max_sqrt_ratio() -> BigUint {
    BigUint::from_slice(&[
        0x63988d26, 0x5d951d52, 0x50648849, 0xefd1fc6a, 0xfffd8963,
    ])
}

/// Q64.96 square root of `1.0001^tick`.
///
/// Walks the bits of `|tick|`, squaring the step ratio each time and folding it
/// into the accumulator when the bit is set. Positive ticks are inverted, and
/// the Q128.128 result is narrowed to Q64.96 rounding up.
///
/// # Errors
/// Returns `MathError::TickOutOfRange` outside `[MIN_TICK, MAX_TICK]`.
pub fn sqrt_ratio_at_tick(tick: i32) -> Result<BigUint, MathError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(MathError::TickOutOfRange(tick));
    }

    let mut abs_tick = tick.unsigned_abs();
    let mut ratio = BigUint::from(RATIO_STEP);
    let mut res = if abs_tick & 1 != 0 {
        BigUint::from(RATIO_ODD_START)
    } else {
        BigUint::one() << 128usize
    };
    abs_tick >>= 1;

    while abs_tick != 0 {
        if abs_tick & 1 != 0 {
            res = (res * &ratio) >> 128usize;
        }
        ratio = (&ratio * &ratio) >> 128usize;
        abs_tick >>= 1;
    }

    if tick > 0 {
        let max = (BigUint::one() << 256usize) - BigUint::one();
        res = max / res;
    }

    let round_up = !(&res % (BigUint::one() << 32usize)).is_zero();
    res >>= 32usize;
    if round_up {
        res += BigUint::one();
    }
    Ok(res)
}

/// `sqrtRatioX96^2 / 2^192` as an exact rational.
pub fn price_at_sqrt_ratio(sqrt_ratio_x96: &BigUint) -> BigRational {
    let sqrt = BigInt::from(sqrt_ratio_x96.clone());
    BigRational::new(&sqrt * &sqrt, BigInt::one() << 192usize)
}

fn ordered<'a>(a: &'a BigUint, b: &'a BigUint) -> (&'a BigUint, &'a BigUint) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

/// Token0 held by `liquidity` between two sqrt ratios.
///
/// The numerator is integer-divided by the upper boundary before the final
/// exact division by the lower one, matching the contract's rounding.
pub fn amount0_for_liquidity(
    sqrt_ratio_a: Option<&BigUint>,
    sqrt_ratio_b: Option<&BigUint>,
    liquidity: Option<&BigUint>,
) -> BigRational {
    let (Some(a), Some(b), Some(liquidity)) = (sqrt_ratio_a, sqrt_ratio_b, liquidity) else {
        return BigRational::zero();
    };
    let (lower, upper) = ordered(a, b);
    if lower.is_zero() {
        return BigRational::zero();
    }
    let num = ((liquidity << 96usize) * (upper - lower)) / upper;
    BigRational::new(BigInt::from(num), BigInt::from(lower.clone()))
}

/// Token1 held by `liquidity` between two sqrt ratios.
pub fn amount1_for_liquidity(
    sqrt_ratio_a: Option<&BigUint>,
    sqrt_ratio_b: Option<&BigUint>,
    liquidity: Option<&BigUint>,
) -> BigRational {
    let (Some(a), Some(b), Some(liquidity)) = (sqrt_ratio_a, sqrt_ratio_b, liquidity) else {
        return BigRational::zero();
    };
    let (lower, upper) = ordered(a, b);
    BigRational::new(
        BigInt::from(liquidity * (upper - lower)),
        BigInt::from(q96()),
    )
}

/// Token amounts for a position given the pool's current sqrt ratio.
///
/// Below the range everything is token0, above it everything is token1, and
/// inside it the current price splits the range. Any absent operand yields
/// `(0, 0)`.
pub fn amounts_for_liquidity(
    current: Option<&BigUint>,
    sqrt_ratio_a: Option<&BigUint>,
    sqrt_ratio_b: Option<&BigUint>,
    liquidity: Option<&BigUint>,
) -> (BigRational, BigRational) {
    let (Some(current), Some(a), Some(b), Some(_)) = (current, sqrt_ratio_a, sqrt_ratio_b, liquidity)
    else {
        return (BigRational::zero(), BigRational::zero());
    };
    let (lower, upper) = ordered(a, b);

    if current <= lower {
        (
            amount0_for_liquidity(Some(lower), Some(upper), liquidity),
            BigRational::zero(),
        )
    } else if current < upper {
        (
            amount0_for_liquidity(Some(current), Some(upper), liquidity),
            amount1_for_liquidity(Some(lower), Some(current), liquidity),
        )
    } else {
        (
            BigRational::zero(),
            amount1_for_liquidity(Some(lower), Some(upper), liquidity),
        )
    }
}

/// `10^decimals` as a rational.
pub fn exponentiate_decimals(decimals: u32) -> BigRational {
    BigRational::from_integer(num_traits::pow(BigInt::from(10), decimals as usize))
}

/// Integer part of a rational, truncating toward zero.
pub fn truncate(value: &BigRational) -> BigInt {
    value.to_integer()
}

/// Render a rational with `places` fractional digits, truncating the rest.
pub fn format_ratio(value: &BigRational, places: usize) -> String {
    let abs = value.abs();
    let whole = abs.to_integer();
    let scale = num_traits::pow(BigInt::from(10), places);
    let frac = ((abs - BigRational::from_integer(whole.clone())) * BigRational::from_integer(scale))
        .to_integer();
    // Values that truncate to zero print unsigned.
    let sign = if value.is_negative() && !(whole.is_zero() && frac.is_zero()) {
        "-"
    } else {
        ""
    };
    if places == 0 {
        return format!("{}{}", sign, whole);
    }
    format!("{}{}.{:0>width$}", sign, whole, frac, width = places)
}
