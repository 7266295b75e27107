//! Shared integer helpers for allocation and vesting arithmetic.
//!
//! All division truncates toward zero so rounding can only ever
//! under-allocate. Intermediate products are widened to `u128`.

/// `a * b / d` with a widened intermediate. `None` if `d == 0` or the
/// result does not fit in a `u64`.
pub fn mul_div_floor(a: u64, b: u64, d: u64) -> Option<u64> {
    if d == 0 {
        return None;
    }
    let wide = (a as u128) * (b as u128) / (d as u128);
    u64::try_from(wide).ok()
}

/// `amount * percent / 100`, truncated.
pub fn mul_pct_floor(amount: u64, percent: u8) -> Option<u64> {
    mul_div_floor(amount, percent as u64, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_widens() {
        // u64::MAX * 50 / 100 overflows u64 in the intermediate product.
        assert_eq!(mul_div_floor(u64::MAX, 50, 100), Some(u64::MAX / 2));
        assert_eq!(mul_div_floor(10, 3, 4), Some(7));
        assert_eq!(mul_div_floor(1, 1, 0), None);
        assert_eq!(mul_div_floor(u64::MAX, 2, 1), None);
    }

    #[test]
    fn pct_truncates() {
        assert_eq!(mul_pct_floor(10_000, 20), Some(2_000));
        assert_eq!(mul_pct_floor(99, 1), Some(0));
        assert_eq!(mul_pct_floor(101, 99), Some(99));
        assert_eq!(mul_pct_floor(u64::MAX, 100), Some(u64::MAX));
    }
}
