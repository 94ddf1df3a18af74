//! Rounding of decoded physical values
//!
//! `raw * scale + offset` picks up binary noise (`0.1 * 3 = 0.30000000000000004`).
//! Decoded values are rounded to the decimals the scale and offset can
//! actually produce.

/// Upper bound on the decimals considered
const MAX_DECIMALS: u32 = 6;

/// Number of decimals needed to write `step` exactly (capped)
pub fn decimals(step: f64) -> u32 {
    let step = step.abs();
    if !step.is_finite() {
        return MAX_DECIMALS;
    }
    (0..MAX_DECIMALS)
        .find(|&d| {
            let shifted = step * 10_f64.powi(d as i32);
            (shifted - shifted.round()).abs() < 1e-9
        })
        .unwrap_or(MAX_DECIMALS)
}

/// Round a decoded value produced with `scale` and `offset`
pub fn round_physical(value: f64, scale: f64, offset: f64) -> f64 {
    let factor = 10_f64.powi(decimals(scale).max(decimals(offset)) as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimals() {
        assert_eq!(decimals(1.0), 0);
        assert_eq!(decimals(40.0), 0);
        assert_eq!(decimals(0.1), 1);
        assert_eq!(decimals(-0.25), 2);
        assert_eq!(decimals(0.001), 3);
        assert_eq!(decimals(1.0 / 3.0), MAX_DECIMALS);
    }

    #[test]
    fn test_round_physical() {
        assert_eq!(round_physical(3.0 * 0.1, 0.1, 0.0), 0.3);
        assert_eq!(round_physical(12.999_999_9, 1.0, 0.0), 13.0);
        // Offset decimals count too
        assert_eq!(round_physical(7.0 + 0.5 + 1e-12, 1.0, 0.5), 7.5);
    }
}
