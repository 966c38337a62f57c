use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// Every position, carry, truck progress value and per-tick budget is a
/// `Fixed64`, so a tick produces identical bits on every platform.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display/FFI, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Largest pixel coordinate magnitude the simulation works with. The
/// difference of two coordinates inside this bound still fits a `Fixed64`.
pub const MAX_REAL_EXTENT: i64 = (1 << 30) - 1;

/// Spread a per-second quantity over one tick at `tick_rate` ticks per second.
///
/// `None` if `per_second` is not finite or either value does not fit a
/// `Fixed64`, or if `tick_rate` is zero.
#[inline]
pub fn checked_per_tick(per_second: f64, tick_rate: u32) -> Option<Fixed64> {
    Fixed64::checked_from_num(per_second)?.checked_div(Fixed64::checked_from_num(tick_rate)?)
}

/// [`checked_per_tick`], zero when the value is unrepresentable.
#[inline]
pub fn per_tick(per_second: f64, tick_rate: u32) -> Fixed64 {
    checked_per_tick(per_second, tick_rate).unwrap_or(Fixed64::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed64_basic_arithmetic() {
        let a = f64_to_fixed64(1.5);
        let b = f64_to_fixed64(2.0);
        assert_eq!(fixed64_to_f64(a + b), 3.5);
    }

    #[test]
    fn per_tick_divides_by_rate() {
        let budget = per_tick(64.0, 64);
        assert_eq!(budget, Fixed64::from_num(1));
    }

    #[test]
    fn per_tick_zero_rate_is_zero() {
        assert_eq!(per_tick(64.0, 0), Fixed64::ZERO);
    }

    #[test]
    fn checked_per_tick_rejects_unrepresentable() {
        assert_eq!(checked_per_tick(f64::INFINITY, 60), None);
        assert_eq!(checked_per_tick(f64::NAN, 60), None);
        assert_eq!(checked_per_tick(1.0e12, 60), None);
        assert_eq!(checked_per_tick(64.0, u32::MAX), None);
        assert_eq!(checked_per_tick(64.0, 0), None);
        assert_eq!(checked_per_tick(64.0, 64), Some(Fixed64::from_num(1)));
    }

    #[test]
    fn per_tick_is_deterministic() {
        assert_eq!(per_tick(64.0, 60), per_tick(64.0, 60));
        assert!(per_tick(64.0, 60) > Fixed64::from_num(1));
    }
}
