//! Digital Signal Processing utilities

mod windows;

pub use windows::WindowFunction;

/// Power to decibels, with non-positive power mapped to 0 dB
#[inline]
pub fn power_to_db(power: f64) -> f64 {
    if power > 0.0 {
        10.0 * power.log10()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_to_db() {
        assert_eq!(power_to_db(0.0), 0.0);
        assert!((power_to_db(100.0) - 20.0).abs() < 1e-12);
        assert!(power_to_db(0.01) < 0.0);
    }
}
