//! Decimal rendering of results for replies and history listings
//!
//! - integral values below 1e15 print without a fraction (`1024`, `-12`);
//! - magnitudes in [1e-4, 1e10) print with up to 10 decimals, trailing
//!   zeros trimmed (`0.3333333333`, `0.3`);
//! - everything else uses scientific notation (`1e20`, `1.5e-7`).
//!
//! This is a display format only. History files store the shortest
//! round-trip representation instead so that values survive save/load
//! bit-for-bit.

const INTEGER_LIMIT: f64 = 1e15;
const FIXED_MIN: f64 = 1e-4;
const FIXED_MAX: f64 = 1e10;

pub fn format_number(value: f64) -> String {
    // Also catches -0.0
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();

    if value.fract() == 0.0 && magnitude < INTEGER_LIMIT {
        return format!("{:.0}", value);
    }

    if (FIXED_MIN..FIXED_MAX).contains(&magnitude) {
        let fixed = format!("{:.10}", value);
        let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
        // Rounding to 10 decimals can leave "-0" for tiny negatives
        return if trimmed == "-0" {
            "0".to_string()
        } else {
            trimmed.to_string()
        };
    }

    format!("{:e}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(1024.0), "1024");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(120.0), "120");
    }

    #[test]
    fn test_fractions() {
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(1.0 / 3.0), "0.3333333333");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-0.75), "-0.75");
    }

    #[test]
    fn test_scientific() {
        assert_eq!(format_number(1e20), "1e20");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(12345678901.5), "1.23456789015e10");
    }
}
