//! Significant-digit formatting for sensor values.
//!
//! Console output for a reading uses the same shape as C's `%g` conversion:
//! a fixed number of significant digits, trailing zeros removed, and
//! scientific notation only for very large or very small magnitudes.

/// Format `value` with `digits` significant digits, `%g` style.
///
/// # Examples
///
/// ```
/// use co2bridge_types::format_significant;
///
/// assert_eq!(format_significant(22.0, 4), "22");
/// assert_eq!(format_significant(22.137, 4), "22.14");
/// assert_eq!(format_significant(1234.4, 4), "1234");
/// assert_eq!(format_significant(45.66, 3), "45.7");
/// assert_eq!(format_significant(123456.0, 4), "1.235e+05");
/// ```
#[must_use]
pub fn format_significant(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let precision = digits.max(1);

    // Round to the requested precision first so the exponent reflects carries
    // (e.g. 9.9996 at 4 digits is 10.00, exponent 1).
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= precision as i32 {
        let mantissa = strip_trailing_zeros(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_trailing_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_numbers_drop_fraction() {
        assert_eq!(format_significant(22.0, 4), "22");
        assert_eq!(format_significant(45.0, 3), "45");
        assert_eq!(format_significant(1200.0, 4), "1200");
    }

    #[test]
    fn test_rounds_to_significant_digits() {
        assert_eq!(format_significant(22.1, 4), "22.1");
        assert_eq!(format_significant(21.876, 4), "21.88");
        assert_eq!(format_significant(44.44, 3), "44.4");
        assert_eq!(format_significant(612.37, 4), "612.4");
    }

    #[test]
    fn test_carry_into_next_exponent() {
        assert_eq!(format_significant(9.9996, 4), "10");
        assert_eq!(format_significant(99.96, 3), "100");
    }

    #[test]
    fn test_scientific_for_large_and_small() {
        assert_eq!(format_significant(12346.0, 4), "1.235e+04");
        assert_eq!(format_significant(0.00001234, 3), "1.23e-05");
        assert_eq!(format_significant(0.0001234, 3), "0.000123");
    }

    #[test]
    fn test_negative_values() {
        assert_eq!(format_significant(-5.25, 4), "-5.25");
        assert_eq!(format_significant(-0.5, 3), "-0.5");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(format_significant(0.0, 4), "0");
        assert_eq!(format_significant(f64::NAN, 4), "nan");
        assert_eq!(format_significant(f64::INFINITY, 4), "inf");
        assert_eq!(format_significant(f64::NEG_INFINITY, 4), "-inf");
    }
}
