//! Small display helpers for console output.

/// Group an integer string with thousands separators: `1234567` ->
/// `1,234,567`. Non-digit input is returned unchanged.
pub fn format_grouped(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return value.to_string();
    }

    let digits: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        let remaining = digits.len() - i;
        if i > 0 && remaining % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping() {
        assert_eq!(format_grouped("0"), "0");
        assert_eq!(format_grouped("999"), "999");
        assert_eq!(format_grouped("1000"), "1,000");
        assert_eq!(format_grouped("1234567"), "1,234,567");
    }

    #[test]
    fn test_non_digit_passthrough() {
        assert_eq!(format_grouped("12.5"), "12.5");
        assert_eq!(format_grouped(""), "");
    }
}
