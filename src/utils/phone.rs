/// Normalizes a Kenyan phone number to the `+254…` form stored on user records.
/// Handles the common ways people type their number.
pub fn normalize_phone(input: &str) -> String {
    let digits: String = input
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    if let Some(rest) = digits.strip_prefix('+') {
        return format!("+{}", rest);
    }
    if let Some(rest) = digits.strip_prefix("254") {
        return format!("+254{}", rest);
    }
    // 07xx / 01xx local form
    if digits.len() == 10 && digits.starts_with('0') {
        return format!("+254{}", &digits[1..]);
    }
    // 7xx without the trunk zero
    if digits.len() == 9 && (digits.starts_with('7') || digits.starts_with('1')) {
        return format!("+254{}", digits);
    }
    digits
}

/// Whether the input looks enough like a phone number to be stored.
pub fn is_plausible_phone(input: &str) -> bool {
    let normalized = normalize_phone(input);
    let digits = normalized.trim_start_matches('+');
    (9..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("0712345678"), "+254712345678");
        assert_eq!(normalize_phone("254712345678"), "+254712345678");
        assert_eq!(normalize_phone("+254 712-345-678"), "+254712345678");
        assert_eq!(normalize_phone("712345678"), "+254712345678");
        assert_eq!(normalize_phone("0112345678"), "+254112345678");
        assert_eq!(normalize_phone("+14155550100"), "+14155550100");
    }

    #[test]
    fn test_is_plausible_phone() {
        assert!(is_plausible_phone("0712345678"));
        assert!(is_plausible_phone("+254700000000"));
        assert!(!is_plausible_phone("12345"));
        assert!(!is_plausible_phone("not-a-phone"));
        assert!(!is_plausible_phone(""));
    }
}
