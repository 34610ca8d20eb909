/// Normalize a free-form phone string to E.164-ish form.
///
/// Numbers already carrying a `+` prefix are returned as typed. Anything
/// else is reduced to its digits, the national trunk `0` is dropped, and
/// the configured country-code prefix is prepended. No further validation
/// happens here; the delivery provider rejects what it cannot route.
pub fn normalize(raw: &str, default_country_code: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('+') {
        return trimmed.to_string();
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    let national = digits.strip_prefix('0').unwrap_or(&digits);

    format!("{default_country_code}{national}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_national_number_gets_country_code() {
        assert_eq!(normalize("0170 1234567", "+49"), "+491701234567");
    }

    #[test]
    fn test_plus_prefixed_unchanged() {
        assert_eq!(normalize("+491701234567", "+49"), "+491701234567");
        assert_eq!(normalize("+1 (555) 010-0000", "+49"), "+1 (555) 010-0000");
    }

    #[test]
    fn test_separators_stripped() {
        assert_eq!(normalize("(0170) 123-45.67", "+49"), "+491701234567");
    }

    #[test]
    fn test_no_trunk_zero() {
        assert_eq!(normalize("170 1234567", "+49"), "+491701234567");
    }
}
