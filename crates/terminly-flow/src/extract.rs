use std::sync::OnceLock;

use regex::Regex;

/// Filler words stripped before date/time matching, so "um 10 Uhr" and
/// "around 10" both reduce to the bare value.
const FILLERS: &[&str] = &["um", "uhr", "gegen", "at", "around", "o'clock", "oclock"];

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{1,2}\.\d{1,2}\.\d{4}\b").expect("valid regex"))
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})(:[0-5]\d)?\b").expect("valid regex"))
}

fn duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid regex")
    })
}

/// Drop filler tokens ("um", "uhr", "at", ...) so they cannot split or
/// shadow the value we are looking for. Comparison ignores case and
/// trailing punctuation.
fn strip_fillers(text: &str) -> String {
    text.split_whitespace()
        .filter(|token| {
            let cleaned = token
                .trim_end_matches([',', '.', '!', '?'])
                .to_lowercase();
            !FILLERS.contains(&cleaned.as_str())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// First `DD.MM.YYYY`-shaped substring, returned verbatim. Range checks
/// happen later, at slot resolution.
pub fn extract_date(text: &str) -> Option<String> {
    let cleaned = strip_fillers(text);
    date_re().find(&cleaned).map(|m| m.as_str().to_string())
}

/// First `H[:MM]` substring with a plausible hour, returned verbatim.
pub fn extract_time(text: &str) -> Option<String> {
    let cleaned = strip_fillers(text);
    let caps = time_re().captures(&cleaned)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    if hour > 23 {
        return None;
    }
    Some(caps.get(0)?.as_str().to_string())
}

/// First integer substring, as minutes.
pub fn extract_duration(text: &str) -> Option<String> {
    duration_re().find(text).map(|m| m.as_str().to_string())
}

/// First `local@domain` substring.
pub fn extract_email(text: &str) -> Option<String> {
    email_re().find(text).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_from_sentence() {
        assert_eq!(
            extract_date("Termin am 08.11.2025 bitte"),
            Some("08.11.2025".to_string())
        );
    }

    #[test]
    fn test_date_single_digit_parts() {
        assert_eq!(extract_date("8.1.2026"), Some("8.1.2026".to_string()));
    }

    #[test]
    fn test_date_absent() {
        assert_eq!(extract_date("next tuesday maybe"), None);
        assert_eq!(extract_date("08.11.25"), None);
    }

    #[test]
    fn test_date_takes_first_match() {
        assert_eq!(
            extract_date("01.12.2025 oder 02.12.2025"),
            Some("01.12.2025".to_string())
        );
    }

    #[test]
    fn test_time_with_minutes() {
        assert_eq!(extract_time("10:00"), Some("10:00".to_string()));
        assert_eq!(extract_time("so um 14:30 bitte"), Some("14:30".to_string()));
    }

    #[test]
    fn test_time_bare_hour() {
        assert_eq!(extract_time("um 10 Uhr"), Some("10".to_string()));
    }

    #[test]
    fn test_time_rejects_impossible_hour() {
        assert_eq!(extract_time("99"), None);
    }

    #[test]
    fn test_time_absent() {
        assert_eq!(extract_time("irgendwann"), None);
    }

    #[test]
    fn test_duration_first_integer() {
        assert_eq!(extract_duration("30 Minuten"), Some("30".to_string()));
        assert_eq!(extract_duration("about 45 or 60"), Some("45".to_string()));
        assert_eq!(extract_duration("keine Zahl"), None);
    }

    #[test]
    fn test_email_simple() {
        assert_eq!(extract_email("a@b.com"), Some("a@b.com".to_string()));
        assert_eq!(
            extract_email("meine mail: max.mustermann+test@example.co.uk danke"),
            Some("max.mustermann+test@example.co.uk".to_string())
        );
    }

    #[test]
    fn test_email_absent() {
        assert_eq!(extract_email("keine adresse"), None);
        assert_eq!(extract_email("a@b"), None);
    }

    #[test]
    fn test_strip_fillers_keeps_values() {
        assert_eq!(strip_fillers("gegen 10 Uhr, bitte"), "10 bitte");
        assert_eq!(strip_fillers("at 10:00 o'clock"), "10:00");
    }
}
