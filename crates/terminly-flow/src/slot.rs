use terminly_core::types::BookingData;

/// Turn the collected date, time, and duration into a start/end pair of
/// RFC3339 instants carrying the configured UTC offset.
///
/// Returns `None` when a stored field is out of range (31.02., hour 24),
/// so the caller re-prompts instead of booking garbage. Duration may
/// roll the end instant over midnight; the civil-date math handles that.
pub fn resolve(data: &BookingData, tz_offset: i32) -> Option<(String, String)> {
    let (day, month, year) = parse_date(data.date.as_deref()?)?;
    let (hour, minute) = parse_time(data.time.as_deref()?)?;
    let duration = data.duration_minutes?;
    if duration == 0 {
        return None;
    }

    let start_secs = civil_to_days(year, month, day) * 86400 + hour * 3600 + minute * 60;
    let end_secs = start_secs + (duration as i64) * 60;

    Some((
        format_instant(start_secs, tz_offset),
        format_instant(end_secs, tz_offset),
    ))
}

fn parse_date(date: &str) -> Option<(i64, i64, i64)> {
    let mut parts = date.split('.');
    let day: i64 = parts.next()?.parse().ok()?;
    let month: i64 = parts.next()?.parse().ok()?;
    let year: i64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }
    Some((day, month, year))
}

fn parse_time(time: &str) -> Option<(i64, i64)> {
    let (hour_str, minute_str) = match time.split_once(':') {
        Some((h, m)) => (h, m),
        None => (time, "0"),
    };
    let hour: i64 = hour_str.parse().ok()?;
    let minute: i64 = minute_str.parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

/// Format seconds of local wall time as RFC3339 with the fixed offset.
fn format_instant(local_secs: i64, tz_offset: i32) -> String {
    let days = local_secs.div_euclid(86400);
    let remainder = local_secs.rem_euclid(86400);
    let (y, m, d) = days_to_civil(days);
    let h = remainder / 3600;
    let min = (remainder % 3600) / 60;

    let tz = if tz_offset >= 0 {
        format!("+{:02}:00", tz_offset)
    } else {
        format!("-{:02}:00", tz_offset.unsigned_abs())
    };

    format!("{y:04}-{m:02}-{d:02}T{h:02}:{min:02}:00{tz}")
}

fn civil_to_days(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let m = month;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day - 1;
    let doe = yoe as i64 * 365 + yoe as i64 / 4 - yoe as i64 / 100 + doy;
    era * 146097 + doe - 719468
}

fn days_to_civil(days: i64) -> (i64, i64, i64) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m as i64, d as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(date: &str, time: &str, duration: u32) -> BookingData {
        BookingData {
            date: Some(date.to_string()),
            time: Some(time.to_string()),
            duration_minutes: Some(duration),
            email: Some("a@b.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_basic_slot() {
        let (start, end) = resolve(&data("08.11.2025", "10:00", 30), 1).unwrap();
        assert_eq!(start, "2025-11-08T10:00:00+01:00");
        assert_eq!(end, "2025-11-08T10:30:00+01:00");
    }

    #[test]
    fn test_resolve_bare_hour() {
        let (start, end) = resolve(&data("8.1.2026", "9", 60), 0).unwrap();
        assert_eq!(start, "2026-01-08T09:00:00+00:00");
        assert_eq!(end, "2026-01-08T10:00:00+00:00");
    }

    #[test]
    fn test_resolve_rolls_over_midnight() {
        let (start, end) = resolve(&data("31.12.2025", "23:30", 45), 1).unwrap();
        assert_eq!(start, "2025-12-31T23:30:00+01:00");
        assert_eq!(end, "2026-01-01T00:15:00+01:00");
    }

    #[test]
    fn test_resolve_negative_offset() {
        let (start, _) = resolve(&data("01.06.2026", "12:00", 30), -5).unwrap();
        assert_eq!(start, "2026-06-01T12:00:00-05:00");
    }

    #[test]
    fn test_resolve_rejects_out_of_range() {
        assert!(resolve(&data("32.01.2026", "10:00", 30), 1).is_none());
        assert!(resolve(&data("01.13.2026", "10:00", 30), 1).is_none());
        assert!(resolve(&data("01.01.2026", "24:00", 30), 1).is_none());
        assert!(resolve(&data("01.01.2026", "10:00", 0), 1).is_none());
    }

    #[test]
    fn test_resolve_requires_all_fields() {
        let mut d = data("08.11.2025", "10:00", 30);
        d.time = None;
        assert!(resolve(&d, 1).is_none());
    }
}
