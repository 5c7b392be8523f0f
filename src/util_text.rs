//! Display formatting for the Serbian (sr-RS) storefront.
//!
//! Everything here is pure: values in, display strings out.

use chrono::{DateTime, Datelike, Utc};

/// Currency code shown after every price
pub const CURRENCY: &str = "RSD";

/// Group an unsigned amount with `.` as the thousands separator (sr-RS).
/// Examples: 0 -> "0", 2500 -> "2.500", 1234567 -> "1.234.567"
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Format a price in whole dinars, zero decimal digits.
/// Examples: 2500 -> "2.500 RSD", 990 -> "990 RSD"
pub fn format_price(amount: u64) -> String {
    format!("{} {CURRENCY}", group_thousands(amount))
}

/// Format a price range for filter chips.
pub fn format_price_range(min: Option<u64>, max: Option<u64>) -> Option<String> {
    match (min, max) {
        (Some(lo), Some(hi)) => Some(format!("{} - {}", group_thousands(lo), format_price(hi))),
        (Some(lo), None) => Some(format!("od {}", format_price(lo))),
        (None, Some(hi)) => Some(format!("do {}", format_price(hi))),
        (None, None) => None,
    }
}

/// Serbian plural selection with the one/few/many split.
///
/// `one` for 1, 21, 31..; `few` for 2-4, 22-24..; `many` for the rest
/// (including 11-14).
pub fn plural_sr<'a>(n: u64, one: &'a str, few: &'a str, many: &'a str) -> &'a str {
    let last = n % 10;
    let last_two = n % 100;
    if last == 1 && last_two != 11 {
        one
    } else if (2..=4).contains(&last) && !(12..=14).contains(&last_two) {
        few
    } else {
        many
    }
}

/// Calendar date, Serbian style: "18.10.2026."
pub fn format_date(ts: DateTime<Utc>) -> String {
    format!("{}.{}.{}.", ts.day(), ts.month(), ts.year())
}

/// Relative time used on product cards ("pre 5 minuta").
/// Anything older than a week falls back to the calendar date.
pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    if secs < 60 {
        // Also covers timestamps slightly in the future (clock skew)
        return "upravo sada".to_string();
    }
    let minutes = (secs / 60) as u64;
    if minutes < 60 {
        return format!("pre {minutes} {}", plural_sr(minutes, "minut", "minuta", "minuta"));
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("pre {hours} {}", plural_sr(hours, "sat", "sata", "sati"));
    }
    let days = hours / 24;
    if days < 7 {
        return format!("pre {days} {}", plural_sr(days, "dan", "dana", "dana"));
    }
    format_date(then)
}

/// How long someone has been a member.
///
/// Under 30 days the count is in days ("1 dan", "12 dana"), under a year in
/// 30-day months, otherwise in 365-day years. A start date in the future
/// counts as zero days.
pub fn format_membership_duration(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - since).num_days().max(0) as u64;
    if days < 30 {
        let unit = if days == 1 { "dan" } else { "dana" };
        return format!("{days} {unit}");
    }
    if days < 365 {
        let months = days / 30;
        return format!("{months} {}", plural_sr(months, "mesec", "meseca", "meseci"));
    }
    let years = days / 365;
    format!("{years} {}", plural_sr(years, "godina", "godine", "godina"))
}

/// One decimal with a Serbian decimal comma: 4.75 -> "4,8"
pub fn format_decimal_1(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    format!("{rounded:.1}").replace('.', ",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn price_uses_dot_grouping_and_no_decimals() {
        assert_eq!(format_price(2500), "2.500 RSD");
        assert_eq!(format_price(0), "0 RSD");
        assert_eq!(format_price(999), "999 RSD");
        assert_eq!(format_price(1_000), "1.000 RSD");
        assert_eq!(format_price(12_345_678), "12.345.678 RSD");
        assert!(!format_price(2500).contains('-'));
        assert!(!format_price(2500).contains(','));
    }

    #[test]
    fn price_range_labels() {
        assert_eq!(format_price_range(Some(100), Some(2500)).unwrap(), "100 - 2.500 RSD");
        assert_eq!(format_price_range(Some(1000), None).unwrap(), "od 1.000 RSD");
        assert_eq!(format_price_range(None, Some(500)).unwrap(), "do 500 RSD");
        assert!(format_price_range(None, None).is_none());
    }

    #[test]
    fn plural_rules() {
        let p = |n| plural_sr(n, "one", "few", "many");
        assert_eq!(p(1), "one");
        assert_eq!(p(2), "few");
        assert_eq!(p(4), "few");
        assert_eq!(p(5), "many");
        assert_eq!(p(11), "many");
        assert_eq!(p(12), "many");
        assert_eq!(p(21), "one");
        assert_eq!(p(22), "few");
        assert_eq!(p(111), "many");
        assert_eq!(p(0), "many");
    }

    #[test]
    fn membership_days_boundary() {
        let now = at(2026, 10, 18);
        assert_eq!(format_membership_duration(now - Duration::days(1), now), "1 dan");
        assert_eq!(format_membership_duration(now - Duration::days(2), now), "2 dana");
        for d in 2..30 {
            let s = format_membership_duration(now - Duration::days(d), now);
            assert_eq!(s, format!("{d} dana"));
        }
        assert_eq!(format_membership_duration(now, now), "0 dana");
        assert_eq!(format_membership_duration(now + Duration::days(3), now), "0 dana");
    }

    #[test]
    fn membership_months_and_years() {
        let now = at(2026, 10, 18);
        assert_eq!(format_membership_duration(now - Duration::days(30), now), "1 mesec");
        assert_eq!(format_membership_duration(now - Duration::days(95), now), "3 meseca");
        assert_eq!(format_membership_duration(now - Duration::days(200), now), "6 meseci");
        assert_eq!(format_membership_duration(now - Duration::days(365), now), "1 godina");
        assert_eq!(format_membership_duration(now - Duration::days(800), now), "2 godine");
        assert_eq!(format_membership_duration(now - Duration::days(365 * 7), now), "7 godina");
    }

    #[test]
    fn relative_time_steps() {
        let now = at(2026, 10, 18);
        assert_eq!(format_relative_time(now, now), "upravo sada");
        assert_eq!(format_relative_time(now - Duration::minutes(1), now), "pre 1 minut");
        assert_eq!(format_relative_time(now - Duration::minutes(5), now), "pre 5 minuta");
        assert_eq!(format_relative_time(now - Duration::hours(3), now), "pre 3 sata");
        assert_eq!(format_relative_time(now - Duration::hours(5), now), "pre 5 sati");
        assert_eq!(format_relative_time(now - Duration::days(2), now), "pre 2 dana");
        assert_eq!(format_relative_time(at(2026, 9, 1), now), "1.9.2026.");
    }

    #[test]
    fn decimal_comma() {
        assert_eq!(format_decimal_1(4.75), "4,8");
        assert_eq!(format_decimal_1(5.0), "5,0");
        assert_eq!(format_decimal_1(0.0), "0,0");
    }
}
