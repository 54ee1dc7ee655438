// Utility helpers for parsing and basic statistics.
//
// This module centralizes the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values.
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};
use std::cmp::Ordering;

/// Tokens a spreadsheet or dataframe export writes for an absent value.
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-NaN", "-nan", "<NA>", "N/A", "NA", "NULL", "NaN", "None",
    "n/a", "nan", "null",
];

/// Day-first layouts are tried before year-first ones, so `03-04-2016` is
/// the 3rd of April.
const DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

pub fn is_missing(s: &str) -> bool {
    MISSING_TOKENS.contains(&s.trim())
}

/// Trim a cell and map the missing-value tokens to `None`.
pub fn non_missing(s: &str) -> Option<&str> {
    let s = s.trim();
    if is_missing(s) {
        None
    } else {
        Some(s)
    }
}

/// Parse a string-like value into `f64`.
///
/// - Missing tokens yield `Ok(None)`.
/// - Thousands separators like `","` are stripped before parsing.
/// - Anything else that does not parse is an `Err` carrying a reason.
pub fn parse_f64_opt(s: &str) -> Result<Option<f64>, String> {
    let Some(s) = non_missing(s) else {
        return Ok(None);
    };
    let cleaned = s.replace(',', "");
    cleaned
        .parse::<f64>()
        .map(Some)
        .map_err(|e| format!("not a number: {e}"))
}

pub fn parse_i64(s: &str) -> Result<i64, String> {
    let s = non_missing(s).ok_or_else(|| "value is missing".to_string())?;
    // Integer columns exported through a float dtype come out as `12.0`.
    if let Ok(v) = s.parse::<i64>() {
        return Ok(v);
    }
    match s.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i64),
        _ => Err("not an integer".to_string()),
    }
}

/// Interpret a 0/1 (or true/false) flag.
pub fn parse_flag(s: &str) -> Result<bool, String> {
    match non_missing(s).map(str::to_ascii_lowercase).as_deref() {
        Some("1") | Some("1.0") | Some("true") => Ok(true),
        Some("0") | Some("0.0") | Some("false") => Ok(false),
        Some(_) => Err("expected 0 or 1".to_string()),
        None => Err("value is missing".to_string()),
    }
}

/// Parse a date using the day-before-month convention.
pub fn parse_date_dayfirst(s: &str) -> Option<NaiveDate> {
    let s = non_missing(s)?;
    // `%Y` also accepts "16"; two-digit years are rejected rather than read as 0016.
    let full_year = |d: NaiveDate| (d.year() >= 1000).then_some(d);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok().and_then(full_year))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
                .and_then(full_year)
        })
}

fn sort_floats(v: &mut [f64]) {
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
}

pub fn median(mut v: Vec<f64>) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    sort_floats(&mut v);
    let mid = v.len() / 2;
    if v.len() % 2 == 1 {
        Some(v[mid])
    } else {
        Some((v[mid - 1] + v[mid]) / 2.0)
    }
}

/// Quantile with linear interpolation between the closest ranks, the
/// convention dataframe libraries use by default.
pub fn quantile(v: &[f64], q: f64) -> Option<f64> {
    if v.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = v.to_vec();
    sort_floats(&mut sorted);
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Round to one decimal place, the precision rates are displayed with.
pub fn round1(n: f64) -> f64 {
    (n * 10.0).round() / 10.0
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

pub fn format_pct(n: &f64) -> String {
    format!("{:.1}%", n)
}

pub fn format_money(n: &f64) -> String {
    format!("${}", format_number(*n, 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tokens_are_recognized() {
        assert!(is_missing(""));
        assert!(is_missing("  NA "));
        assert!(is_missing("NULL"));
        assert!(!is_missing("0"));
        assert_eq!(parse_f64_opt("NaN").unwrap(), None);
        assert_eq!(parse_f64_opt("1,250.5").unwrap(), Some(1250.5));
        assert!(parse_f64_opt("abc").is_err());
    }

    #[test]
    fn dates_are_read_day_first() {
        let d = parse_date_dayfirst("03-04-2016").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2016, 4, 3).unwrap());
        let d = parse_date_dayfirst("03/04/2016").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2016, 4, 3).unwrap());
        let iso = parse_date_dayfirst("2015-07-01").unwrap();
        assert_eq!(iso, NaiveDate::from_ymd_opt(2015, 7, 1).unwrap());
        assert!(parse_date_dayfirst("31-31-2015").is_none());
        assert!(parse_date_dayfirst("").is_none());
    }

    #[test]
    fn two_digit_years_are_rejected() {
        assert!(parse_date_dayfirst("03-04-16").is_none());
        assert!(parse_date_dayfirst("1/7/15").is_none());
        assert!(parse_date_dayfirst("16-04-03").is_none());
        assert_eq!(
            parse_date_dayfirst("03-04-1016"),
            NaiveDate::from_ymd_opt(1016, 4, 3)
        );
    }

    #[test]
    fn integer_columns_accept_float_rendering() {
        assert_eq!(parse_i64("342").unwrap(), 342);
        assert_eq!(parse_i64("12.0").unwrap(), 12);
        assert!(parse_i64("12.5").is_err());
        assert!(parse_flag("1").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(parse_flag("yes").is_err());
    }

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        assert_eq!(median(vec![2.0, 0.0, 1.0, 0.0]), Some(0.5));
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(Vec::new()), None);
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let v = [50.0, 60.0, 70.0, 80.0, 90.0, 100.0, 110.0, 120.0, 130.0, 10_000.0];
        assert!((quantile(&v, 0.25).unwrap() - 72.5).abs() < 1e-9);
        assert!((quantile(&v, 0.75).unwrap() - 117.5).abs() < 1e-9);
        assert_eq!(quantile(&[4.0], 0.75), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn numbers_get_thousands_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_int(119_390usize), "119,390");
        assert_eq!(format_pct(&37.04), "37.0%");
    }
}
