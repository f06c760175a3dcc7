//! Period label parsing.
//!
//! ONS time options name their periods in several shapes: `"Nov-25"`
//! (month + two-digit year), `"2019"`, `"2019 Q3"`, `"2019 NOV"`. The ids
//! are not guaranteed to sort chronologically as strings, so callers that
//! need calendar order re-sort fetched rows with [`chronological`], which
//! parses the label into a date key and falls back to id order when the
//! label is not recognised.

use std::cmp::Ordering;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::ObservationRow;

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})$").unwrap())
}

fn mon_yy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z]{3})-(\d{2})$").unwrap())
}

fn quarter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(\d{4})[-\s]?[Qq]([1-4])|[Qq]([1-4])[-\s](\d{4}))$").unwrap()
    })
}

fn year_month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(\d{4})\s+([A-Za-z]{3,9})|([A-Za-z]{3,9})\s+(\d{4}))$").unwrap()
    })
}

fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?.to_ascii_lowercase();
    let n = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

// Two-digit years pivot at 70: "25" is 2025, "98" is 1998. This matches
// the labels the API actually emits (series start no earlier than the
// 1970s) and avoids the 1925-vs-2025 ambiguity.
fn expand_year(yy: u32) -> i32 {
    if yy <= 69 { 2000 + yy as i32 } else { 1900 + yy as i32 }
}

/// Parse a period label (or id) into the first day of the period.
/// Returns `None` for unrecognised shapes.
pub fn parse_period(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Some(caps) = year_re().captures(s) {
        let year: i32 = caps[1].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }

    if let Some(caps) = mon_yy_re().captures(s) {
        let month = month_number(&caps[1])?;
        let year = expand_year(caps[2].parse().ok()?);
        return NaiveDate::from_ymd_opt(year, month, 1);
    }

    if let Some(caps) = quarter_re().captures(s) {
        let (year, quarter) = match (caps.get(1), caps.get(3)) {
            (Some(y), _) => (y.as_str(), &caps[2]),
            (None, Some(q)) => (&caps[4], q.as_str()),
            _ => return None,
        };
        let year: i32 = year.parse().ok()?;
        let quarter: u32 = quarter.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, quarter * 3 - 2, 1);
    }

    if let Some(caps) = year_month_re().captures(s) {
        let (year, month) = match (caps.get(1), caps.get(3)) {
            (Some(y), _) => (y.as_str(), &caps[2]),
            (None, Some(m)) => (&caps[4], m.as_str()),
            _ => return None,
        };
        let year: i32 = year.parse().ok()?;
        let month = month_number(month)?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }

    None
}

/// Chronological row comparator: parsed period label first (falling back
/// to the id), id order when neither side parses. Pass to
/// [`crate::models::ObservationSet::sort_rows_by`].
pub fn chronological(a: &ObservationRow, b: &ObservationRow) -> Ordering {
    let key = |row: &ObservationRow| {
        parse_period(&row.period_label).or_else(|| parse_period(&row.period_id))
    };
    match (key(a), key(b)) {
        (Some(ka), Some(kb)) => ka.cmp(&kb).then_with(|| a.period_id.cmp(&b.period_id)),
        _ => a.period_id.cmp(&b.period_id),
    }
}

/// Sort rows into calendar order in place.
pub fn sort_chronological(rows: &mut [ObservationRow]) {
    rows.sort_by(chronological);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, label: &str) -> ObservationRow {
        ObservationRow {
            period_id: id.into(),
            period_label: label.into(),
            value: 0.0,
        }
    }

    #[test]
    fn parses_common_label_shapes() {
        assert_eq!(parse_period("2019"), NaiveDate::from_ymd_opt(2019, 1, 1));
        assert_eq!(parse_period("Nov-25"), NaiveDate::from_ymd_opt(2025, 11, 1));
        assert_eq!(parse_period("Feb-98"), NaiveDate::from_ymd_opt(1998, 2, 1));
        assert_eq!(parse_period("2019 Q3"), NaiveDate::from_ymd_opt(2019, 7, 1));
        assert_eq!(parse_period("Q1 2020"), NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(parse_period("2019 NOV"), NaiveDate::from_ymd_opt(2019, 11, 1));
        assert_eq!(parse_period("November 2019"), NaiveDate::from_ymd_opt(2019, 11, 1));
        assert_eq!(parse_period("not a period"), None);
    }

    #[test]
    fn chronological_beats_lexicographic_for_month_labels() {
        let mut rows = vec![
            row("Nov-24", "Nov-24"),
            row("Feb-25", "Feb-25"),
            row("Jan-25", "Jan-25"),
        ];
        // Lexicographic order would put Feb-25 first.
        sort_chronological(&mut rows);
        let ids: Vec<&str> = rows.iter().map(|r| r.period_id.as_str()).collect();
        assert_eq!(ids, ["Nov-24", "Jan-25", "Feb-25"]);
    }

    #[test]
    fn unparseable_labels_fall_back_to_id_order() {
        let mut rows = vec![row("b", "??"), row("a", "??")];
        sort_chronological(&mut rows);
        assert_eq!(rows[0].period_id, "a");
    }
}
