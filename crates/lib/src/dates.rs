//! # Date Expression Resolver
//!
//! Turns natural-language date fragments ("last 2 complete months", "week 45",
//! "from 12th nov to 15 dec") into a SQL boolean predicate over a caller-supplied
//! column. Relative expressions are resolved against a `Clock` in the fixed
//! UTC+5:30 business offset, so tests can pin "now" while production reads the
//! system time.
//!
//! Rules are tried in a fixed order and the first match wins. Weekday names are
//! checked before the generic relative-range rule because they end in "day".
//! An empty string means "no date constraint", never an error.

use crate::constants::IST_OFFSET_SECONDS;
use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, Utc};
use regex::Regex;
use std::fmt::Debug;
use std::sync::{Arc, LazyLock};

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bfrom\s+(.+?)\s+to\s+(.+)").expect("range regex is valid"));
static WEEK_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bweek\s+(\d+)\b").expect("week regex is valid"));
static RELATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:(last|past|previous|this|current|next)\s+)?(?:(\d+)\s+)?(?:(?:complete|full)\s+)?(year|month|week|day)s?\b",
    )
    .expect("relative range regex is valid")
});
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").expect("year regex is valid"));
static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)\b").expect("ordinal regex is valid"));

/// Counted ranges reaching further back than this many months yield no constraint.
const MAX_LOOKBACK_MONTHS: u32 = 1200;

const WEEKDAYS: &[(&str, u32)] = &[
    ("sunday", 0),
    ("sun", 0),
    ("monday", 1),
    ("mon", 1),
    ("tuesday", 2),
    ("tue", 2),
    ("tues", 2),
    ("wednesday", 3),
    ("wed", 3),
    ("thursday", 4),
    ("thu", 4),
    ("thurs", 4),
    ("friday", 5),
    ("fri", 5),
    ("saturday", 6),
    ("sat", 6),
];

const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("jan", 1),
    ("february", 2),
    ("feb", 2),
    ("march", 3),
    ("mar", 3),
    ("april", 4),
    ("apr", 4),
    ("may", 5),
    ("june", 6),
    ("jun", 6),
    ("july", 7),
    ("jul", 7),
    ("august", 8),
    ("aug", 8),
    ("september", 9),
    ("sept", 9),
    ("sep", 9),
    ("october", 10),
    ("oct", 10),
    ("november", 11),
    ("nov", 11),
    ("december", 12),
    ("dec", 12),
];

/// The fixed business timezone offset (UTC+5:30).
pub fn business_offset() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECONDS).expect("UTC+5:30 is a valid offset")
}

/// A source of "now", injectable so relative dates are deterministic in tests.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Reads the system time and shifts it into the business offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&business_offset())
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<FixedOffset>);

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self(now)
    }

    /// Noon of the given calendar day in the business offset.
    pub fn on(date: NaiveDate) -> Self {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .and_then(|dt| dt.and_local_timezone(business_offset()).single())
            .expect("noon in a fixed offset is unambiguous");
        Self(noon)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Qualifier {
    Previous,
    Current,
}

/// Resolves date expressions into SQL predicates.
#[derive(Debug, Clone)]
pub struct DateResolver {
    clock: Arc<dyn Clock>,
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl DateResolver {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// The current calendar day in the business offset.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Returns a predicate over `column`, or an empty string when the question
    /// carries no recognizable date expression.
    pub fn resolve(&self, question: &str, column: &str) -> String {
        resolve_on(self.today(), &question.to_lowercase(), column).unwrap_or_default()
    }
}

/// Applies the resolution rules in order for a fixed `today`.
pub fn resolve_on(today: NaiveDate, q: &str, column: &str) -> Option<String> {
    if let Some(range) = explicit_range(today, q, column) {
        return Some(range);
    }
    // "week 99" names no week; it must not fall through to the current week.
    if WEEK_NUMBER_RE.is_match(q) {
        return week_number(q, column);
    }
    weekday(q, column)
        .or_else(|| relative_range(today, q, column))
        .or_else(|| month_name(q, column))
        .or_else(|| year(q, column))
        .or_else(|| fixed_phrase(today, q, column))
}

fn explicit_range(today: NaiveDate, q: &str, column: &str) -> Option<String> {
    let caps = RANGE_RE.captures(q)?;
    let start = parse_date_literal(caps.get(1)?.as_str(), today.year())?;
    let end = parse_leading_date(caps.get(2)?.as_str(), today.year())?;
    Some(format!(
        "DATE({column}) BETWEEN DATE('{}') AND DATE('{}')",
        iso(start),
        iso(end)
    ))
}

fn week_number(q: &str, column: &str) -> Option<String> {
    let caps = WEEK_NUMBER_RE.captures(q)?;
    let week: u32 = caps.get(1)?.as_str().parse().ok()?;
    if week > 53 {
        return None;
    }
    Some(format!("strftime('%W', {column}) = '{week:02}'"))
}

fn weekday(q: &str, column: &str) -> Option<String> {
    WEEKDAYS
        .iter()
        .find(|(name, _)| has_word(q, name))
        .map(|(_, index)| format!("strftime('%w', {column}) = '{index}'"))
}

fn relative_range(today: NaiveDate, q: &str, column: &str) -> Option<String> {
    let caps = RELATIVE_RE.captures(q)?;
    let unit = match caps.get(3)?.as_str() {
        "day" => Unit::Day,
        "week" => Unit::Week,
        "month" => Unit::Month,
        _ => Unit::Year,
    };
    let count: Option<u32> = match caps.get(2) {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };
    let complete = has_word(q, "complete") || has_word(q, "full");

    let qualifier = match caps.get(1).map(|m| m.as_str()) {
        Some("last" | "past" | "previous") => Some(Qualifier::Previous),
        Some(_) => Some(Qualifier::Current),
        None if ["last", "past", "previous"].iter().any(|w| has_word(q, w)) => {
            Some(Qualifier::Previous)
        }
        None if ["this", "current"].iter().any(|w| has_word(q, w)) => Some(Qualifier::Current),
        None => None,
    };

    if count.is_none() && !complete {
        return single_period(today, unit, qualifier, column);
    }

    let n = count.unwrap_or(1);
    if n == 0 || !within_lookback(unit, n) {
        return None;
    }

    if complete {
        let end = period_start(today, unit)?;
        let start = shift_back(end, unit, n)?;
        Some(format!(
            "DATE({column}) >= DATE('{}') AND DATE({column}) < DATE('{}')",
            iso(start),
            iso(end)
        ))
    } else {
        let start = match unit {
            Unit::Day => today.checked_sub_signed(Duration::days(i64::from(n)))?,
            _ => shift_back(period_start(today, unit)?, unit, n - 1)?,
        };
        Some(format!(
            "DATE({column}) >= DATE('{}') AND DATE({column}) <= DATE('{}')",
            iso(start),
            iso(today)
        ))
    }
}

/// "month", "last week", "this year", ... without a count.
fn single_period(
    today: NaiveDate,
    unit: Unit,
    qualifier: Option<Qualifier>,
    column: &str,
) -> Option<String> {
    let qualifier = match (unit, qualifier) {
        // A bare "month"/"week" means the current one; a bare "day"/"year" is not a date.
        (Unit::Month | Unit::Week, None) => Qualifier::Current,
        (_, None) => return None,
        (_, Some(q)) => q,
    };
    let current = period_start(today, unit)?;
    let start = match qualifier {
        Qualifier::Current => current,
        Qualifier::Previous => shift_back(current, unit, 1)?,
    };
    Some(match unit {
        Unit::Day => format!("DATE({column}) = DATE('{}')", iso(start)),
        Unit::Month => format!(
            "strftime('%Y-%m', {column}) = '{}'",
            start.format("%Y-%m")
        ),
        Unit::Year => format!("strftime('%Y', {column}) = '{}'", start.year()),
        Unit::Week => match qualifier {
            Qualifier::Current => format!("DATE({column}) >= DATE('{}')", iso(start)),
            Qualifier::Previous => format!(
                "DATE({column}) >= DATE('{}') AND DATE({column}) < DATE('{}')",
                iso(start),
                iso(current)
            ),
        },
    })
}

fn month_name(q: &str, column: &str) -> Option<String> {
    MONTHS
        .iter()
        .find(|(name, _)| has_word(q, name))
        .map(|(_, number)| format!("strftime('%m', {column}) = '{number:02}'"))
}

fn year(q: &str, column: &str) -> Option<String> {
    let caps = YEAR_RE.captures(q)?;
    Some(format!(
        "strftime('%Y', {column}) = '{}'",
        caps.get(1)?.as_str()
    ))
}

fn fixed_phrase(today: NaiveDate, q: &str, column: &str) -> Option<String> {
    let week_start = period_start(today, Unit::Week)?;
    let month_start = period_start(today, Unit::Month)?;
    if has_word(q, "today") {
        return Some(format!("DATE({column}) = DATE('{}')", iso(today)));
    }
    if has_word(q, "yesterday") {
        let yesterday = today.checked_sub_signed(Duration::days(1))?;
        return Some(format!("DATE({column}) = DATE('{}')", iso(yesterday)));
    }
    if q.contains("this week") {
        return Some(format!("DATE({column}) >= DATE('{}')", iso(week_start)));
    }
    if q.contains("last week") {
        let previous = shift_back(week_start, Unit::Week, 1)?;
        return Some(format!(
            "DATE({column}) >= DATE('{}') AND DATE({column}) < DATE('{}')",
            iso(previous),
            iso(week_start)
        ));
    }
    if q.contains("this month") || q.contains("current month") {
        return Some(format!(
            "strftime('%Y-%m', {column}) = '{}'",
            month_start.format("%Y-%m")
        ));
    }
    if q.contains("last month") {
        let previous = shift_back(month_start, Unit::Month, 1)?;
        return Some(format!(
            "strftime('%Y-%m', {column}) = '{}'",
            previous.format("%Y-%m")
        ));
    }
    if q.contains("this year") {
        return Some(format!("strftime('%Y', {column}) = '{}'", today.year()));
    }
    if q.contains("last year") {
        return Some(format!(
            "strftime('%Y', {column}) = '{}'",
            today.year() - 1
        ));
    }
    None
}

/// First day of the period containing `today`. Weeks start on Sunday.
fn period_start(today: NaiveDate, unit: Unit) -> Option<NaiveDate> {
    match unit {
        Unit::Day => Some(today),
        Unit::Week => today.checked_sub_signed(Duration::days(i64::from(
            today.weekday().num_days_from_sunday(),
        ))),
        Unit::Month => NaiveDate::from_ymd_opt(today.year(), today.month(), 1),
        Unit::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1),
    }
}

fn within_lookback(unit: Unit, n: u32) -> bool {
    let limit = match unit {
        Unit::Day => MAX_LOOKBACK_MONTHS / 12 * 366,
        Unit::Week => MAX_LOOKBACK_MONTHS / 12 * 53,
        Unit::Month => MAX_LOOKBACK_MONTHS,
        Unit::Year => MAX_LOOKBACK_MONTHS / 12,
    };
    n <= limit
}

fn shift_back(date: NaiveDate, unit: Unit, n: u32) -> Option<NaiveDate> {
    match unit {
        Unit::Day => date.checked_sub_signed(Duration::days(i64::from(n))),
        Unit::Week => date.checked_sub_signed(Duration::days(7 * i64::from(n))),
        Unit::Month => date.checked_sub_months(Months::new(n)),
        Unit::Year => date.checked_sub_months(Months::new(n.checked_mul(12)?)),
    }
}

/// Parses the longest date literal found at the start of `text`.
fn parse_leading_date(text: &str, default_year: i32) -> Option<NaiveDate> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    (1..=tokens.len().min(3))
        .rev()
        .find_map(|n| parse_date_literal(&tokens[..n].join(" "), default_year))
}

/// Parses `DD-MM-YYYY`, `DD/MM/YYYY`, `YYYY-MM-DD`, `D[st|nd|rd|th] Month [Year]`
/// and `Month D [Year]`. A missing year defaults to `default_year`.
fn parse_date_literal(text: &str, default_year: i32) -> Option<NaiveDate> {
    let cleaned = ORDINAL_RE.replace_all(text.trim(), "$1").replace(',', " ");
    let cleaned = cleaned.trim();

    for format in ["%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(cleaned, format) {
            return Some(date);
        }
    }

    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    let (day, month, year_token) = match tokens.as_slice() {
        [first, second, rest @ ..] if rest.len() <= 1 => {
            if let (Ok(day), Some(month)) = (first.parse::<u32>(), month_number(second)) {
                (day, month, rest.first())
            } else if let (Some(month), Ok(day)) = (month_number(first), second.parse::<u32>()) {
                (day, month, rest.first())
            } else {
                return None;
            }
        }
        _ => return None,
    };
    let year = match year_token {
        Some(token) if token.len() == 4 => token.parse().ok()?,
        Some(_) => return None,
        None => default_year,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_number(word: &str) -> Option<u32> {
    MONTHS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, number)| *number)
}

/// Whole-word containment over alphanumeric tokens.
fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on(y: i32, m: u32, d: u32) -> DateResolver {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        DateResolver::new(Arc::new(FixedClock::on(date)))
    }

    #[test]
    fn last_month_is_the_previous_calendar_month() {
        let resolver = on(2025, 3, 15);
        assert_eq!(
            resolver.resolve("last month", "created_at"),
            "strftime('%Y-%m', created_at) = '2025-02'"
        );
        assert_eq!(
            resolver.resolve("sales this month", "i.created_at"),
            "strftime('%Y-%m', i.created_at) = '2025-03'"
        );
    }

    #[test]
    fn complete_months_exclude_the_current_month() {
        let resolver = on(2025, 3, 15);
        assert_eq!(
            resolver.resolve("2 complete months", "created_at"),
            "DATE(created_at) >= DATE('2025-01-01') AND DATE(created_at) < DATE('2025-03-01')"
        );
        assert_eq!(
            resolver.resolve("customers in the last 2 complete months", "created_at"),
            "DATE(created_at) >= DATE('2025-01-01') AND DATE(created_at) < DATE('2025-03-01')"
        );
    }

    #[test]
    fn counted_periods_include_the_current_partial_period() {
        let resolver = on(2025, 3, 15);
        assert_eq!(
            resolver.resolve("last 2 months", "c"),
            "DATE(c) >= DATE('2025-02-01') AND DATE(c) <= DATE('2025-03-15')"
        );
        // 2025-03-15 is a Saturday, so the current week began on Sunday the 9th.
        assert_eq!(
            resolver.resolve("past 2 weeks", "c"),
            "DATE(c) >= DATE('2025-03-02') AND DATE(c) <= DATE('2025-03-15')"
        );
        assert_eq!(
            resolver.resolve("last 10 days", "c"),
            "DATE(c) >= DATE('2025-03-05') AND DATE(c) <= DATE('2025-03-15')"
        );
    }

    #[test]
    fn complete_weeks_use_sunday_aligned_boundaries() {
        let resolver = on(2025, 3, 15);
        assert_eq!(
            resolver.resolve("3 complete weeks", "c"),
            "DATE(c) >= DATE('2025-02-16') AND DATE(c) < DATE('2025-03-09')"
        );
    }

    #[test]
    fn week_number_is_zero_padded() {
        let resolver = on(2025, 3, 15);
        assert_eq!(
            resolver.resolve("week 45", "created_at"),
            "strftime('%W', created_at) = '45'"
        );
        assert_eq!(
            resolver.resolve("sales in week 5", "created_at"),
            "strftime('%W', created_at) = '05'"
        );
    }

    #[test]
    fn impossible_week_numbers_yield_no_constraint() {
        let resolver = on(2025, 3, 15);
        assert_eq!(resolver.resolve("sales in week 99", "c"), "");
        assert_eq!(resolver.resolve("week 100", "c"), "");
        assert_eq!(resolver.resolve("week 53", "c"), "strftime('%W', c) = '53'");
    }

    #[test]
    fn counts_past_a_century_yield_no_constraint() {
        let resolver = on(2025, 3, 15);
        assert_eq!(resolver.resolve("last 100000 years", "c"), "");
        assert_eq!(resolver.resolve("last 1201 months", "c"), "");
        assert_eq!(resolver.resolve("last 99999999999 days", "c"), "");
        assert_eq!(
            resolver.resolve("last 100 years", "c"),
            "DATE(c) >= DATE('1926-01-01') AND DATE(c) <= DATE('2025-03-15')"
        );
    }

    #[test]
    fn explicit_range_ignores_now() {
        for resolver in [on(2025, 3, 15), on(2030, 12, 1)] {
            assert_eq!(
                resolver.resolve("from 1 jan 2024 to 15 jan 2024", "created_at"),
                "DATE(created_at) BETWEEN DATE('2024-01-01') AND DATE('2024-01-15')"
            );
        }
    }

    #[test]
    fn explicit_range_supports_numeric_and_ordinal_forms() {
        let resolver = on(2025, 3, 15);
        assert_eq!(
            resolver.resolve("sales from 12-11-2024 to 15/12/2024", "d"),
            "DATE(d) BETWEEN DATE('2024-11-12') AND DATE('2024-12-15')"
        );
        assert_eq!(
            resolver.resolve("from 12th nov to 15th december", "d"),
            "DATE(d) BETWEEN DATE('2025-11-12') AND DATE('2025-12-15')"
        );
        assert_eq!(
            resolver.resolve("from november 3 to 2024-11-20 for customers", "d"),
            "DATE(d) BETWEEN DATE('2025-11-03') AND DATE('2024-11-20')"
        );
    }

    #[test]
    fn unparseable_range_falls_through() {
        let resolver = on(2025, 3, 15);
        assert_eq!(resolver.resolve("from kurnool to nandyal", "d"), "");
        assert_eq!(
            resolver.resolve("from kurnool to nandyal 2024", "d"),
            "strftime('%Y', d) = '2024'"
        );
    }

    #[test]
    fn weekdays_win_over_the_generic_day_unit() {
        let resolver = on(2025, 3, 15);
        assert_eq!(
            resolver.resolve("customers on wednesday", "c"),
            "strftime('%w', c) = '3'"
        );
        assert_eq!(resolver.resolve("sales sun", "c"), "strftime('%w', c) = '0'");
    }

    #[test]
    fn month_names_match_whole_words_only() {
        let resolver = on(2025, 3, 15);
        assert_eq!(
            resolver.resolve("invoice november 2024", "c"),
            "strftime('%m', c) = '11'"
        );
        assert_eq!(resolver.resolve("dec sales", "c"), "strftime('%m', c) = '12'");
        assert_eq!(resolver.resolve("decoration items", "c"), "");
    }

    #[test]
    fn bare_year_in_range() {
        let resolver = on(2025, 3, 15);
        assert_eq!(resolver.resolve("revenue 2024", "c"), "strftime('%Y', c) = '2024'");
        assert_eq!(resolver.resolve("revenue 1999", "c"), "");
    }

    #[test]
    fn fixed_phrases_use_the_injected_day() {
        let resolver = on(2025, 3, 15);
        assert_eq!(resolver.resolve("sales today", "c"), "DATE(c) = DATE('2025-03-15')");
        assert_eq!(
            resolver.resolve("sales yesterday", "c"),
            "DATE(c) = DATE('2025-03-14')"
        );
        assert_eq!(
            resolver.resolve("last week", "c"),
            "DATE(c) >= DATE('2025-03-02') AND DATE(c) < DATE('2025-03-09')"
        );
        assert_eq!(resolver.resolve("this week", "c"), "DATE(c) >= DATE('2025-03-09')");
        assert_eq!(resolver.resolve("last year", "c"), "strftime('%Y', c) = '2024'");
        assert_eq!(resolver.resolve("this year", "c"), "strftime('%Y', c) = '2025'");
    }

    #[test]
    fn bare_units_without_qualifier() {
        let resolver = on(2025, 3, 15);
        assert_eq!(
            resolver.resolve("customer month", "c"),
            "strftime('%Y-%m', c) = '2025-03'"
        );
        assert_eq!(resolver.resolve("sales per day", "c"), "");
        assert_eq!(resolver.resolve("weekly report", "c"), "");
    }

    #[test]
    fn last_month_in_january_wraps_the_year() {
        let resolver = on(2025, 1, 10);
        assert_eq!(
            resolver.resolve("last month", "c"),
            "strftime('%Y-%m', c) = '2024-12'"
        );
    }

    #[test]
    fn unrecognized_text_yields_no_constraint() {
        let resolver = on(2025, 3, 15);
        assert_eq!(resolver.resolve("top selling products", "c"), "");
    }
}
