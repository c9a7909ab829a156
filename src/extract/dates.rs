//! Date and date-range parsing.
//!
//! Handles the forms a profile export prints (`Jan 2019`, `January 2019`,
//! `2019`, `Jan 2019 - Present`) and the forms side files use
//! (`2021-03-15`, `03/15/2021`, `Mar 15, 2021`). Anything that only
//! partially parses keeps its source text in [`DateRange::raw`].

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{DateBound, DateRange, PartialDate};

static RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?P<start>(?:\p{L}{3,10}\.?\s+)?\d{4})\s*(?:-|–|—|\bto\b|\bbis\b)\s*(?P<end>(?:\p{L}{3,10}\.?\s+)?\d{4}|present|current|today|now|heute|actualidad|presente|aujourd'hui|oggi|heden|hoje|настоящее время|н\.\s*в\.)",
    )
    .unwrap()
});

/// A range whose end never parsed, e.g. `Jan 2019 - ongoing`.
static OPEN_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<start>(?:\p{L}{3,10}\.?\s+)?\d{4})\s*(?:-|–|—)\s*(?P<end>\S.*)$").unwrap()
});

static SINGLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?P<month>\p{L}{3,10})\.?\s+)?(?P<year>\d{4})$").unwrap()
});

/// `Issued Jan 2020`, `Since 2019`, ...
static LABELLED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:issued|since|seit|desde|depuis|dal|с)\s+(?P<date>.+)$").unwrap()
});

const PRESENT_WORDS: &[&str] = &[
    "present",
    "current",
    "today",
    "now",
    "heute",
    "actualidad",
    "presente",
    "aujourd'hui",
    "oggi",
    "heden",
    "hoje",
    "настоящее время",
];

const MONTHS: &[(&str, u32)] = &[
    // English
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("sept", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
    // German
    ("januar", 1),
    ("februar", 2),
    ("märz", 3),
    ("mär", 3),
    ("mai", 5),
    ("juni", 6),
    ("juli", 7),
    ("oktober", 10),
    ("okt", 10),
    ("dezember", 12),
    ("dez", 12),
    // Spanish
    ("enero", 1),
    ("ene", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("abr", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("ago", 8),
    ("septiembre", 9),
    ("setiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
    ("dic", 12),
    // French
    ("janvier", 1),
    ("janv", 1),
    ("février", 2),
    ("févr", 2),
    ("fév", 2),
    ("mars", 3),
    ("avril", 4),
    ("avr", 4),
    ("juin", 6),
    ("juillet", 7),
    ("juil", 7),
    ("août", 8),
    ("septembre", 9),
    ("octobre", 10),
    ("novembre", 11),
    ("décembre", 12),
    ("déc", 12),
    // Russian, nominative and genitive
    ("январь", 1),
    ("января", 1),
    ("февраль", 2),
    ("февраля", 2),
    ("март", 3),
    ("марта", 3),
    ("апрель", 4),
    ("апреля", 4),
    ("май", 5),
    ("мая", 5),
    ("июнь", 6),
    ("июня", 6),
    ("июль", 7),
    ("июля", 7),
    ("август", 8),
    ("августа", 8),
    ("сентябрь", 9),
    ("сентября", 9),
    ("октябрь", 10),
    ("октября", 10),
    ("ноябрь", 11),
    ("ноября", 11),
    ("декабрь", 12),
    ("декабря", 12),
];

/// Three-letter stems, English and Russian.
const MONTH_STEMS: &[(&str, u32)] = &[
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
    ("янв", 1),
    ("фев", 2),
    ("мар", 3),
    ("апр", 4),
    ("май", 5),
    ("июн", 6),
    ("июл", 7),
    ("авг", 8),
    ("сен", 9),
    ("окт", 10),
    ("ноя", 11),
    ("дек", 12),
];

static MONTH_LOOKUP: Lazy<HashMap<&'static str, u32>> =
    Lazy::new(|| MONTHS.iter().copied().collect());

static STEM_LOOKUP: Lazy<HashMap<&'static str, u32>> =
    Lazy::new(|| MONTH_STEMS.iter().copied().collect());

/// Month number for a month name or abbreviation in any supported language.
pub fn month_number(word: &str) -> Option<u32> {
    let word = word.trim().trim_end_matches('.').to_lowercase();
    if let Some(&m) = MONTH_LOOKUP.get(word.as_str()) {
        return Some(m);
    }
    let stem: String = word.chars().take(3).collect();
    if stem.chars().count() < 3 {
        return None;
    }
    STEM_LOOKUP.get(stem.as_str()).copied()
}

fn is_present_word(text: &str) -> bool {
    let lowered = text.trim().trim_end_matches('.').to_lowercase();
    PRESENT_WORDS.contains(&lowered.as_str()) || lowered.starts_with("н.")
}

/// Parse `YYYY`, `Month YYYY`, ISO and numeric full dates.
pub fn parse_single_date(text: &str) -> Option<PartialDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = SINGLE.captures(text) {
        let year: i32 = caps["year"].parse().ok()?;
        return match caps.name("month") {
            None => Some(PartialDate::year(year)),
            Some(m) => PartialDate::year_month(year, month_number(m.as_str())?),
        };
    }

    if let Ok(date) = text.parse::<PartialDate>() {
        return Some(date);
    }

    const FULL_FORMATS: &[&str] = &["%m/%d/%Y", "%d.%m.%Y", "%b %d, %Y", "%B %d, %Y", "%d %b %Y", "%d %B %Y"];
    for fmt in FULL_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return PartialDate::year_month(date.year(), date.month());
        }
    }

    // MM/YYYY
    if let Some((m, y)) = text.split_once('/') {
        if let (Ok(m), Ok(y)) = (m.trim().parse::<u32>(), y.trim().parse::<i32>()) {
            if y >= 1000 {
                return PartialDate::year_month(y, m);
            }
        }
    }

    None
}

/// Best effort: the year when the month word is unknown. The flag is false
/// when information was lost.
fn lenient_date(text: &str) -> (Option<PartialDate>, bool) {
    if let Some(date) = parse_single_date(text) {
        return (Some(date), true);
    }
    let year = text
        .split_whitespace()
        .filter_map(|w| w.parse::<i32>().ok())
        .find(|y| (1000..=9999).contains(y));
    (year.map(PartialDate::year), false)
}

fn parse_bound(text: &str) -> (Option<DateBound>, bool) {
    if is_present_word(text) {
        return (Some(DateBound::Present), true);
    }
    let (date, exact) = lenient_date(text);
    (date.map(DateBound::Date), exact)
}

/// Find and parse a date range anywhere in `text`.
///
/// Returns `None` when the text carries no recognizable range or date.
pub fn find_date_range(text: &str) -> Option<DateRange> {
    let trimmed = text.trim();

    if let Some(caps) = RANGE.captures(trimmed) {
        let (start, start_exact) = lenient_date(&caps["start"]);
        let (end, end_exact) = parse_bound(&caps["end"]);
        let mut range = DateRange::new(start, end);
        if !(start_exact && end_exact) {
            range.raw = Some(trimmed.to_string());
        }
        return Some(range);
    }

    if let Some(caps) = OPEN_RANGE.captures(trimmed) {
        let (start, _) = lenient_date(&caps["start"]);
        let mut range = DateRange::new(start, None);
        range.raw = Some(trimmed.to_string());
        return Some(range);
    }

    parse_single_date(strip_label(trimmed)).map(|d| DateRange::new(Some(d), None))
}

/// Parse a date-range string, keeping the raw text when nothing parses.
pub fn parse_date_range(text: &str) -> DateRange {
    find_date_range(text).unwrap_or_else(|| DateRange::raw(text.trim()))
}

/// Whether a whole line is a date or date range (as opposed to prose
/// that happens to mention a year).
pub fn is_date_line(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() > 80 {
        return false;
    }
    if let Some(m) = RANGE.find(trimmed) {
        // Allow a trailing duration like "(3 years 2 months)".
        let rest = trimmed[m.end()..].trim();
        return m.start() == 0 && (rest.is_empty() || rest.starts_with('(') || rest.starts_with('·'));
    }
    if OPEN_RANGE.is_match(trimmed) && trimmed.split_whitespace().count() <= 6 {
        return true;
    }
    parse_single_date(strip_label(trimmed)).is_some()
}

fn strip_label(text: &str) -> &str {
    LABELLED
        .captures(text)
        .and_then(|c| c.name("date"))
        .map_or(text, |m| m.as_str())
}

/// Parenthesized range embedded in a line, e.g. `Master, CS · (2012 - 2014)`.
/// Returns the range and the text with it removed.
pub fn take_embedded_range(text: &str) -> Option<(DateRange, String)> {
    static EMBEDDED: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\s*[·•]?\s*\((?P<inner>[^()]*\d{4}[^()]*)\)").unwrap());

    let caps = EMBEDDED.captures(text)?;
    let whole = caps.get(0)?;
    let range = find_date_range(&caps["inner"])?;
    let rest = format!("{}{}", &text[..whole.start()], &text[whole.end()..]);
    Some((range, rest.trim().trim_end_matches(['·', ',']).trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(y: i32, m: u32) -> PartialDate {
        PartialDate::year_month(y, m).unwrap()
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("Jan"), Some(1));
        assert_eq!(month_number("September"), Some(9));
        assert_eq!(month_number("Sept."), Some(9));
        assert_eq!(month_number("März"), Some(3));
        assert_eq!(month_number("déc."), Some(12));
        assert_eq!(month_number("января"), Some(1));
        assert_eq!(month_number("Summer"), None);
    }

    #[test]
    fn test_parse_single_date() {
        assert_eq!(parse_single_date("2020"), Some(PartialDate::year(2020)));
        assert_eq!(parse_single_date("Jan 2019"), Some(ym(2019, 1)));
        assert_eq!(parse_single_date("2021-03-15"), Some(ym(2021, 3)));
        assert_eq!(parse_single_date("03/15/2021"), Some(ym(2021, 3)));
        assert_eq!(parse_single_date("Mar 15, 2021"), Some(ym(2021, 3)));
        assert_eq!(parse_single_date("Summer 2019"), None);
        assert_eq!(parse_single_date(""), None);
    }

    #[test]
    fn test_month_year_range() {
        let range = parse_date_range("Jan 2019 - Mar 2021");
        assert_eq!(range.start, Some(ym(2019, 1)));
        assert_eq!(range.end, Some(DateBound::Date(ym(2021, 3))));
        assert!(range.raw.is_none());
    }

    #[test]
    fn test_year_to_present() {
        let range = parse_date_range("2020 - Present");
        assert_eq!(range.start, Some(PartialDate::year(2020)));
        assert_eq!(range.end, Some(DateBound::Present));
        assert!(range.is_complete());
    }

    #[test]
    fn test_unparseable_kept_verbatim() {
        let range = parse_date_range("Summer internship");
        assert_eq!(range.raw.as_deref(), Some("Summer internship"));
        assert!(range.start.is_none());
        assert!(find_date_range("Summer internship").is_none());
    }

    #[test]
    fn test_partial_keeps_raw() {
        let range = parse_date_range("Summer 2019 - Fall 2020");
        assert_eq!(range.start, Some(PartialDate::year(2019)));
        assert_eq!(range.end, Some(DateBound::Date(PartialDate::year(2020))));
        assert_eq!(range.raw.as_deref(), Some("Summer 2019 - Fall 2020"));

        let range = parse_date_range("Jan 2019 - ongoing");
        assert_eq!(range.start, Some(ym(2019, 1)));
        assert!(range.end.is_none());
        assert!(range.raw.is_some());
    }

    #[test]
    fn test_linkedin_style_lines() {
        let range = parse_date_range("January 2019 - Present (5 years 2 months)");
        assert_eq!(range.start, Some(ym(2019, 1)));
        assert_eq!(range.end, Some(DateBound::Present));

        let range = parse_date_range("мая 2018 — настоящее время");
        assert_eq!(range.start, Some(ym(2018, 5)));
        assert_eq!(range.end, Some(DateBound::Present));
    }

    #[test]
    fn test_is_date_line() {
        assert!(is_date_line("Jan 2019 - Mar 2021"));
        assert!(is_date_line("January 2019 - Present (3 years)"));
        assert!(is_date_line("2012 - 2014"));
        assert!(is_date_line("2019"));
        assert!(is_date_line("Issued Mar 2021"));
        assert!(!is_date_line("Led migration of 2019 billing platform"));
        assert!(!is_date_line("Acme Corp"));
    }

    #[test]
    fn test_take_embedded_range() {
        let (range, rest) =
            take_embedded_range("Master of Science - MS, Computer Science · (2012 - 2014)").unwrap();
        assert_eq!(range.start, Some(PartialDate::year(2012)));
        assert_eq!(rest, "Master of Science - MS, Computer Science");
        assert!(take_embedded_range("Bachelor (Honours)").is_none());
    }
}
