//! Block-structured sections: experience, volunteer, education, projects
//! and certifications.
//!
//! A section body is first cut into entry blocks ([`split_blocks`]), then
//! each block is read top to bottom: header lines, a date line, and the
//! description. A malformed block yields a warning, never an error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{
    CertificationEntry, EducationEntry, ProjectEntry, VolunteerEntry, Warning, WorkEntry,
};
use crate::parser::{FieldOptions, Line, SectionKind};

use super::dates::{find_date_range, is_date_line, parse_date_range, take_embedded_range};
use super::patterns::{
    clean, contains_role_keyword, is_bullet_line, is_duration_line, is_employment_type_line,
    is_location_text, is_noise_line, strip_bullet, URL,
};

static AT_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+at\s+").unwrap());

/// `(2014)` or `2014)` left over when a degree line wraps.
static TRAILING_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(?\d{4}\)?$").unwrap());

static PAREN_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^()]*\d{4}[^()]*\)?").unwrap());

const COMPANY_SUFFIXES: &[&str] = &[" Inc", " LLC", " Ltd", " GmbH", " AG", " Oy", " S.A.", " B.V.", " Corp"];

/// Description labels carrying no content of their own.
const LABEL_LINES: &[&str] = &[
    "achievements",
    "achievements:",
    "main responsibilities:",
    "responsibilities:",
    "key achievements:",
];

/// Entries of one section plus what went wrong along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub entries: Vec<T>,
    pub warnings: Vec<Warning>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Date on the line itself or in parentheses inside it.
fn mentions_date(text: &str) -> bool {
    is_date_line(text) || take_embedded_range(text).is_some()
}

fn is_label_line(text: &str) -> bool {
    LABEL_LINES.contains(&text.trim().to_lowercase().as_str())
}

/// Company name, role, or a capitalized multi-word line.
fn looks_like_header(text: &str) -> bool {
    let text = text.trim();
    if text.ends_with('.') || text.ends_with(':') {
        return false;
    }
    if contains_role_keyword(text) || COMPANY_SUFFIXES.iter().any(|s| text.contains(s)) {
        return true;
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    let caps = words
        .iter()
        .filter(|w| w.chars().next().map(char::is_uppercase).unwrap_or(false))
        .count();
    !words.is_empty() && caps >= (words.len() / 2).max(1)
}

/// Median vertical distance between consecutive lines sharing a page and column.
fn median_spacing(lines: &[&Line]) -> Option<f32> {
    let mut gaps: Vec<f32> = lines
        .windows(2)
        .filter(|w| w[0].page == w[1].page && w[0].column == w[1].column)
        .map(|w| w[0].y - w[1].y)
        .filter(|g| *g > 0.0)
        .collect();
    if gaps.is_empty() {
        return None;
    }
    gaps.sort_by(|a, b| a.total_cmp(b));
    Some(gaps[gaps.len() / 2])
}

/// Whether line `i` opens an entry by shape: a header followed by a
/// duration or date line.
fn starts_entry(lines: &[&Line], dated: &[bool], i: usize) -> bool {
    let text = lines[i].trimmed();
    if text.is_empty()
        || dated[i]
        || is_bullet_line(text)
        || is_label_line(text)
        || text.chars().count() > 60
    {
        return false;
    }
    let next = lines.get(i + 1).map(|l| l.trimmed()).unwrap_or("");
    if is_duration_line(next) {
        return true;
    }
    if dated.get(i + 1).copied().unwrap_or(false) {
        let prev = i.checked_sub(1).map(|p| lines[p].trimmed()).unwrap_or("");
        return !is_duration_line(prev);
    }
    dated.get(i + 2).copied().unwrap_or(false)
        && !is_duration_line(next)
        && !dated[i + 1]
        && (lines[i].is_bold || looks_like_header(text))
}

/// Cut a section body into entry blocks.
///
/// A block starts at a non-bold to bold transition, at a vertical gap wider
/// than `block_gap_ratio` times the median line spacing, or at a header
/// line followed by a date. When the section carries dates, a block only
/// ends once it has one, and only where a date follows within
/// `date_lookahead` lines.
pub fn split_blocks<'a>(lines: &[&'a Line], options: &FieldOptions) -> Vec<Vec<&'a Line>> {
    let Some((&first, rest)) = lines.split_first() else {
        return Vec::new();
    };

    let dated: Vec<bool> = lines.iter().map(|l| mentions_date(&l.text)).collect();
    let any_dates = dated.iter().any(|&d| d);
    let gap_limit = median_spacing(lines).map(|s| s * options.block_gap_ratio);

    let mut blocks: Vec<Vec<&Line>> = Vec::new();
    let mut current = vec![first];
    let mut current_dated = dated[0];

    for (offset, &line) in rest.iter().enumerate() {
        let i = offset + 1;
        let prev = lines[i - 1];

        let bold_start = line.is_bold && !prev.is_bold;
        let gap_start = prev.page == line.page
            && prev.column == line.column
            && gap_limit.map(|limit| prev.y - line.y > limit).unwrap_or(false);

        let split = if any_dates {
            let date_ahead = (i..=i + options.date_lookahead)
                .any(|j| dated.get(j).copied().unwrap_or(false));
            current_dated
                && date_ahead
                && !is_bullet_line(&line.text)
                && (bold_start || gap_start || starts_entry(lines, &dated, i))
        } else {
            bold_start || gap_start
        };

        if split {
            blocks.push(std::mem::take(&mut current));
            current_dated = false;
        }
        current.push(line);
        current_dated |= dated[i];
    }
    blocks.push(current);

    log::debug!("split {} lines into {} blocks", lines.len(), blocks.len());
    blocks
}

/// Non-noise lines of a body.
fn content_lines(lines: &[Line]) -> Vec<&Line> {
    lines.iter().filter(|l| !is_noise_line(&l.text)).collect()
}

fn block_texts<'a>(block: &[&'a Line]) -> Vec<&'a str> {
    block
        .iter()
        .map(|l| l.trimmed())
        .filter(|t| !t.is_empty() && !is_label_line(t))
        .collect()
}

fn raw_text(texts: &[&str]) -> String {
    texts.join(" / ")
}

fn opt(text: &str) -> Option<String> {
    let text = clean(text);
    (!text.is_empty()).then_some(text)
}

/// Bullet and dash lines become highlights (continuation lines join the
/// last one); everything else is summary text.
pub fn split_highlights(texts: &[&str]) -> (Vec<String>, Option<String>) {
    let mut highlights: Vec<String> = Vec::new();
    let mut summary: Vec<&str> = Vec::new();
    let mut in_highlight = false;

    for &text in texts {
        if is_label_line(text) {
            continue;
        }
        if is_bullet_line(text) {
            let item = strip_bullet(text);
            if !item.is_empty() {
                highlights.push(item.to_string());
                in_highlight = true;
            }
        } else if in_highlight {
            if let Some(last) = highlights.last_mut() {
                last.push(' ');
                last.push_str(text.trim());
            }
        } else {
            summary.push(text.trim());
        }
    }

    (highlights, opt(&summary.join(" ")))
}

/// `Title at Company`, or title on the first line and company on the
/// second with any `· Full-time` tail dropped.
pub fn split_title_company(texts: &[&str]) -> (Option<String>, Option<String>) {
    let Some(first) = texts.first() else {
        return (None, None);
    };
    let parts: Vec<&str> = AT_SPLIT.splitn(first, 2).collect();
    if let [title, company] = parts.as_slice() {
        return (opt(title), opt(company));
    }
    let company = texts
        .get(1)
        .and_then(|t| t.split('·').next())
        .and_then(opt);
    (opt(first), company)
}

/// Single capitalized word such as `Berlin` or `Remote`.
fn is_place_word(text: &str) -> bool {
    let text = text.trim();
    text.chars().count() <= 20
        && text.chars().all(char::is_alphabetic)
        && text.chars().next().map(char::is_uppercase).unwrap_or(false)
        && !contains_role_keyword(text)
}

/// Company grouping state carried across work blocks.
#[derive(Default)]
struct WorkContext {
    last_company: Option<String>,
}

fn parse_work_block(
    texts: &[&str],
    ctx: &mut WorkContext,
    warnings: &mut Vec<Warning>,
) -> Option<WorkEntry> {
    let texts: Vec<&str> = texts
        .iter()
        .copied()
        .filter(|t| !is_employment_type_line(t))
        .collect();
    if texts.is_empty() {
        return None;
    }

    let date_idx = texts.iter().position(|t| is_date_line(t));
    let (header, content): (Vec<&str>, Vec<&str>) = match date_idx {
        Some(idx) => (texts[..idx].to_vec(), texts[idx + 1..].to_vec()),
        None => {
            let n = texts.iter().take(2).take_while(|t| !is_bullet_line(t)).count();
            (texts[..n].to_vec(), texts[n..].to_vec())
        }
    };

    let header: Vec<&str> = header.into_iter().filter(|t| !is_duration_line(t)).collect();
    let mut content: Vec<&str> = content.into_iter().filter(|t| !is_duration_line(t)).collect();

    let (company, position) = match header.as_slice() {
        [] => (ctx.last_company.clone(), None),
        [single] => match split_title_company(&[*single]) {
            (position, Some(company)) => (Some(company), position),
            (position, None) => (ctx.last_company.clone(), position),
        },
        [first, second, extra @ ..] => {
            let tail = std::mem::take(&mut content);
            content = extra.iter().copied().chain(tail).collect();
            if AT_SPLIT.is_match(first) {
                let (position, company) = split_title_company(&[*first, *second]);
                (company, position)
            } else {
                (opt(first), opt(second))
            }
        }
    };

    if company.is_none() && position.is_none() {
        warnings.push(Warning::entry_parse(
            SectionKind::Experience,
            raw_text(&texts),
            "no title or organisation",
        ));
    }
    if company.is_some() {
        ctx.last_company = company.clone();
    }

    let dates = date_idx
        .map(|idx| parse_date_range(texts[idx]))
        .unwrap_or_default();
    if dates.raw.is_some() {
        warnings.push(Warning::entry_parse(
            SectionKind::Experience,
            date_idx.map(|idx| texts[idx]).unwrap_or_default(),
            "unparseable date range",
        ));
    }

    let location = match content.first() {
        Some(first) if is_location_text(first) || is_place_word(first) => {
            let location = opt(first);
            content.remove(0);
            location
        }
        _ => None,
    };
    let (highlights, summary) = split_highlights(&content);

    Some(WorkEntry {
        name: company,
        position,
        location,
        dates,
        summary,
        highlights,
    })
}

/// Positions held, with company grouping across blocks.
pub fn extract_work(lines: &[Line], options: &FieldOptions) -> Parsed<WorkEntry> {
    let mut parsed = Parsed::default();
    let mut ctx = WorkContext::default();

    for block in split_blocks(&content_lines(lines), options) {
        let texts = block_texts(&block);
        if let Some(entry) = parse_work_block(&texts, &mut ctx, &mut parsed.warnings) {
            parsed.entries.push(entry);
        }
    }
    parsed
}

/// Volunteer roles: `Role at Org` or role and organisation on two lines.
pub fn extract_volunteer(lines: &[Line], options: &FieldOptions) -> Parsed<VolunteerEntry> {
    let mut parsed = Parsed::default();

    for block in split_blocks(&content_lines(lines), options) {
        let texts: Vec<&str> = block_texts(&block)
            .into_iter()
            .filter(|t| !is_duration_line(t) && !is_employment_type_line(t))
            .collect();
        if texts.is_empty() {
            continue;
        }

        let date_line = texts.iter().copied().find(|t| is_date_line(t));
        let rest: Vec<&str> = texts
            .iter()
            .copied()
            .filter(|t| Some(*t) != date_line)
            .collect();
        let header = rest.iter().take(2).take_while(|t| !is_bullet_line(t)).count();
        let (position, organization) = split_title_company(&rest[..header]);
        if position.is_none() && organization.is_none() {
            parsed.warnings.push(Warning::entry_parse(
                SectionKind::Volunteer,
                raw_text(&texts),
                "no role or organisation",
            ));
        }

        let consumed = match rest.first() {
            Some(first) if header > 0 && AT_SPLIT.is_match(first) => 1,
            _ => header,
        };
        let (highlights, summary) = split_highlights(&rest[consumed..]);

        let dates = date_line.map(parse_date_range).unwrap_or_default();
        if let (Some(line), true) = (date_line, dates.raw.is_some()) {
            parsed.warnings.push(Warning::entry_parse(
                SectionKind::Volunteer,
                line,
                "unparseable date range",
            ));
        }

        parsed.entries.push(VolunteerEntry {
            organization,
            position,
            dates,
            summary,
            highlights,
        });
    }
    parsed
}

const DEGREE_PREFIXES: &[&str] = &[
    "bachelor",
    "master",
    "doctor",
    "magist",
    "licenci",
    "diplom",
    "бакалавр",
    "магистр",
    "специалист",
    "кандидат",
];

const DEGREE_TOKENS: &[&str] = &[
    "phd", "ph.d", "bsc", "b.sc", "msc", "m.sc", "mba", "ba", "ma", "bs", "ms", "beng", "meng",
    "degree", "licence", "abitur",
];

/// Whether any token of `text` names a degree.
fn has_degree_keyword(text: &str) -> bool {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '.' || c == '\''))
        .map(|t| t.trim_matches(|c| c == '.' || c == '\''))
        .filter(|t| !t.is_empty())
        .any(|t| {
            DEGREE_TOKENS.contains(&t) || DEGREE_PREFIXES.iter().any(|p| t.starts_with(p))
        })
}

/// A degree line: has a date range, a `(YYYY` year, or a degree word.
pub fn looks_like_degree_line(text: &str) -> bool {
    mentions_date(text) || PAREN_YEAR.is_match(text) || has_degree_keyword(text)
}

/// `(study_type, area)` from `Degree, Area` or `Degree in Area`.
pub fn parse_degree(line: &str) -> (Option<String>, Option<String>) {
    let stripped = PAREN_YEAR.replace_all(line, "");
    let line = clean(&stripped.replace('·', " "));
    if line.is_empty() {
        return (None, None);
    }

    if let Some((left, right)) = line.split_once(',') {
        if has_degree_keyword(left) {
            return (opt(left), opt(right));
        }
    }

    static IN_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+in\s+").unwrap());
    let parts: Vec<&str> = IN_SPLIT.splitn(&line, 2).collect();
    if let [degree, area] = parts.as_slice() {
        return (opt(degree), opt(area));
    }
    (opt(&line), None)
}

/// Split a block with no bold cues into institution + degree pairs.
fn split_education_pairs<'a>(texts: &[&'a str]) -> Vec<Vec<&'a str>> {
    let mut groups: Vec<Vec<&str>> = Vec::new();
    let mut prev_degree = false;
    for &text in texts {
        let is_degree = looks_like_degree_line(text);
        let trailing = TRAILING_YEAR.is_match(text.trim());
        match groups.last_mut() {
            Some(group) if is_degree || trailing || !prev_degree => group.push(text),
            _ => groups.push(vec![text]),
        }
        prev_degree = is_degree || trailing;
    }
    groups
}

fn parse_education_texts(texts: &[&str], warnings: &mut Vec<Warning>) -> Option<EducationEntry> {
    let (institution, rest) = texts.split_first()?;

    let mut degree_line: Option<String> = None;
    let mut dates = None;
    let mut highlights: Vec<String> = Vec::new();
    let mut location = None;

    let mut i = 0;
    while i < rest.len() {
        let text = rest[i];
        if degree_line.is_none() && looks_like_degree_line(text) && !is_date_line(text) {
            let mut joined = text.to_string();
            if let Some(next) = rest.get(i + 1).filter(|t| TRAILING_YEAR.is_match(t.trim())) {
                joined.push(' ');
                joined.push_str(next.trim());
                i += 1;
            }
            if let Some((range, remainder)) = take_embedded_range(&joined) {
                dates = Some(range);
                joined = remainder;
            }
            degree_line = Some(joined);
        } else if dates.is_none() && is_date_line(text) {
            dates = Some(parse_date_range(text));
        } else if location.is_none() && highlights.is_empty() && is_location_text(text) {
            location = opt(text);
        } else if is_bullet_line(text) {
            highlights.push(strip_bullet(text).to_string());
        } else {
            highlights.push(clean(text));
        }
        i += 1;
    }

    let dates = dates.unwrap_or_default();
    if dates.raw.is_some() {
        warnings.push(Warning::entry_parse(
            SectionKind::Education,
            raw_text(texts),
            "unparseable date range",
        ));
    }

    let (study_type, area) = degree_line
        .as_deref()
        .map(parse_degree)
        .unwrap_or((None, None));

    Some(EducationEntry {
        institution: opt(institution),
        area,
        study_type,
        location,
        dates,
        highlights,
    })
}

/// Schools and degrees.
pub fn extract_education(lines: &[Line], options: &FieldOptions) -> Parsed<EducationEntry> {
    let mut parsed = Parsed::default();

    for block in split_blocks(&content_lines(lines), options) {
        let texts = block_texts(&block);
        let groups = if block.iter().any(|l| l.is_bold) {
            vec![texts]
        } else {
            split_education_pairs(&texts)
        };
        for group in groups {
            if let Some(entry) = parse_education_texts(&group, &mut parsed.warnings) {
                parsed.entries.push(entry);
            }
        }
    }
    parsed
}

/// Projects: name, optional dates and URL, description and highlights.
pub fn extract_projects(lines: &[Line], options: &FieldOptions) -> Parsed<ProjectEntry> {
    let mut parsed = Parsed::default();

    for block in split_blocks(&content_lines(lines), options) {
        let texts = block_texts(&block);
        let Some((name, rest)) = texts.split_first() else {
            continue;
        };

        let mut entry = ProjectEntry {
            name: clean(name),
            ..Default::default()
        };
        let mut description: Vec<&str> = Vec::new();
        for &text in rest {
            if entry.dates.is_empty() && is_date_line(text) {
                entry.dates = parse_date_range(text);
                if entry.dates.raw.is_some() {
                    parsed.warnings.push(Warning::entry_parse(
                        SectionKind::Projects,
                        text,
                        "unparseable date range",
                    ));
                }
            } else if entry.url.is_none() && URL.is_match(text) && text.split_whitespace().count() == 1 {
                entry.url = Some(text.trim().to_string());
            } else {
                description.push(text);
            }
        }
        let (highlights, summary) = split_highlights(&description);
        entry.description = summary;
        entry.highlights = highlights;
        parsed.entries.push(entry);
    }
    parsed
}

/// Wrapped certification name: `(...)`, `- ...`, or a `Specialization` tail.
fn is_cert_continuation(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    lowered.starts_with('(') || lowered.starts_with('-') || lowered.contains("specialization")
}

/// One certification per line, joining wrapped continuations.
pub fn extract_certifications(lines: &[Line]) -> Parsed<CertificationEntry> {
    let mut parsed: Parsed<CertificationEntry> = Parsed::default();

    for line in content_lines(lines) {
        let text = line.trimmed();
        if text.is_empty() {
            continue;
        }

        if is_date_line(text) {
            match parsed.entries.last_mut() {
                Some(last) if last.date.is_none() => {
                    last.date = find_date_range(text).and_then(|r| r.start);
                }
                _ => parsed.warnings.push(Warning::entry_parse(
                    SectionKind::Certifications,
                    text,
                    "date line without a certification",
                )),
            }
            continue;
        }

        match parsed.entries.last_mut() {
            Some(last) if is_cert_continuation(text) => {
                last.name.push(' ');
                last.name.push_str(text);
            }
            _ => parsed.entries.push(CertificationEntry {
                name: clean(text),
                ..Default::default()
            }),
        }
    }
    parsed
}
