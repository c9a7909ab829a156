//! Identity and contact extraction from the header block.
//!
//! A profile export spreads identity over two places: the sidebar `Contact`
//! block (email, phone, profile links) and the top of the main column
//! (name, headline, location). Both end up in [`SectionKind::Header`]
//! sections; this module reads them together. Each candidate line is
//! consumed by at most one field, first match wins.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::model::{Basics, InterestEntry, Location, Profile, Warning};
use crate::parser::{Line, Opener, Section, SectionKind};

use super::patterns::{
    clean, find_phone, is_location_text, is_noise_line, EMAIL, LINKEDIN_HANDLE, PAREN_LABEL, URL,
};

static HOBBIES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bhobbies\b").unwrap());

/// Candidate lines with a consumed flag each.
struct Candidates<'a> {
    lines: Vec<&'a str>,
    used: Vec<bool>,
}

impl<'a> Candidates<'a> {
    fn new(lines: Vec<&'a str>) -> Self {
        let used = vec![false; lines.len()];
        Self { lines, used }
    }

    /// First unconsumed line matching `pred`, consumed.
    fn take(&mut self, pred: impl Fn(&str) -> bool) -> Option<(usize, &'a str)> {
        let idx = (0..self.lines.len()).find(|&i| !self.used[i] && pred(self.lines[i]))?;
        self.used[idx] = true;
        Some((idx, self.lines[idx]))
    }

    fn next_free(&self, after: usize) -> Option<usize> {
        (after + 1..self.lines.len()).find(|&i| !self.used[i])
    }
}

fn is_contact_text(text: &str) -> bool {
    EMAIL.is_match(text) || URL.is_match(text) || LINKEDIN_HANDLE.is_match(text) || find_phone(text).is_some()
}

/// `Contact Jane Doe` when the label and the name share a line.
fn strip_contact_label(text: &str) -> &str {
    let lowered = text.to_lowercase();
    if lowered.starts_with("contact ") {
        text["contact ".len()..].trim()
    } else {
        text
    }
}

/// Header lines in field-matching order: the title section first, then
/// the other header sections in document order.
fn header_lines(sections: &[Section]) -> (Option<&str>, Vec<&str>) {
    let headers = sections.iter().filter(|s| s.kind == SectionKind::Header);
    let title_section = headers.clone().find(|s| s.opener == Opener::Title);

    let title = title_section.and_then(|s| s.heading_text());
    let mut lines: Vec<&str> = Vec::new();
    if let Some(section) = title_section {
        lines.extend(section.body().iter().map(|l| l.trimmed()));
    }
    for section in headers.filter(|s| s.opener != Opener::Title) {
        lines.extend(section.body().iter().map(|l| l.trimmed()));
    }
    lines.retain(|t| !is_noise_line(t));
    (title, lines)
}

/// Build [`Basics`] (without summary) from every header section.
pub fn extract_basics(sections: &[Section]) -> (Basics, Vec<Warning>) {
    let mut basics = Basics::default();
    let mut warnings = Vec::new();

    let (title, lines) = header_lines(sections);
    let mut candidates = Candidates::new(lines);

    let name = match title {
        Some(title) => Some(title.to_string()),
        None => candidates
            .take(|t| !is_contact_text(t) && !is_location_text(t))
            .map(|(_, t)| strip_contact_label(t).to_string()),
    };
    match name.filter(|n| !n.is_empty()) {
        Some(name) => basics.name = Some(clean(&name)),
        None => {
            log::warn!("no identity line in header block");
            warnings.push(Warning::MissingName);
        }
    }

    basics.email = candidates
        .take(|t| EMAIL.is_match(t))
        .and_then(|(_, t)| EMAIL.find(t))
        .map(|m| m.as_str().to_string());

    basics.profiles = take_profiles(&mut candidates);
    basics.url = basics
        .profiles
        .iter()
        .find(|p| p.network == "Website")
        .map(|p| p.url.clone());

    basics.phone = candidates
        .take(|t| !URL.is_match(t) && find_phone(t).is_some())
        .and_then(|(_, t)| find_phone(t));

    basics.location = candidates
        .take(is_location_text)
        .map(|(_, t)| Location::from_text(t));

    basics.headline = candidates
        .take(|t| !is_contact_text(t) && !is_location_text(t) && !is_label_only(t))
        .map(|(_, t)| clean(t));

    log::debug!(
        "header: name={:?} email={} phone={} profiles={}",
        basics.name,
        basics.email.is_some(),
        basics.phone.is_some(),
        basics.profiles.len()
    );

    (basics, warnings)
}

/// `(Mobile)`, `(Home)`, ...
fn is_label_only(text: &str) -> bool {
    PAREN_LABEL.replace(text, "").trim().is_empty()
}

fn take_profiles(candidates: &mut Candidates<'_>) -> Vec<Profile> {
    let mut urls: Vec<String> = Vec::new();

    while let Some((idx, line)) = candidates.take(|t| URL.is_match(t) && !EMAIL.is_match(t)) {
        let Some(found) = URL.find(line) else { continue };
        let mut url = found.as_str().trim_end_matches([')', '.', ',']).to_string();

        // Long profile URLs wrap onto the next line after a hyphen.
        if url.ends_with('-') {
            if let Some(next) = candidates.next_free(idx) {
                let tail = PAREN_LABEL.replace(candidates.lines[next], "");
                let tail = tail.trim();
                if !tail.is_empty() && !tail.contains(char::is_whitespace) {
                    url.push_str(tail);
                    candidates.used[next] = true;
                }
            }
        }
        urls.push(url);
    }

    while let Some((_, line)) = candidates.take(|t| LINKEDIN_HANDLE.is_match(t)) {
        let handle = LINKEDIN_HANDLE
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim());
        if let Some(handle) = handle.filter(|h| !h.to_lowercase().contains("linkedin.com")) {
            urls.push(format!("https://www.linkedin.com/in/{}", handle));
        }
    }

    let mut profiles: Vec<Profile> = Vec::new();
    for url in urls {
        let profile = classify_url(&url);
        let key = profile.url.trim_end_matches('/').to_lowercase();
        let duplicate = profiles
            .iter()
            .any(|p| p.url.trim_end_matches('/').to_lowercase() == key);
        if !duplicate {
            profiles.push(profile);
        }
    }
    profiles
}

/// Network and username for a profile URL. Bare `www.` URLs get `https://`.
pub fn classify_url(raw: &str) -> Profile {
    let url = if raw.to_lowercase().starts_with("http") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let lowered = url.to_lowercase();

    let network = if lowered.contains("linkedin.com") {
        "LinkedIn"
    } else if lowered.contains("github.com") {
        "GitHub"
    } else if lowered.contains("twitter.com") || lowered.contains("x.com/") {
        "Twitter"
    } else {
        "Website"
    };

    let username = match network {
        "Website" => None,
        _ => url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty() && !s.contains('.'))
            .map(str::to_string),
    };

    Profile {
        network: network.to_string(),
        url,
        username,
    }
}

/// The `About` text: body lines of every summary section, joined by spaces.
pub fn extract_summary(sections: &[Section]) -> Option<String> {
    let text = sections
        .iter()
        .filter(|s| s.kind == SectionKind::Summary)
        .flat_map(|s| s.body())
        .map(|l| l.trimmed())
        .filter(|t| !is_noise_line(t))
        .collect::<Vec<_>>()
        .join(" ");
    let text = clean(&text);
    (!text.is_empty()).then_some(text)
}

/// In a two-column export a sidebar `Hobbies:` label can sit next to the
/// main-column text it names. Returns the closest such line at or below
/// the label.
pub fn hobbies_marker(sections: &[Section]) -> Option<String> {
    let lines: Vec<&Line> = sections.iter().flat_map(|s| &s.lines).collect();
    if lines.iter().all(|l| l.column == 0) {
        return None;
    }
    let all = lines.as_slice();

    all.iter()
        .filter(|l| l.text.to_lowercase().contains("hobbies:"))
        .flat_map(move |label| {
            all.iter()
                .filter(move |l| l.page == label.page && l.column != label.column && l.y <= label.y)
                .filter(|l| {
                    let text = l.trimmed();
                    !text.is_empty() && !text.to_lowercase().contains("hobbies")
                })
                .map(move |l| (label.y - l.y, l.trimmed()))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, text)| text.to_string())
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
        .ok()?
        .find(haystack)
        .map(|m| m.start())
}

/// Label the interests inside the `About` text with `Hobbies: `.
///
/// Where the joined interest names already appear in the summary the label
/// goes in front of them, otherwise they are appended. Without interests,
/// `marker` (see [`hobbies_marker`]) is labelled in place. A summary that
/// already mentions hobbies is returned unchanged.
pub fn label_hobbies(summary: &str, interests: &[InterestEntry], marker: Option<&str>) -> String {
    let summary = summary.trim();
    if summary.is_empty() || HOBBIES.is_match(summary) {
        return summary.to_string();
    }

    let names: Vec<&str> = interests
        .iter()
        .map(|i| i.name.trim())
        .filter(|n| !n.is_empty())
        .collect();
    let (needle, append) = if !names.is_empty() {
        (names.join(", "), true)
    } else if let Some(marker) = marker.map(str::trim).filter(|m| !m.is_empty()) {
        (marker.to_string(), false)
    } else {
        return summary.to_string();
    };

    match find_ignore_case(summary, &needle) {
        Some(at) => format!("{}Hobbies: {}", &summary[..at], &summary[at..]),
        None if append => format!("{} Hobbies: {}", summary, needle),
        None => summary.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{segment, Line, LayoutOptions, SegmentOptions, Fragment};

    fn line(text: &str, y: f32, size: f32) -> Line {
        Line::from_fragments(
            vec![Fragment::new(text, 1, 50.0, y, size)],
            0,
            &LayoutOptions::default(),
        )
    }

    fn sections(lines: Vec<Line>) -> Vec<Section> {
        segment(lines, &SegmentOptions::default())
    }

    #[test]
    fn test_basics_from_title_and_contact() {
        let secs = sections(vec![
            line("Contact", 780.0, 13.0),
            line("jane.doe@example.com", 760.0, 10.0),
            line("+1 415 555 0134 (Mobile)", 745.0, 10.0),
            line("www.linkedin.com/in/jane-", 730.0, 10.0),
            line("doe-42 (LinkedIn)", 718.0, 10.0),
            line("Jane Doe", 700.0, 26.0),
            line("Senior Software Engineer at Acme", 680.0, 10.0),
            line("San Francisco, California", 665.0, 10.0),
            line("Some longer body text to weight the body font size", 500.0, 10.0),
            line("More body text to weight the body font size as well", 490.0, 10.0),
        ]);
        let (basics, warnings) = extract_basics(&secs);

        assert!(warnings.is_empty());
        assert_eq!(basics.name.as_deref(), Some("Jane Doe"));
        assert_eq!(basics.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(basics.phone.as_deref(), Some("+1 415 555 0134"));
        assert_eq!(basics.headline.as_deref(), Some("Senior Software Engineer at Acme"));
        let location = basics.location.unwrap();
        assert_eq!(location.city.as_deref(), Some("San Francisco"));
        assert_eq!(location.region.as_deref(), Some("California"));
        assert_eq!(basics.profiles.len(), 1);
        assert_eq!(basics.profiles[0].network, "LinkedIn");
        assert_eq!(basics.profiles[0].url, "https://www.linkedin.com/in/jane-doe-42");
        assert!(basics.url.is_none());
    }

    #[test]
    fn test_name_fallback_without_title() {
        let secs = sections(vec![
            line("jane@example.com", 760.0, 10.0),
            line("Jane Doe", 740.0, 10.0),
            line("Engineer", 720.0, 10.0),
        ]);
        let (basics, warnings) = extract_basics(&secs);
        assert!(warnings.is_empty());
        assert_eq!(basics.name.as_deref(), Some("Jane Doe"));
        assert_eq!(basics.headline.as_deref(), Some("Engineer"));
    }

    #[test]
    fn test_missing_name() {
        let secs = sections(vec![line("jane@example.com", 760.0, 10.0)]);
        let (basics, warnings) = extract_basics(&secs);
        assert!(basics.name.is_none());
        assert_eq!(warnings, vec![Warning::MissingName]);
    }

    #[test]
    fn test_linkedin_handle_and_website() {
        let secs = sections(vec![
            line("Jane Doe", 760.0, 10.0),
            line("janedoe (LinkedIn)", 740.0, 10.0),
            line("https://janedoe.dev (Personal)", 720.0, 10.0),
        ]);
        let (basics, _) = extract_basics(&secs);
        assert_eq!(basics.profiles.len(), 2);
        assert_eq!(basics.profiles[0].network, "Website");
        assert_eq!(basics.url.as_deref(), Some("https://janedoe.dev"));
        assert_eq!(basics.profiles[1].url, "https://www.linkedin.com/in/janedoe");
        assert_eq!(basics.profiles[1].username.as_deref(), Some("janedoe"));
    }

    #[test]
    fn test_classify_url() {
        let p = classify_url("github.com/janedoe");
        assert_eq!(p.network, "GitHub");
        assert_eq!(p.url, "https://github.com/janedoe");
        assert_eq!(p.username.as_deref(), Some("janedoe"));
    }

    #[test]
    fn test_summary_joined() {
        let secs = sections(vec![
            line("Jane Doe", 780.0, 10.0),
            line("Summary", 760.0, 13.0),
            line("Builds reliable systems.", 740.0, 10.0),
            line("Likes Rust.", 728.0, 10.0),
            line("Page 1 of 2", 60.0, 10.0),
        ]);
        assert_eq!(
            extract_summary(&secs).as_deref(),
            Some("Builds reliable systems. Likes Rust.")
        );
    }

    fn at_column(text: &str, column: usize, y: f32) -> Line {
        let x = if column == 0 { 30.0 } else { 250.0 };
        Line::from_fragments(
            vec![Fragment::new(text, 1, x, y, 10.0)],
            column,
            &LayoutOptions::default(),
        )
    }

    fn interests(names: &[&str]) -> Vec<InterestEntry> {
        names
            .iter()
            .map(|n| InterestEntry { name: n.to_string() })
            .collect()
    }

    #[test]
    fn test_label_hobbies_in_place_or_appended() {
        let chess = interests(&["Chess", "Climbing"]);
        assert_eq!(
            label_hobbies("I build databases. chess, climbing on weekends.", &chess, None),
            "I build databases. Hobbies: chess, climbing on weekends."
        );
        assert_eq!(
            label_hobbies("I build databases.", &chess, None),
            "I build databases. Hobbies: Chess, Climbing"
        );
        assert_eq!(
            label_hobbies("My hobbies are chess and climbing.", &chess, None),
            "My hobbies are chess and climbing."
        );
        assert_eq!(label_hobbies("I build databases.", &[], None), "I build databases.");
    }

    #[test]
    fn test_label_hobbies_from_sidebar_marker() {
        let secs = sections(vec![
            at_column("Hobbies:", 0, 500.0),
            at_column("I build databases.", 1, 520.0),
            at_column("Chess and long walks", 1, 498.0),
            at_column("Other text", 1, 480.0),
        ]);
        let marker = hobbies_marker(&secs);
        assert_eq!(marker.as_deref(), Some("Chess and long walks"));
        assert_eq!(
            label_hobbies("I build databases. Chess and long walks", &[], marker.as_deref()),
            "I build databases. Hobbies: Chess and long walks"
        );

        let single = sections(vec![
            line("Hobbies:", 500.0, 10.0),
            line("Chess and long walks", 498.0, 10.0),
        ]);
        assert_eq!(hobbies_marker(&single), None);
    }
}
