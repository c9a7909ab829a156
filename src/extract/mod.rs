//! Field extraction: sections → record entries.
//!
//! One pure extractor per section kind. Extractors see only the lines of
//! their own sections and never fail: anything they cannot make sense of
//! comes back as a [`Warning`].

mod dates;
mod entries;
mod header;
mod lists;
mod patterns;

pub use dates::{find_date_range, is_date_line, month_number, parse_date_range, parse_single_date};
pub use entries::{
    extract_certifications, extract_education, extract_projects, extract_volunteer, extract_work,
    parse_degree, split_blocks, split_highlights, split_title_company, Parsed,
};
pub use header::{classify_url, extract_basics, extract_summary, hobbies_marker, label_hobbies};
pub use lists::{extract_interests, extract_languages, extract_skills, split_items};
pub use patterns::{find_phone, is_location_text, is_noise_line, normalize_key};

use crate::model::{ResumeRecord, UnrecognizedSection, Warning};
use crate::parser::{FieldOptions, Section, SectionKind};

/// A record built from the PDF alone, plus the warnings raised on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldExtraction {
    pub record: ResumeRecord,
    pub warnings: Vec<Warning>,
}

impl FieldExtraction {
    fn take<T>(&mut self, kind: SectionKind, section: &Section, parsed: Parsed<T>) -> Vec<T> {
        self.warnings.extend(parsed.warnings);
        if parsed.entries.is_empty() {
            self.no_entries(kind, section);
        }
        parsed.entries
    }

    fn no_entries(&mut self, kind: SectionKind, section: &Section) {
        self.warnings
            .push(Warning::section_parse(kind, section.heading_text(), "no entries"));
    }
}

/// Run every field extractor over `sections`.
pub fn extract_fields(sections: &[Section], options: &FieldOptions) -> FieldExtraction {
    let mut out = FieldExtraction::default();

    let (basics, warnings) = extract_basics(sections);
    out.record.basics = basics;
    out.record.basics.summary = extract_summary(sections);
    out.warnings.extend(warnings);

    for section in sections {
        let body = section.body();
        match section.kind {
            SectionKind::Header => {}
            SectionKind::Summary => {
                if body.iter().all(|l| is_noise_line(&l.text)) {
                    out.no_entries(SectionKind::Summary, section);
                }
            }
            SectionKind::Experience => {
                let entries = out.take(section.kind, section, extract_work(body, options));
                out.record.work.extend(entries);
            }
            SectionKind::Volunteer => {
                let entries = out.take(section.kind, section, extract_volunteer(body, options));
                out.record.volunteer.extend(entries);
            }
            SectionKind::Education => {
                let entries = out.take(section.kind, section, extract_education(body, options));
                out.record.education.extend(entries);
            }
            SectionKind::Projects => {
                let entries = out.take(section.kind, section, extract_projects(body, options));
                out.record.projects.extend(entries);
            }
            SectionKind::Certifications => {
                let entries = out.take(section.kind, section, extract_certifications(body));
                out.record.certificates.extend(entries);
            }
            SectionKind::Skills => {
                let entries = list(extract_skills(body));
                let entries = out.take(section.kind, section, entries);
                out.record.skills.extend(entries);
            }
            SectionKind::Languages => {
                let entries = list(extract_languages(body));
                let entries = out.take(section.kind, section, entries);
                out.record.languages.extend(entries);
            }
            SectionKind::Interests => {
                let entries = list(extract_interests(body));
                let entries = out.take(section.kind, section, entries);
                out.record.interests.extend(entries);
            }
            SectionKind::Unknown => {
                let heading = section.heading_text().map(str::to_string);
                out.warnings.push(Warning::section_parse(
                    SectionKind::Unknown,
                    heading.as_deref(),
                    "heading not recognized",
                ));
                out.record.unrecognized.push(UnrecognizedSection {
                    heading,
                    lines: body
                        .iter()
                        .map(|l| l.trimmed())
                        .filter(|t| !is_noise_line(t))
                        .map(str::to_string)
                        .collect(),
                });
            }
        }
    }

    dedupe_lists(&mut out.record);

    if let Some(summary) = out.record.basics.summary.take() {
        let marker = hobbies_marker(sections);
        let labelled = label_hobbies(&summary, &out.record.interests, marker.as_deref());
        out.record.basics.summary = Some(labelled);
    }

    log::debug!(
        "fields: {} work, {} education, {} skills, {} warnings",
        out.record.work.len(),
        out.record.education.len(),
        out.record.skills.len(),
        out.warnings.len()
    );
    for warning in &out.warnings {
        log::warn!("{}", warning);
    }
    out
}

fn list<T>(entries: Vec<T>) -> Parsed<T> {
    Parsed {
        entries,
        warnings: Vec::new(),
    }
}

/// List sections may repeat across pages; keep the first spelling.
fn dedupe_lists(record: &mut ResumeRecord) {
    fn dedupe<T>(items: &mut Vec<T>, key: impl Fn(&T) -> String) {
        let mut seen = std::collections::HashSet::new();
        items.retain(|item| seen.insert(key(item)));
    }
    dedupe(&mut record.skills, |s| normalize_key(&s.name));
    dedupe(&mut record.languages, |l| normalize_key(&l.language));
    dedupe(&mut record.interests, |i| normalize_key(&i.name));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{segment, Fragment, LayoutOptions, Line, SegmentOptions};

    fn line(text: &str, y: f32, size: f32) -> Line {
        Line::from_fragments(
            vec![Fragment::new(text, 1, 50.0, y, size)],
            0,
            &LayoutOptions::default(),
        )
    }

    #[test]
    fn test_unknown_section_kept_and_warned() {
        let sections = segment(
            vec![
                line("Jane Doe", 780.0, 10.0),
                line("Honors & Awards", 760.0, 14.0),
                line("Dean's list, every single semester of the degree", 740.0, 10.0),
            ],
            &SegmentOptions::default(),
        );
        let out = extract_fields(&sections, &FieldOptions::default());

        assert_eq!(out.record.unrecognized.len(), 1);
        assert_eq!(
            out.record.unrecognized[0].heading.as_deref(),
            Some("Honors & Awards")
        );
        assert!(out.warnings.iter().any(|w| matches!(
            w,
            Warning::SectionParse { section: SectionKind::Unknown, .. }
        )));
    }

    #[test]
    fn test_empty_section_warns() {
        let sections = segment(
            vec![
                line("Jane Doe wrote a fairly long body line here", 780.0, 10.0),
                line("Skills", 760.0, 14.0),
                line("Page 1 of 1", 740.0, 10.0),
            ],
            &SegmentOptions::default(),
        );
        let out = extract_fields(&sections, &FieldOptions::default());
        assert!(out.record.skills.is_empty());
        assert!(out.warnings.iter().any(|w| matches!(
            w,
            Warning::SectionParse { section: SectionKind::Skills, .. }
        )));
    }

    #[test]
    fn test_interests_labelled_in_summary() {
        let sections = segment(
            vec![
                line("Jane Doe", 780.0, 10.0),
                line("Summary", 760.0, 14.0),
                line("I build databases and climb on weekends.", 740.0, 10.0),
                line("Interests", 720.0, 14.0),
                line("Chess, Climbing", 700.0, 10.0),
            ],
            &SegmentOptions::default(),
        );
        let out = extract_fields(&sections, &FieldOptions::default());

        assert_eq!(out.record.interests.len(), 2);
        assert_eq!(
            out.record.basics.summary.as_deref(),
            Some("I build databases and climb on weekends. Hobbies: Chess, Climbing")
        );
    }
}
