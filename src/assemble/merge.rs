//! Asymmetric record merging.
//!
//! Every field of the record has a rule naming the sources allowed to
//! supply it, highest priority first. The PDF comes first everywhere, so a
//! value read from the PDF is never replaced: later sources only fill
//! empty scalars and append list entries whose key is not present yet.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::extract::normalize_key;
use crate::model::{
    CertificationEntry, DateRange, EducationEntry, InterestEntry, LanguageEntry, Location,
    Profile, ProjectEntry, ResumeRecord, SkillEntry, UnrecognizedSection, VolunteerEntry,
    WorkEntry,
};

/// Where a partial record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Pdf,
    PersonalInfo,
    SkillsCsv,
    CertificationsCsv,
    ProjectsCsv,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::Pdf => "pdf",
            Source::PersonalInfo => "personal info",
            Source::SkillsCsv => "skills csv",
            Source::CertificationsCsv => "certifications csv",
            Source::ProjectsCsv => "projects csv",
        };
        f.write_str(name)
    }
}

/// A mergeable field of [`ResumeRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Headline,
    Email,
    Phone,
    Url,
    Summary,
    Location,
    Profiles,
    BirthDate,
    Nationality,
    Work,
    Volunteer,
    Education,
    Skills,
    Certificates,
    Languages,
    Interests,
    Projects,
    Unrecognized,
}

/// Sources allowed to supply `field`, highest priority first.
#[derive(Debug, Clone, Copy)]
pub struct MergeRule {
    pub field: Field,
    pub sources: &'static [Source],
}

const PDF_ONLY: &[Source] = &[Source::Pdf];
const PDF_THEN_PERSONAL: &[Source] = &[Source::Pdf, Source::PersonalInfo];

/// The merge table.
pub const MERGE_RULES: &[MergeRule] = &[
    MergeRule { field: Field::Name, sources: PDF_THEN_PERSONAL },
    MergeRule { field: Field::Headline, sources: PDF_THEN_PERSONAL },
    MergeRule { field: Field::Email, sources: PDF_THEN_PERSONAL },
    MergeRule { field: Field::Phone, sources: PDF_THEN_PERSONAL },
    MergeRule { field: Field::Url, sources: PDF_THEN_PERSONAL },
    MergeRule { field: Field::Summary, sources: PDF_THEN_PERSONAL },
    MergeRule { field: Field::Location, sources: PDF_THEN_PERSONAL },
    MergeRule { field: Field::Profiles, sources: PDF_THEN_PERSONAL },
    MergeRule { field: Field::BirthDate, sources: PDF_THEN_PERSONAL },
    MergeRule { field: Field::Nationality, sources: PDF_THEN_PERSONAL },
    MergeRule { field: Field::Work, sources: PDF_ONLY },
    MergeRule { field: Field::Volunteer, sources: PDF_ONLY },
    MergeRule { field: Field::Education, sources: PDF_ONLY },
    MergeRule {
        field: Field::Skills,
        sources: &[Source::Pdf, Source::PersonalInfo, Source::SkillsCsv],
    },
    MergeRule {
        field: Field::Certificates,
        sources: &[Source::Pdf, Source::CertificationsCsv],
    },
    MergeRule { field: Field::Languages, sources: PDF_ONLY },
    MergeRule { field: Field::Interests, sources: PDF_ONLY },
    MergeRule {
        field: Field::Projects,
        sources: &[Source::Pdf, Source::ProjectsCsv],
    },
    MergeRule { field: Field::Unrecognized, sources: PDF_ONLY },
];

/// A partial record from one source.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub source: Source,
    pub record: ResumeRecord,
}

impl Patch {
    pub fn new(source: Source, record: ResumeRecord) -> Self {
        Self { source, record }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(|v| v.trim().is_empty()).unwrap_or(true)
}

/// Set `slot` from `value` only when `slot` is empty.
fn fill(slot: &mut Option<String>, value: &Option<String>) {
    if is_blank(slot) && !is_blank(value) {
        *slot = value.clone();
    }
}

fn fill_dates(slot: &mut DateRange, value: &DateRange) {
    if slot.is_empty() {
        *slot = value.clone();
    }
}

fn fill_list(slot: &mut Vec<String>, value: &[String]) {
    if slot.is_empty() {
        *slot = value.to_vec();
    }
}

/// List entries identified by a normalized key.
pub trait Keyed: Clone {
    /// Trimmed, case-insensitive identity.
    fn key(&self) -> String;

    /// Fill empty fields from a matching entry of a lower-priority source.
    fn fill_from(&mut self, _other: &Self) {}
}

impl Keyed for SkillEntry {
    fn key(&self) -> String {
        normalize_key(&self.name)
    }
}

impl Keyed for InterestEntry {
    fn key(&self) -> String {
        normalize_key(&self.name)
    }
}

impl Keyed for LanguageEntry {
    fn key(&self) -> String {
        normalize_key(&self.language)
    }

    fn fill_from(&mut self, other: &Self) {
        fill(&mut self.fluency, &other.fluency);
    }
}

impl Keyed for CertificationEntry {
    fn key(&self) -> String {
        normalize_key(&self.name)
    }

    fn fill_from(&mut self, other: &Self) {
        fill(&mut self.issuer, &other.issuer);
        fill(&mut self.url, &other.url);
        if self.date.is_none() {
            self.date = other.date;
        }
    }
}

impl Keyed for ProjectEntry {
    fn key(&self) -> String {
        normalize_key(&self.name)
    }

    fn fill_from(&mut self, other: &Self) {
        fill(&mut self.description, &other.description);
        fill(&mut self.url, &other.url);
        fill_dates(&mut self.dates, &other.dates);
        fill_list(&mut self.highlights, &other.highlights);
    }
}

impl Keyed for Profile {
    fn key(&self) -> String {
        normalize_key(self.url.trim_end_matches('/'))
    }

    fn fill_from(&mut self, other: &Self) {
        fill(&mut self.username, &other.username);
    }
}

fn start_key(dates: &DateRange) -> String {
    dates.start.map(|d| d.to_string()).unwrap_or_default()
}

impl Keyed for WorkEntry {
    fn key(&self) -> String {
        normalize_key(&format!(
            "{}|{}|{}",
            self.name.as_deref().unwrap_or(""),
            self.position.as_deref().unwrap_or(""),
            start_key(&self.dates)
        ))
    }

    fn fill_from(&mut self, other: &Self) {
        fill(&mut self.location, &other.location);
        fill(&mut self.summary, &other.summary);
        fill_list(&mut self.highlights, &other.highlights);
    }
}

impl Keyed for VolunteerEntry {
    fn key(&self) -> String {
        normalize_key(&format!(
            "{}|{}|{}",
            self.organization.as_deref().unwrap_or(""),
            self.position.as_deref().unwrap_or(""),
            start_key(&self.dates)
        ))
    }
}

impl Keyed for EducationEntry {
    fn key(&self) -> String {
        normalize_key(&format!(
            "{}|{}|{}",
            self.institution.as_deref().unwrap_or(""),
            self.study_type.as_deref().unwrap_or(""),
            start_key(&self.dates)
        ))
    }

    fn fill_from(&mut self, other: &Self) {
        fill(&mut self.area, &other.area);
        fill(&mut self.location, &other.location);
    }
}

impl Keyed for UnrecognizedSection {
    fn key(&self) -> String {
        normalize_key(&format!(
            "{}|{}",
            self.heading.as_deref().unwrap_or(""),
            self.lines.join("\n")
        ))
    }
}

/// Append entries whose key is absent; fill matching entries.
fn union<T: Keyed>(target: &mut Vec<T>, incoming: &[T]) {
    let mut index: HashMap<String, usize> = target
        .iter()
        .enumerate()
        .map(|(i, item)| (item.key(), i))
        .collect();

    for item in incoming {
        let key = item.key();
        if key.is_empty() {
            continue;
        }
        match index.get(&key) {
            Some(&i) => target[i].fill_from(item),
            None => {
                index.insert(key, target.len());
                target.push(item.clone());
            }
        }
    }
}

impl Field {
    fn apply(self, target: &mut ResumeRecord, patch: &ResumeRecord) {
        let (t, p) = (&mut target.basics, &patch.basics);
        match self {
            Field::Name => fill(&mut t.name, &p.name),
            Field::Headline => fill(&mut t.headline, &p.headline),
            Field::Email => fill(&mut t.email, &p.email),
            Field::Phone => fill(&mut t.phone, &p.phone),
            Field::Url => fill(&mut t.url, &p.url),
            Field::Summary => fill(&mut t.summary, &p.summary),
            Field::BirthDate => fill(&mut t.birth_date, &p.birth_date),
            Field::Nationality => fill(&mut t.nationality, &p.nationality),
            Field::Location => {
                let empty = t.location.as_ref().map(Location::is_empty).unwrap_or(true);
                let usable = p.location.as_ref().filter(|l| !l.is_empty());
                if let (true, Some(location)) = (empty, usable) {
                    t.location = Some(location.clone());
                }
            }
            Field::Profiles => union(&mut t.profiles, &p.profiles),
            Field::Work => union(&mut target.work, &patch.work),
            Field::Volunteer => union(&mut target.volunteer, &patch.volunteer),
            Field::Education => union(&mut target.education, &patch.education),
            Field::Skills => union(&mut target.skills, &patch.skills),
            Field::Certificates => union(&mut target.certificates, &patch.certificates),
            Field::Languages => union(&mut target.languages, &patch.languages),
            Field::Interests => union(&mut target.interests, &patch.interests),
            Field::Projects => union(&mut target.projects, &patch.projects),
            Field::Unrecognized => union(&mut target.unrecognized, &patch.unrecognized),
        }
    }
}

/// Merge patches field by field following [`MERGE_RULES`].
///
/// A source not listed in a field's rule never touches that field.
pub fn merge(patches: &[Patch]) -> ResumeRecord {
    let mut target = ResumeRecord::new();
    for rule in MERGE_RULES {
        for source in rule.sources {
            for patch in patches.iter().filter(|p| p.source == *source) {
                rule.field.apply(&mut target, &patch.record);
            }
        }
    }
    target
}
