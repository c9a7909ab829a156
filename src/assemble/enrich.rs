//! Enrichment side files: personal-info JSON and profile CSV exports.
//!
//! Each loader turns one file into a [`Patch`]. Loading never aborts a run:
//! [`Enrichment::load`] reports unusable files as warnings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::extract::{parse_single_date, split_items};
use crate::model::{
    Basics, CertificationEntry, DateBound, DateRange, Location, ProjectEntry, ResumeRecord,
    SkillEntry, Warning,
};

use super::merge::{Patch, Source};

/// `location` as free text or as a structured object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LocationInput {
    Text(String),
    Structured(Location),
}

/// `additional_skills` as a list or a delimited string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SkillList {
    List(Vec<String>),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PersonalInfo {
    name: Option<String>,
    #[serde(alias = "headline")]
    label: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    #[serde(alias = "website")]
    url: Option<String>,
    summary: Option<String>,
    #[serde(alias = "birthDate")]
    birth_date: Option<String>,
    nationality: Option<String>,
    #[serde(alias = "nationalityCode")]
    nationality_code: Option<String>,
    location: Option<LocationInput>,
    #[serde(alias = "additionalSkills", alias = "skills")]
    additional_skills: Option<SkillList>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a personal-info JSON document.
pub fn personal_info_from_str(json: &str) -> Result<ResumeRecord> {
    let info: PersonalInfo = serde_json::from_str(json)?;

    let location = match info.location {
        Some(LocationInput::Text(text)) if !text.trim().is_empty() => Some(Location::from_text(&text)),
        Some(LocationInput::Structured(location)) if !location.is_empty() => Some(location),
        _ => None,
    };

    let skills = match info.additional_skills {
        Some(SkillList::List(names)) => split_items(names.iter().map(String::as_str)),
        Some(SkillList::Text(text)) => split_items([text.as_str()]),
        None => Vec::new(),
    };

    Ok(ResumeRecord {
        basics: Basics {
            name: trimmed(info.name),
            headline: trimmed(info.label),
            email: trimmed(info.email),
            phone: trimmed(info.phone),
            url: trimmed(info.url),
            summary: trimmed(info.summary),
            location,
            profiles: Vec::new(),
            birth_date: trimmed(info.birth_date),
            nationality: trimmed(info.nationality).or_else(|| trimmed(info.nationality_code)),
        },
        skills: skills.into_iter().map(SkillEntry::new).collect(),
        ..Default::default()
    })
}

#[derive(Debug, Deserialize)]
struct SkillRow {
    #[serde(rename = "Name", default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CertificationRow {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Authority", default)]
    authority: String,
    #[serde(rename = "Url", default)]
    url: String,
    #[serde(rename = "Started On", default)]
    started_on: String,
    #[serde(rename = "Finished On", default)]
    finished_on: String,
}

#[derive(Debug, Deserialize)]
struct ProjectRow {
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "Url", default)]
    url: String,
    #[serde(rename = "Started On", default)]
    started_on: String,
    #[serde(rename = "Finished On", default)]
    finished_on: String,
}

fn csv_rows<T: for<'de> Deserialize<'de>>(text: &str) -> Result<Vec<T>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for row in reader.deserialize::<T>() {
        rows.push(row?);
    }
    Ok(rows)
}

fn non_empty(value: String) -> Option<String> {
    trimmed(Some(value))
}

/// Parse a Skills CSV export (`Name`).
pub fn skills_from_csv(text: &str) -> Result<ResumeRecord> {
    let rows: Vec<SkillRow> = csv_rows(text)?;
    let names = split_items(rows.iter().map(|r| r.name.as_str()));
    Ok(ResumeRecord {
        skills: names.into_iter().map(SkillEntry::new).collect(),
        ..Default::default()
    })
}

/// Parse a Certifications CSV export (`Name, Url, Authority, Started On, Finished On`).
///
/// Returns the record and the rows whose dates did not parse.
pub fn certifications_from_csv(text: &str) -> Result<(ResumeRecord, Vec<String>)> {
    let rows: Vec<CertificationRow> = csv_rows(text)?;
    let mut bad_dates = Vec::new();
    let mut certificates = Vec::new();

    for row in rows {
        let Some(name) = non_empty(row.name) else {
            continue;
        };
        let raw_date = non_empty(row.started_on).or_else(|| non_empty(row.finished_on));
        let date = raw_date.as_deref().and_then(parse_single_date);
        if let (Some(raw), None) = (&raw_date, date) {
            bad_dates.push(format!("{}: {}", name, raw));
        }
        certificates.push(CertificationEntry {
            name,
            issuer: non_empty(row.authority),
            date,
            url: non_empty(row.url),
        });
    }

    Ok((
        ResumeRecord {
            certificates,
            ..Default::default()
        },
        bad_dates,
    ))
}

/// Start/end columns to a range; unparseable text is kept raw.
fn csv_range(start: &str, end: &str) -> DateRange {
    let (start, end) = (start.trim(), end.trim());
    let parsed_start = parse_single_date(start);
    let parsed_end = parse_single_date(end);

    let mut range = DateRange::new(parsed_start, parsed_end.map(DateBound::Date));
    let lost = (!start.is_empty() && parsed_start.is_none()) || (!end.is_empty() && parsed_end.is_none());
    if lost {
        range.raw = Some(format!("{} - {}", start, end).trim_matches([' ', '-']).to_string());
    }
    range
}

/// Parse a Projects CSV export (`Title, Description, Url, Started On, Finished On`).
pub fn projects_from_csv(text: &str) -> Result<ResumeRecord> {
    let rows: Vec<ProjectRow> = csv_rows(text)?;
    let projects = rows
        .into_iter()
        .filter_map(|row| {
            let dates = csv_range(&row.started_on, &row.finished_on);
            Some(ProjectEntry {
                name: non_empty(row.title)?,
                description: non_empty(row.description),
                dates,
                url: non_empty(row.url),
                highlights: Vec::new(),
            })
        })
        .collect();
    Ok(ResumeRecord {
        projects,
        ..Default::default()
    })
}

/// Side files to merge into the PDF record.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    personal_info: Option<PathBuf>,
    skills_csv: Option<PathBuf>,
    certifications_csv: Option<PathBuf>,
    projects_csv: Option<PathBuf>,
}

impl Enrichment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_personal_info(mut self, path: impl Into<PathBuf>) -> Self {
        self.personal_info = Some(path.into());
        self
    }

    pub fn with_skills_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.skills_csv = Some(path.into());
        self
    }

    pub fn with_certifications_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.certifications_csv = Some(path.into());
        self
    }

    pub fn with_projects_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.projects_csv = Some(path.into());
        self
    }

    /// No side file configured.
    pub fn is_empty(&self) -> bool {
        self.personal_info.is_none()
            && self.skills_csv.is_none()
            && self.certifications_csv.is_none()
            && self.projects_csv.is_none()
    }

    /// Load every configured file. Files that cannot be read or parsed
    /// become warnings.
    pub fn load(&self) -> (Vec<Patch>, Vec<Warning>) {
        let mut patches = Vec::new();
        let mut warnings = Vec::new();

        let mut run = |path: &Option<PathBuf>, source: Source| {
            let Some(path) = path else { return };
            match load_one(path, source) {
                Ok((record, notes)) => {
                    log::debug!("loaded {} from {}", source, path.display());
                    for note in notes {
                        warnings.push(Warning::enrichment(
                            path.display().to_string(),
                            format!("unparseable date, kept raw ({})", note),
                        ));
                    }
                    patches.push(Patch::new(source, record));
                }
                Err(e) => {
                    log::warn!("ignoring {}: {}", path.display(), e);
                    warnings.push(Warning::enrichment(path.display().to_string(), e.to_string()));
                }
            }
        };

        run(&self.personal_info, Source::PersonalInfo);
        run(&self.skills_csv, Source::SkillsCsv);
        run(&self.certifications_csv, Source::CertificationsCsv);
        run(&self.projects_csv, Source::ProjectsCsv);

        (patches, warnings)
    }
}

fn load_one(path: &Path, source: Source) -> Result<(ResumeRecord, Vec<String>)> {
    let text = fs::read_to_string(path)?;
    match source {
        Source::PersonalInfo => Ok((personal_info_from_str(&text)?, Vec::new())),
        Source::SkillsCsv => Ok((skills_from_csv(&text)?, Vec::new())),
        Source::CertificationsCsv => certifications_from_csv(&text),
        Source::ProjectsCsv => {
            let record = projects_from_csv(&text)?;
            let notes = record
                .projects
                .iter()
                .filter_map(|p| p.dates.raw.as_ref().map(|raw| format!("{}: {}", p.name, raw)))
                .collect();
            Ok((record, notes))
        }
        Source::Pdf => Ok((ResumeRecord::new(), Vec::new())),
    }
}
