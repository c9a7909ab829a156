//! Résumé record types produced by the extraction pipeline.
//!
//! The record follows the JSON Resume shape so downstream exporters can read
//! it without knowing anything about PDFs. Every optional field serializes as
//! absent when empty.

mod date;
mod record;
mod warning;

pub use date::{DateBound, DateRange, PartialDate};
pub use record::{
    Basics, CertificationEntry, EducationEntry, InterestEntry, LanguageEntry, Location, Profile,
    ProjectEntry, ResumeRecord, SkillEntry, UnrecognizedSection, VolunteerEntry, WorkEntry,
};
pub use warning::Warning;
