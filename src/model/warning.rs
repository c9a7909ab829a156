//! Non-fatal problems collected during a run.

use serde::Serialize;
use thiserror::Error;

use crate::parser::SectionKind;

/// A problem that degraded the output without aborting the run.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Warning {
    /// No identity line was found in the header block.
    #[error("no name found in the header block")]
    MissingName,

    /// A recognized section produced no entries, or a heading was not recognized.
    #[error("section {section}{}: {reason}", fmt_heading(.heading))]
    SectionParse {
        section: SectionKind,
        heading: Option<String>,
        reason: String,
    },

    /// A single entry was emitted with missing or raw fields.
    #[error("{section} entry {raw:?}: {reason}")]
    EntryParse {
        section: SectionKind,
        raw: String,
        reason: String,
    },

    /// A page whose content could not be decoded was skipped.
    #[error("page {page} skipped: {reason}")]
    PageSkipped { page: u32, reason: String },

    /// An enrichment input could not be used.
    #[error("enrichment from {origin} ignored: {reason}")]
    Enrichment { origin: String, reason: String },
}

fn fmt_heading(heading: &Option<String>) -> String {
    heading
        .as_deref()
        .map(|h| format!(" ({:?})", h))
        .unwrap_or_default()
}

impl Warning {
    pub(crate) fn section_parse(
        section: SectionKind,
        heading: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        Warning::SectionParse {
            section,
            heading: heading.map(str::to_string),
            reason: reason.into(),
        }
    }

    pub(crate) fn entry_parse(
        section: SectionKind,
        raw: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Warning::EntryParse {
            section,
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn enrichment(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Warning::Enrichment {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}
