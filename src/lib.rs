//! # unprofile
//!
//! Structured résumé extraction from profile-export PDFs.
//!
//! A profile "Save to PDF" export carries no semantic markup, only positioned
//! text. This library recovers the structure from layout alone and emits a
//! JSON-Resume-shaped [`ResumeRecord`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use unprofile::{parse_file, render};
//!
//! fn main() -> unprofile::Result<()> {
//!     let extraction = parse_file("Profile.pdf")?;
//!
//!     for warning in &extraction.warnings {
//!         eprintln!("warning: {}", warning);
//!     }
//!
//!     let json = render::to_json(&extraction.record, render::JsonFormat::Pretty)?;
//!     println!("{}", json);
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! 1. [`parser::extract_file`]: PDF → positioned text fragments
//! 2. [`parser::reconstruct_lines`]: fragments → visual lines in reading order
//! 3. [`parser::segment`]: lines → labeled sections
//! 4. [`extract::extract_fields`]: sections → record entries
//! 5. [`assemble::Assembler`]: entries + side files → final record
//!
//! Stages 2-5 are pure functions of their input and options.

pub mod assemble;
pub mod error;
pub mod extract;
pub mod model;
pub mod parser;
pub mod render;

// Re-export commonly used types
pub use assemble::{Assembler, Enrichment, Extraction};
pub use error::{Error, Result};
pub use model::{
    Basics, CertificationEntry, DateBound, DateRange, EducationEntry, InterestEntry,
    LanguageEntry, Location, PartialDate, Profile, ProjectEntry, ResumeRecord, SkillEntry,
    UnrecognizedSection, VolunteerEntry, Warning, WorkEntry,
};
pub use parser::{
    AdjacentHeadingPolicy, ErrorMode, FieldOptions, Fragment, LayoutOptions, Line, ParseOptions,
    Section, SectionKind, SegmentOptions,
};
pub use render::JsonFormat;

use std::path::Path;

use parser::ExtractedText;

/// Parse a profile PDF file with default options.
///
/// # Example
///
/// ```no_run
/// use unprofile::parse_file;
///
/// let extraction = parse_file("Profile.pdf").unwrap();
/// println!("{:?}", extraction.record.basics.name);
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Extraction> {
    parse_file_with_options(path, &ParseOptions::default())
}

/// Parse a profile PDF file with custom options.
///
/// # Example
///
/// ```no_run
/// use unprofile::{parse_file_with_options, ParseOptions};
///
/// let options = ParseOptions::new().strict().with_columns(false);
/// let extraction = parse_file_with_options("Profile.pdf", &options).unwrap();
/// ```
pub fn parse_file_with_options<P: AsRef<Path>>(
    path: P,
    options: &ParseOptions,
) -> Result<Extraction> {
    let extracted = parser::extract_file(path, options)?;
    Ok(run(extracted, options, &Enrichment::default()))
}

/// Parse a profile PDF from bytes.
pub fn parse_bytes(data: &[u8]) -> Result<Extraction> {
    parse_bytes_with_options(data, &ParseOptions::default())
}

/// Parse a profile PDF from bytes with custom options.
pub fn parse_bytes_with_options(data: &[u8], options: &ParseOptions) -> Result<Extraction> {
    let extracted = parser::extract_bytes(data, options)?;
    Ok(run(extracted, options, &Enrichment::default()))
}

/// Run stages 2-4 on fragments obtained elsewhere. Pure: no I/O, no
/// enrichment.
///
/// # Example
///
/// ```
/// use unprofile::{parse_fragments, Fragment, ParseOptions};
///
/// let fragments = vec![
///     Fragment::new("Jane Doe", 1, 72.0, 720.0, 26.0),
///     Fragment::new("Engineer at Acme", 1, 72.0, 690.0, 11.0),
///     Fragment::new("Builds systems that survive production.", 1, 72.0, 676.0, 11.0),
/// ];
/// let extraction = parse_fragments(&fragments, &ParseOptions::default());
/// assert_eq!(extraction.record.basics.name.as_deref(), Some("Jane Doe"));
/// ```
pub fn parse_fragments(fragments: &[Fragment], options: &ParseOptions) -> Extraction {
    let extracted = ExtractedText {
        fragments: fragments.to_vec(),
        ..Default::default()
    };
    run(extracted, options, &Enrichment::default())
}

/// Sections of a profile PDF, for reviewing how lines were labeled.
pub fn inspect_file<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<Vec<Section>> {
    let extracted = parser::extract_file(path, options)?;
    let lines = parser::reconstruct_lines(&extracted.fragments, &options.layout);
    Ok(parser::segment(lines, &options.segment))
}

/// Parse a PDF file and render the record as JSON.
///
/// # Example
///
/// ```no_run
/// use unprofile::{to_json, JsonFormat};
///
/// let json = to_json("Profile.pdf", JsonFormat::Pretty).unwrap();
/// std::fs::write("resume.json", json).unwrap();
/// ```
pub fn to_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    let extraction = parse_file(path)?;
    render::to_json(&extraction.record, format)
}

fn run(extracted: ExtractedText, options: &ParseOptions, enrichment: &Enrichment) -> Extraction {
    let lines = parser::reconstruct_lines(&extracted.fragments, &options.layout);
    log::debug!(
        "{} fragments → {} lines over {} pages",
        extracted.fragments.len(),
        lines.len(),
        extracted.page_count
    );

    let sections = parser::segment(lines, &options.segment);
    log::debug!("{} sections", sections.len());

    let fields = extract::extract_fields(&sections, &options.fields);
    let mut out = Assembler::new(enrichment.clone()).assemble(&fields);

    let mut warnings = extracted.warnings;
    warnings.append(&mut out.warnings);
    out.warnings = warnings;
    out
}

/// Builder for parsing a profile PDF with enrichment.
///
/// # Example
///
/// ```no_run
/// use unprofile::Unprofile;
///
/// let extraction = Unprofile::new()
///     .lenient()
///     .with_personal_info("personal.json")
///     .with_skills_csv("Skills.csv")
///     .with_certifications_csv("Certifications.csv")
///     .parse("Profile.pdf")?;
/// # Ok::<(), unprofile::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Unprofile {
    options: ParseOptions,
    enrichment: Enrichment,
}

impl Unprofile {
    /// Create a new builder with default options and no enrichment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all parse options.
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Skip undecodable pages with a warning.
    pub fn lenient(mut self) -> Self {
        self.options = self.options.lenient();
        self
    }

    /// Fail on the first undecodable page.
    pub fn strict(mut self) -> Self {
        self.options = self.options.strict();
        self
    }

    /// Set document password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.options = self.options.with_password(password);
        self
    }

    /// Personal-info JSON to fill gaps in the identity block.
    pub fn with_personal_info(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.enrichment = self.enrichment.with_personal_info(path);
        self
    }

    /// Skills CSV export.
    pub fn with_skills_csv(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.enrichment = self.enrichment.with_skills_csv(path);
        self
    }

    /// Certifications CSV export.
    pub fn with_certifications_csv(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.enrichment = self.enrichment.with_certifications_csv(path);
        self
    }

    /// Projects CSV export.
    pub fn with_projects_csv(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.enrichment = self.enrichment.with_projects_csv(path);
        self
    }

    /// Parse a PDF file.
    pub fn parse<P: AsRef<Path>>(&self, path: P) -> Result<Extraction> {
        let extracted = parser::extract_file(path, &self.options)?;
        Ok(run(extracted, &self.options, &self.enrichment))
    }

    /// Parse a PDF from bytes.
    pub fn parse_bytes(&self, data: &[u8]) -> Result<Extraction> {
        let extracted = parser::extract_bytes(data, &self.options)?;
        Ok(run(extracted, &self.options, &self.enrichment))
    }

    /// Run the pure stages on fragments, then enrich.
    pub fn parse_fragments(&self, fragments: &[Fragment]) -> Extraction {
        let extracted = ExtractedText {
            fragments: fragments.to_vec(),
            ..Default::default()
        };
        run(extracted, &self.options, &self.enrichment)
    }
}
