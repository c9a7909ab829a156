//! Record assembly: the PDF record plus enrichment, merged by rule.

mod enrich;
mod merge;

pub use enrich::{
    certifications_from_csv, personal_info_from_str, projects_from_csv, skills_from_csv,
    Enrichment,
};
pub use merge::{merge, Field, Keyed, MergeRule, Patch, Source, MERGE_RULES};

use serde::Serialize;

use crate::extract::FieldExtraction;
use crate::model::{ResumeRecord, Warning};

/// Final output of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    /// The assembled record
    pub record: ResumeRecord,
    /// Everything that degraded the record, in pipeline order
    pub warnings: Vec<Warning>,
}

/// Combines a PDF-derived record with enrichment side files.
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    enrichment: Enrichment,
}

impl Assembler {
    pub fn new(enrichment: Enrichment) -> Self {
        Self { enrichment }
    }

    /// Merge `fields` with every configured side file. The input record is
    /// not modified; enrichment works on a copy.
    pub fn assemble(&self, fields: &FieldExtraction) -> Extraction {
        let mut warnings = fields.warnings.clone();

        if self.enrichment.is_empty() {
            return Extraction {
                record: fields.record.clone(),
                warnings,
            };
        }

        let (patches, load_warnings) = self.enrichment.load();
        warnings.extend(load_warnings);

        let mut all = Vec::with_capacity(patches.len() + 1);
        all.push(Patch::new(Source::Pdf, fields.record.clone()));
        all.extend(patches);

        let record = merge(&all);
        log::debug!("assembled record from {} sources", all.len());

        Extraction { record, warnings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Basics, SkillEntry};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fields() -> FieldExtraction {
        FieldExtraction {
            record: ResumeRecord {
                basics: Basics {
                    name: Some("Jane Doe".into()),
                    ..Default::default()
                },
                skills: vec![SkillEntry::new("Rust")],
                ..Default::default()
            },
            warnings: vec![Warning::MissingName],
        }
    }

    #[test]
    fn test_without_enrichment_record_is_unchanged() {
        let input = fields();
        let out = Assembler::default().assemble(&input);
        assert_eq!(out.record, input.record);
        assert_eq!(out.warnings, input.warnings);
    }

    #[test]
    fn test_enrichment_appends_and_keeps_warnings() {
        let mut csv = NamedTempFile::new().unwrap();
        writeln!(csv, "Name\nRUST\nSQL").unwrap();

        let input = fields();
        let out = Assembler::new(Enrichment::new().with_skills_csv(csv.path())).assemble(&input);

        let skills: Vec<&str> = out.record.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(skills, vec!["Rust", "SQL"]);
        assert_eq!(out.warnings, vec![Warning::MissingName]);
        assert_eq!(input.record.skills.len(), 1);
    }
}
