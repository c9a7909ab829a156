//! Parsing options and heuristic configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::sections::AdjacentHeadingPolicy;
use crate::error::{Error, Result};

/// Options for a full extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Password for encrypted documents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Line reconstruction thresholds
    pub layout: LayoutOptions,

    /// Section segmentation thresholds
    pub segment: SegmentOptions,

    /// Field extraction thresholds
    pub fields: FieldOptions,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load heuristic configuration from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let options: Self = serde_json::from_str(&data)?;
        options.validate()?;
        Ok(options)
    }

    /// Check that every threshold is usable.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("layout.line_tolerance_ratio", self.layout.line_tolerance_ratio),
            ("layout.space_gap_ratio", self.layout.space_gap_ratio),
            ("segment.title_ratio", self.segment.title_ratio),
            ("fields.block_gap_ratio", self.fields.block_gap_ratio),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!("{} must be positive, got {}", name, value)));
            }
        }
        if !self.segment.heading_margin.is_finite() || self.segment.heading_margin < 0.0 {
            return Err(Error::Config(format!(
                "segment.heading_margin must be non-negative, got {}",
                self.segment.heading_margin
            )));
        }
        if self.segment.max_heading_words == 0 {
            return Err(Error::Config("segment.max_heading_words must be at least 1".into()));
        }
        Ok(())
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip undecodable pages).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Enable strict mode (fail on undecodable pages).
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Set password for encrypted documents.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Replace the line reconstruction thresholds.
    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    /// Replace the segmentation thresholds.
    pub fn with_segment(mut self, segment: SegmentOptions) -> Self {
        self.segment = segment;
        self
    }

    /// Replace the field extraction thresholds.
    pub fn with_fields(mut self, fields: FieldOptions) -> Self {
        self.fields = fields;
        self
    }

    /// Swap the adjacent-heading tie-break policy.
    pub fn with_adjacent_heading_policy(mut self, policy: AdjacentHeadingPolicy) -> Self {
        self.segment.adjacent_heading_policy = policy;
        self
    }

    /// Enable or disable two-column reading order.
    pub fn with_columns(mut self, detect: bool) -> Self {
        self.layout.detect_columns = detect;
        self
    }
}

/// Error handling mode during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Fail on any undecodable page
    Strict,
    /// Skip undecodable pages with a warning
    #[default]
    Lenient,
}

/// Thresholds used when grouping fragments into lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Vertical tolerance as a fraction of the smaller font size
    pub line_tolerance_ratio: f32,
    /// Horizontal gap, as a fraction of the average glyph width, that earns a space
    pub space_gap_ratio: f32,
    /// Split pages with a sidebar into columns
    pub detect_columns: bool,
    /// Narrowest column accepted by gutter detection
    pub min_column_width: f32,
    /// Narrowest gutter accepted by gutter detection
    pub min_gutter_width: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            line_tolerance_ratio: 0.3,
            space_gap_ratio: 0.2,
            detect_columns: true,
            min_column_width: 80.0,
            min_gutter_width: 12.0,
        }
    }
}

/// Thresholds used by the section state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentOptions {
    /// Points above the body size a heading must reach
    pub heading_margin: f32,
    /// Longest heading in words
    pub max_heading_words: usize,
    /// Longest heading in characters
    pub max_heading_chars: usize,
    /// Minimum size ratio over body text for the title line
    pub title_ratio: f32,
    /// What to do with two headings in a row
    pub adjacent_heading_policy: AdjacentHeadingPolicy,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            heading_margin: 2.0,
            max_heading_words: 5,
            max_heading_chars: 60,
            title_ratio: 1.6,
            adjacent_heading_policy: AdjacentHeadingPolicy::default(),
        }
    }
}

/// Thresholds used when splitting sections into entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldOptions {
    /// A vertical gap this many times the median line spacing separates entries
    pub block_gap_ratio: f32,
    /// How many lines after a boundary candidate may carry its date range
    pub date_lookahead: usize,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            block_gap_ratio: 1.8,
            date_lookahead: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_options_builder() {
        let options = ParseOptions::new()
            .strict()
            .with_password("secret")
            .with_columns(false)
            .with_adjacent_heading_policy(AdjacentHeadingPolicy::KeepBoth);

        assert_eq!(options.error_mode, ErrorMode::Strict);
        assert_eq!(options.password.as_deref(), Some("secret"));
        assert!(!options.layout.detect_columns);
        assert_eq!(
            options.segment.adjacent_heading_policy,
            AdjacentHeadingPolicy::KeepBoth
        );
    }

    #[test]
    fn test_default_options() {
        let options = ParseOptions::default();
        assert_eq!(options.error_mode, ErrorMode::Lenient);
        assert!((options.layout.line_tolerance_ratio - 0.3).abs() < f32::EPSILON);
        assert!((options.segment.heading_margin - 2.0).abs() < f32::EPSILON);
        assert_eq!(options.fields.date_lookahead, 3);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_from_json_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"error_mode":"strict","segment":{{"heading_margin":1.5}}}}"#
        )
        .unwrap();

        let options = ParseOptions::from_json_file(file.path()).unwrap();
        assert_eq!(options.error_mode, ErrorMode::Strict);
        assert!((options.segment.heading_margin - 1.5).abs() < f32::EPSILON);
        assert_eq!(options.segment.max_heading_words, 5);
        assert_eq!(options.layout, LayoutOptions::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"layout":{{"line_tolerance_ratio":0}}}}"#).unwrap();

        let err = ParseOptions::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
