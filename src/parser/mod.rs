//! PDF parsing: fragments, lines and sections.

mod backend;
mod extractor;
mod lines;
mod options;
mod sections;

pub use backend::{
    check_header, decode_text_simple, BackendFontInfo, ContentOp, LopdfBackend, PageId,
    PdfBackend, PdfValue,
};
pub use extractor::{extract_bytes, extract_file, extract_from_backend, ExtractedText, Fragment};
pub use lines::{detect_gutter, reconstruct_lines, Line};
pub use options::{ErrorMode, FieldOptions, LayoutOptions, ParseOptions, SegmentOptions};
pub use sections::{
    classify, lookup_heading, next_state, normalize_heading, segment, AdjacentHeadingPolicy,
    FontProfile, LineClass, Opener, Resolution, Section, SectionKind, Trigger,
};
