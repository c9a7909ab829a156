//! Positioned text fragments from PDF content streams.
//!
//! Walks each page's content stream and reports every text-showing
//! operation as a [`Fragment`] carrying its page, baseline origin in
//! user space, advance width, effective font size and boldness. Fragments
//! are emitted in content-stream order; no grouping happens here.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::backend::{BackendFontInfo, ContentOp, LopdfBackend, PageId, PdfBackend, PdfValue};
use super::options::{ErrorMode, ParseOptions};
use crate::error::{Error, Result};
use crate::model::Warning;

/// TJ adjustments beyond this many thousandths of an em read as a word space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// A single positioned run of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// The text content
    pub text: String,
    /// 1-based page number
    pub page: u32,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline, origin bottom-left)
    pub y: f32,
    /// Advance width of the run
    pub width: f32,
    /// Effective font size in points
    pub font_size: f32,
    /// Base font name (e.g., "Helvetica-Bold")
    pub font_name: String,
    /// Whether the font appears to be bold
    pub is_bold: bool,
}

impl Fragment {
    /// Create a fragment with bold inferred from the font name.
    pub fn new(text: impl Into<String>, page: u32, x: f32, y: f32, font_size: f32) -> Self {
        let text = text.into();
        let width = text.chars().count() as f32 * font_size * 0.5;
        Self {
            text,
            page,
            x,
            y,
            width,
            font_size,
            font_name: "Helvetica".to_string(),
            is_bold: false,
        }
    }

    /// Set the font name; boldness follows the name.
    pub fn with_font(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = font_name.into();
        self.is_bold = super::backend::is_bold_name(&self.font_name);
        self
    }

    /// Mark the fragment bold.
    pub fn bold(mut self) -> Self {
        self.is_bold = true;
        self
    }

    /// Set the advance width.
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Horizontal center.
    pub fn center(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

/// Fragments of a whole document plus pages that had to be skipped.
#[derive(Debug, Clone, Default)]
pub struct ExtractedText {
    pub fragments: Vec<Fragment>,
    pub warnings: Vec<Warning>,
    pub page_count: u32,
}

/// Extract fragments from a PDF file.
pub fn extract_file<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<ExtractedText> {
    let backend = LopdfBackend::load_file(path)?;
    extract_from_backend(&backend, options)
}

/// Extract fragments from PDF bytes.
pub fn extract_bytes(data: &[u8], options: &ParseOptions) -> Result<ExtractedText> {
    let backend = LopdfBackend::load_bytes(data)?;
    extract_from_backend(&backend, options)
}

/// Extract fragments through any [`PdfBackend`].
pub fn extract_from_backend<B: PdfBackend>(
    backend: &B,
    options: &ParseOptions,
) -> Result<ExtractedText> {
    if options.password.is_some() && backend.is_encrypted() {
        log::warn!("Password was provided but lopdf 0.34 doesn't support decryption");
    }

    let pages = backend.pages();
    let mut out = ExtractedText {
        page_count: pages.len() as u32,
        ..Default::default()
    };

    for (&page_num, &page_id) in &pages {
        match extract_page(backend, page_num, page_id) {
            Ok(fragments) => {
                log::debug!("page {}: {} fragments", page_num, fragments.len());
                out.fragments.extend(fragments);
            }
            Err(e) => match options.error_mode {
                ErrorMode::Strict => {
                    return Err(Error::UnreadablePdf(format!("page {}: {}", page_num, e)))
                }
                ErrorMode::Lenient => {
                    log::warn!("skipping page {}: {}", page_num, e);
                    out.warnings.push(Warning::PageSkipped {
                        page: page_num,
                        reason: e.to_string(),
                    });
                }
            },
        }
    }

    if backend.is_encrypted() && out.fragments.is_empty() {
        return Err(Error::Encrypted);
    }

    Ok(out)
}

fn extract_page<B: PdfBackend>(backend: &B, page_num: u32, page_id: PageId) -> Result<Vec<Fragment>> {
    let fonts: HashMap<Vec<u8>, BackendFontInfo> = backend
        .page_fonts(page_id)?
        .into_iter()
        .map(|f| (f.name.clone(), f))
        .collect();
    let content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&content)?;

    let mut walker = ContentWalker::new(backend, page_num, page_id, &fonts);
    for op in &ops {
        walker.apply(op);
    }
    Ok(walker.fragments)
}

/// 2D affine matrix `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(operands: &[PdfValue]) -> Option<Self> {
        let n: Vec<f32> = operands.iter().filter_map(PdfValue::as_number).collect();
        match n.as_slice() {
            [a, b, c, d, e, f] => Some(Self {
                a: *a,
                b: *b,
                c: *c,
                d: *d,
                e: *e,
                f: *f,
            }),
            _ => None,
        }
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// `self × other`: apply `self` first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }
}

/// Text state parameters that persist across BT/ET.
#[derive(Debug, Clone)]
struct TextState {
    font: Vec<u8>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scaling: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Vec::new(),
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// Interprets the text-related operators of one page.
struct ContentWalker<'a, B: PdfBackend> {
    backend: &'a B,
    page_num: u32,
    page_id: PageId,
    fonts: &'a HashMap<Vec<u8>, BackendFontInfo>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    in_text: bool,
    fragments: Vec<Fragment>,
}

impl<'a, B: PdfBackend> ContentWalker<'a, B> {
    fn new(
        backend: &'a B,
        page_num: u32,
        page_id: PageId,
        fonts: &'a HashMap<Vec<u8>, BackendFontInfo>,
    ) -> Self {
        Self {
            backend,
            page_num,
            page_id,
            fonts,
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            in_text: false,
            fragments: Vec::new(),
        }
    }

    fn number(op: &ContentOp, idx: usize) -> Option<f32> {
        op.operands.get(idx).and_then(PdfValue::as_number)
    }

    fn apply(&mut self, op: &ContentOp) {
        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }
            "BT" => {
                self.in_text = true;
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => self.in_text = false,
            "Tf" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    self.state.text.font = name.clone();
                }
                if let Some(size) = Self::number(op, 1) {
                    self.state.text.font_size = size;
                }
            }
            "Tc" => self.state.text.char_spacing = Self::number(op, 0).unwrap_or(0.0),
            "Tw" => self.state.text.word_spacing = Self::number(op, 0).unwrap_or(0.0),
            "Tz" => self.state.text.horizontal_scaling = Self::number(op, 0).unwrap_or(100.0) / 100.0,
            "TL" => self.state.text.leading = Self::number(op, 0).unwrap_or(0.0),
            "Ts" => self.state.text.rise = Self::number(op, 0).unwrap_or(0.0),
            "Td" | "TD" => {
                let tx = Self::number(op, 0).unwrap_or(0.0);
                let ty = Self::number(op, 1).unwrap_or(0.0);
                if op.operator == "TD" {
                    self.state.text.leading = -ty;
                }
                self.move_line(tx, ty);
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show(&[PdfValue::Str(bytes.clone())]);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = op.operands.first() {
                    self.show(items);
                }
            }
            "'" => {
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show(&[PdfValue::Str(bytes.clone())]);
                }
            }
            "\"" => {
                if let Some(aw) = Self::number(op, 0) {
                    self.state.text.word_spacing = aw;
                }
                if let Some(ac) = Self::number(op, 1) {
                    self.state.text.char_spacing = ac;
                }
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                    self.show(&[PdfValue::Str(bytes.clone())]);
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_line(0.0, -leading);
    }

    /// Show a sequence of strings and TJ adjustments as one fragment.
    fn show(&mut self, items: &[PdfValue]) {
        if !self.in_text {
            return;
        }

        let ts = self.state.text.clone();
        let font = self.fonts.get(&ts.font);
        let start = Matrix::translation(0.0, ts.rise)
            .then(&self.text_matrix)
            .then(&self.state.ctm);

        let mut text = String::new();
        let mut advance = 0.0f32;

        for item in items {
            match item {
                PdfValue::Str(bytes) => {
                    text.push_str(&self.backend.decode_text(self.page_id, &ts.font, bytes));
                    advance += string_advance(font, bytes, &ts);
                }
                other => {
                    if let Some(adjust) = other.as_number() {
                        advance -= adjust / 1000.0 * ts.font_size * ts.horizontal_scaling;
                        if -adjust > TJ_SPACE_THRESHOLD && !text.is_empty() && !text.ends_with(' ') {
                            text.push(' ');
                        }
                    }
                }
            }
        }

        self.text_matrix = Matrix::translation(advance, 0.0).then(&self.text_matrix);

        if text.trim().is_empty() {
            return;
        }

        let font_size = ts.font_size * start.vertical_scale();
        let width = advance * start.horizontal_scale();
        let (font_name, is_bold) = match font {
            Some(info) => (info.base_font.clone(), info.bold),
            None => (String::from_utf8_lossy(&ts.font).to_string(), false),
        };

        self.fragments.push(Fragment {
            text,
            page: self.page_num,
            x: start.e,
            y: start.f,
            width,
            font_size,
            font_name,
            is_bold,
        });
    }
}

/// Unscaled text-space advance of one string operand.
fn string_advance(font: Option<&BackendFontInfo>, bytes: &[u8], ts: &TextState) -> f32 {
    let codes = match font {
        Some(f) => f.char_codes(bytes),
        None => bytes.iter().map(|b| u32::from(*b)).collect(),
    };
    let single_byte = font.map(|f| !f.two_byte).unwrap_or(true);

    codes
        .iter()
        .map(|&code| {
            let glyph = font.map(|f| f.glyph_width(code)).unwrap_or(500.0) / 1000.0;
            let word = if single_byte && code == 32 {
                ts.word_spacing
            } else {
                0.0
            };
            (glyph * ts.font_size + ts.char_spacing + word) * ts.horizontal_scaling
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// In-memory backend serving pre-decoded operations.
    struct FakeBackend {
        pages: Vec<std::result::Result<Vec<ContentOp>, String>>,
        fonts: Vec<BackendFontInfo>,
        encrypted: bool,
    }

    impl PdfBackend for FakeBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            (1..=self.pages.len() as u32).map(|n| (n, (n, 0))).collect()
        }

        fn page_fonts(&self, _page: PageId) -> Result<Vec<BackendFontInfo>> {
            Ok(self.fonts.clone())
        }

        fn page_content(&self, page: PageId) -> Result<Vec<u8>> {
            Ok(vec![page.0 as u8])
        }

        fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
            self.pages[data[0] as usize - 1]
                .clone()
                .map_err(Error::UnreadablePdf)
        }

        fn decode_text(&self, _page: PageId, _font: &[u8], bytes: &[u8]) -> String {
            String::from_utf8_lossy(bytes).to_string()
        }

        fn is_encrypted(&self) -> bool {
            self.encrypted
        }
    }

    fn op(operator: &str, operands: Vec<PdfValue>) -> ContentOp {
        ContentOp {
            operator: operator.to_string(),
            operands,
        }
    }

    fn num(n: f32) -> PdfValue {
        PdfValue::Real(n)
    }

    fn s(text: &str) -> PdfValue {
        PdfValue::Str(text.as_bytes().to_vec())
    }

    fn fonts() -> Vec<BackendFontInfo> {
        vec![
            BackendFontInfo {
                name: b"F1".to_vec(),
                base_font: "Helvetica".into(),
                first_char: 32,
                widths: vec![278.0; 96],
                ..Default::default()
            },
            BackendFontInfo {
                name: b"F2".to_vec(),
                base_font: "Helvetica-Bold".into(),
                bold: true,
                ..Default::default()
            },
        ]
    }

    fn name(n: &str) -> PdfValue {
        PdfValue::Name(n.as_bytes().to_vec())
    }

    #[test]
    fn test_tm_and_tj_positions() {
        let backend = FakeBackend {
            pages: vec![Ok(vec![
                op("BT", vec![]),
                op("Tf", vec![name("F2"), num(24.0)]),
                op("Tm", vec![num(1.0), num(0.0), num(0.0), num(1.0), num(50.0), num(700.0)]),
                op("Tj", vec![s("Jane Doe")]),
                op("Tf", vec![name("F1"), num(10.0)]),
                op("Td", vec![num(0.0), num(-30.0)]),
                op("Tj", vec![s("Senior Engineer")]),
                op("ET", vec![]),
            ])],
            fonts: fonts(),
            encrypted: false,
        };

        let out = extract_from_backend(&backend, &ParseOptions::default()).unwrap();
        assert_eq!(out.fragments.len(), 2);

        let name = &out.fragments[0];
        assert_eq!(name.text, "Jane Doe");
        assert_eq!((name.x, name.y), (50.0, 700.0));
        assert_eq!(name.font_size, 24.0);
        assert!(name.is_bold);
        // 8 glyphs at the 500 fallback width
        assert!((name.width - 8.0 * 0.5 * 24.0).abs() < 0.01);

        let headline = &out.fragments[1];
        assert_eq!((headline.x, headline.y), (50.0, 670.0));
        assert!(!headline.is_bold);
        assert!((headline.width - 15.0 * 0.278 * 10.0).abs() < 0.01);
    }

    #[test]
    fn test_cm_scales_font_size() {
        let backend = FakeBackend {
            pages: vec![Ok(vec![
                op("q", vec![]),
                op("cm", vec![num(2.0), num(0.0), num(0.0), num(2.0), num(10.0), num(20.0)]),
                op("BT", vec![]),
                op("Tf", vec![name("F1"), num(5.0)]),
                op("Td", vec![num(5.0), num(5.0)]),
                op("Tj", vec![s("Scaled")]),
                op("ET", vec![]),
                op("Q", vec![]),
            ])],
            fonts: fonts(),
            encrypted: false,
        };

        let out = extract_from_backend(&backend, &ParseOptions::default()).unwrap();
        let frag = &out.fragments[0];
        assert_eq!(frag.font_size, 10.0);
        assert_eq!((frag.x, frag.y), (20.0, 30.0));
    }

    #[test]
    fn test_tj_array_inserts_word_space() {
        let backend = FakeBackend {
            pages: vec![Ok(vec![
                op("BT", vec![]),
                op("Tf", vec![name("F1"), num(10.0)]),
                op(
                    "TJ",
                    vec![PdfValue::Array(vec![s("Go,"), PdfValue::Integer(-250), s("Rust")])],
                ),
                op("ET", vec![]),
            ])],
            fonts: fonts(),
            encrypted: false,
        };

        let out = extract_from_backend(&backend, &ParseOptions::default()).unwrap();
        assert_eq!(out.fragments[0].text, "Go, Rust");
    }

    #[test]
    fn test_leading_and_next_line() {
        let backend = FakeBackend {
            pages: vec![Ok(vec![
                op("BT", vec![]),
                op("Tf", vec![name("F1"), num(10.0)]),
                op("TL", vec![num(14.0)]),
                op("Td", vec![num(72.0), num(500.0)]),
                op("Tj", vec![s("first")]),
                op("'", vec![s("second")]),
                op("ET", vec![]),
            ])],
            fonts: fonts(),
            encrypted: false,
        };

        let out = extract_from_backend(&backend, &ParseOptions::default()).unwrap();
        assert_eq!(out.fragments[1].y, 486.0);
        assert_eq!(out.fragments[1].x, 72.0);
    }

    #[test]
    fn test_lenient_skips_broken_page() {
        let backend = FakeBackend {
            pages: vec![
                Err("bad stream".into()),
                Ok(vec![
                    op("BT", vec![]),
                    op("Tj", vec![s("kept")]),
                    op("ET", vec![]),
                ]),
            ],
            fonts: fonts(),
            encrypted: false,
        };

        let out = extract_from_backend(&backend, &ParseOptions::default().lenient()).unwrap();
        assert_eq!(out.fragments.len(), 1);
        assert_eq!(out.fragments[0].page, 2);
        assert!(matches!(out.warnings[0], Warning::PageSkipped { page: 1, .. }));

        let err = extract_from_backend(&backend, &ParseOptions::default().strict()).unwrap_err();
        assert!(err.is_unreadable_pdf());
    }

    #[test]
    fn test_encrypted_without_text_is_fatal() {
        let backend = FakeBackend {
            pages: vec![Ok(vec![])],
            fonts: fonts(),
            encrypted: true,
        };
        let err = extract_from_backend(&backend, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Encrypted));
    }

    #[test]
    fn test_text_outside_bt_is_ignored() {
        let backend = FakeBackend {
            pages: vec![Ok(vec![op("Tj", vec![s("stray")])])],
            fonts: fonts(),
            encrypted: false,
        };
        let out = extract_from_backend(&backend, &ParseOptions::default()).unwrap();
        assert!(out.fragments.is_empty());
    }
}
