//! Section segmentation.
//!
//! A finite-state machine over reconstructed lines. The state is the kind
//! of the section currently open; it starts at [`SectionKind::Header`].
//! Each line is classified once (see [`classify`]) and the transition is
//! a pure function of the current state and that classification (see
//! [`next_state`]). Lines are never dropped: every input line ends up in
//! exactly one output section, in document order.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use super::lines::Line;
use super::options::SegmentOptions;

/// Labeled region of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    /// Identity and contact block
    Header,
    Summary,
    Experience,
    Education,
    Skills,
    Certifications,
    Languages,
    Projects,
    Volunteer,
    Interests,
    /// Heading not in the vocabulary; lines kept, not field-extracted
    Unknown,
}

impl SectionKind {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Header => "header",
            SectionKind::Summary => "summary",
            SectionKind::Experience => "experience",
            SectionKind::Education => "education",
            SectionKind::Skills => "skills",
            SectionKind::Certifications => "certifications",
            SectionKind::Languages => "languages",
            SectionKind::Projects => "projects",
            SectionKind::Volunteer => "volunteer",
            SectionKind::Interests => "interests",
            SectionKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heading aliases per section kind. Matched after [`normalize_heading`].
const VOCABULARY: &[(SectionKind, &[&str])] = &[
    (
        SectionKind::Header,
        &[
            "contact",
            "contact info",
            "contact information",
            "contacto",
            "coordonnées",
            "kontakt",
            "contatto",
            "contato",
            "contactgegevens",
            "контакты",
            "контактная информация",
            "способы связаться",
        ],
    ),
    (
        SectionKind::Summary,
        &[
            "summary",
            "about",
            "profile",
            "extracto",
            "acerca de",
            "sobre",
            "resumo",
            "résumé",
            "à propos",
            "profil",
            "zusammenfassung",
            "riepilogo",
            "samenvatting",
            "обо мне",
            "о себе",
            "общие сведения",
            "сводка",
            "профиль",
        ],
    ),
    (
        SectionKind::Experience,
        &[
            "experience",
            "work experience",
            "professional experience",
            "experiencia",
            "experiencia laboral",
            "expérience",
            "berufserfahrung",
            "erfahrung",
            "experiência",
            "esperienza",
            "ervaring",
            "werkervaring",
            "опыт",
            "опыт работы",
        ],
    ),
    (
        SectionKind::Education,
        &[
            "education",
            "educación",
            "formación",
            "formation",
            "ausbildung",
            "educação",
            "formação acadêmica",
            "istruzione",
            "formazione",
            "opleiding",
            "opleidingen",
            "образование",
        ],
    ),
    (
        SectionKind::Skills,
        &[
            "skills",
            "top skills",
            "aptitudes",
            "aptitudes principales",
            "habilidades",
            "principais competências",
            "competências",
            "compétences",
            "principales compétences",
            "kenntnisse",
            "top kenntnisse",
            "kompetenzen",
            "competenze",
            "competenze principali",
            "vaardigheden",
            "belangrijkste vaardigheden",
            "навыки",
            "основные навыки",
            "ключевые навыки",
        ],
    ),
    (
        SectionKind::Certifications,
        &[
            "certifications",
            "licenses & certifications",
            "licenses and certifications",
            "licencias y certificaciones",
            "certificaciones",
            "certificados",
            "licenças e certificados",
            "certificações",
            "licences et certifications",
            "certificats",
            "bescheinigungen",
            "zertifikate",
            "licenze e certificazioni",
            "certificazioni",
            "certificeringen",
            "сертификаты",
            "сертификации",
            "лицензии и сертификаты",
        ],
    ),
    (
        SectionKind::Languages,
        &[
            "languages",
            "idiomas",
            "langues",
            "sprachen",
            "sprachkenntnisse",
            "lingue",
            "talen",
            "языки",
        ],
    ),
    (
        SectionKind::Projects,
        &[
            "projects",
            "proyectos",
            "projetos",
            "projets",
            "projekte",
            "progetti",
            "projecten",
            "проекты",
        ],
    ),
    (
        SectionKind::Volunteer,
        &[
            "volunteer",
            "volunteering",
            "volunteer experience",
            "voluntariado",
            "volontariat",
            "ehrenamt",
            "volontariato",
            "vrijwilligerswerk",
            "волонтерство",
            "волонтерская деятельность",
        ],
    ),
    (
        SectionKind::Interests,
        &[
            "interests",
            "hobbies",
            "intereses",
            "aficiones",
            "interesses",
            "centres d'intérêt",
            "centres d'interet",
            "interessen",
            "interessi",
            "интересы",
            "увлечения",
            "хобби",
        ],
    ),
];

static HEADING_LOOKUP: Lazy<HashMap<String, SectionKind>> = Lazy::new(|| {
    VOCABULARY
        .iter()
        .flat_map(|(kind, aliases)| aliases.iter().map(move |a| (normalize_heading(a), *kind)))
        .collect()
});

/// NFKC, case-folded, punctuation other than `&` replaced by spaces,
/// whitespace collapsed.
pub fn normalize_heading(text: &str) -> String {
    let folded: String = text
        .nfkc()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || c == '&' {
                c
            } else {
                ' '
            }
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Look up a heading text in the vocabulary.
pub fn lookup_heading(text: &str) -> Option<SectionKind> {
    HEADING_LOOKUP.get(&normalize_heading(text)).copied()
}

/// Document-wide font statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontProfile {
    /// Most common size, weighted by characters
    pub body_size: f32,
    /// Largest size on any line
    pub max_size: f32,
    /// Largest size on the first page
    pub first_page_max: f32,
}

impl FontProfile {
    /// Measure the lines of a document. Ties for the body size go to the smaller size.
    pub fn from_lines(lines: &[Line]) -> Self {
        let mut histogram: BTreeMap<i32, usize> = BTreeMap::new();
        for line in lines {
            let key = (line.font_size * 10.0).round() as i32;
            *histogram.entry(key).or_insert(0) += line.text.chars().count();
        }

        let mut body: Option<(i32, usize)> = None;
        for (&key, &count) in &histogram {
            if body.map(|(_, c)| count > c).unwrap_or(true) {
                body = Some((key, count));
            }
        }

        let first_page = lines.iter().map(|l| l.page).min().unwrap_or(1);

        Self {
            body_size: body.map(|(k, _)| k as f32 / 10.0).unwrap_or(0.0),
            max_size: lines.iter().map(|l| l.font_size).fold(0.0, f32::max),
            first_page_max: lines
                .iter()
                .filter(|l| l.page == first_page)
                .map(|l| l.font_size)
                .fold(0.0, f32::max),
        }
    }
}

/// Why a line was taken for a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Matched the heading vocabulary
    Vocabulary(SectionKind),
    /// Largest text on the first page: the profile's name
    Title,
    /// Heading-shaped, heading-sized, unknown text
    Unrecognized,
}

impl Trigger {
    /// Section kind this heading opens.
    pub fn target(&self) -> SectionKind {
        match self {
            Trigger::Vocabulary(kind) => *kind,
            Trigger::Title => SectionKind::Header,
            Trigger::Unrecognized => SectionKind::Unknown,
        }
    }
}

/// Classification of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Body,
    Heading(Trigger),
}

/// Short, digit-free, few words.
fn has_heading_shape(text: &str, options: &SegmentOptions) -> bool {
    let text = text.trim();
    let words = text.split_whitespace().count();
    text.chars().count() <= options.max_heading_chars
        && !text.chars().any(|c| c.is_ascii_digit())
        && (1..=options.max_heading_words).contains(&words)
}

/// Classify one line against the document's font profile.
pub fn classify(line: &Line, profile: &FontProfile, options: &SegmentOptions) -> LineClass {
    const EPS: f32 = 0.01;

    if line.font_size + EPS < profile.body_size + options.heading_margin
        || !has_heading_shape(&line.text, options)
    {
        return LineClass::Body;
    }

    if let Some(kind) = lookup_heading(&line.text) {
        return LineClass::Heading(Trigger::Vocabulary(kind));
    }

    let is_title = line.font_size + EPS >= profile.first_page_max
        && line.font_size + EPS >= profile.max_size
        && line.font_size + EPS >= profile.body_size * options.title_ratio
        && line.page == 1;
    if is_title {
        LineClass::Heading(Trigger::Title)
    } else {
        LineClass::Heading(Trigger::Unrecognized)
    }
}

/// Transition function of the segmenter.
pub fn next_state(current: SectionKind, class: LineClass) -> SectionKind {
    match class {
        LineClass::Body => current,
        LineClass::Heading(trigger) => trigger.target(),
    }
}

/// How two heading candidates with no body line between them are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjacentHeadingPolicy {
    /// The earlier heading is a stray oversized line; it becomes a body
    /// line of the section before it. A title line is never discarded.
    #[default]
    DiscardEarlier,
    /// Both headings open sections; the earlier one stays empty.
    KeepBoth,
}

/// Outcome of [`AdjacentHeadingPolicy::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    KeepEarlier,
    DemoteEarlier,
}

impl AdjacentHeadingPolicy {
    /// Decide the fate of `earlier` when `later` follows it directly.
    pub fn resolve(&self, earlier: Trigger, _later: Trigger) -> Resolution {
        match (self, earlier) {
            (AdjacentHeadingPolicy::KeepBoth, _) => Resolution::KeepEarlier,
            (AdjacentHeadingPolicy::DiscardEarlier, Trigger::Title) => Resolution::KeepEarlier,
            (AdjacentHeadingPolicy::DiscardEarlier, _) => Resolution::DemoteEarlier,
        }
    }
}

/// How a section was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Opener {
    /// Implicit start of the document
    Start,
    /// A heading line, kept as the first line
    Heading,
    /// The title (name) line, kept as the first line
    Title,
}

/// A contiguous labeled run of lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub kind: SectionKind,
    pub opener: Opener,
    /// All lines, including the opening heading when there is one
    pub lines: Vec<Line>,
}

impl Section {
    fn start(kind: SectionKind) -> Self {
        Self {
            kind,
            opener: Opener::Start,
            lines: Vec::new(),
        }
    }

    fn opened_by(trigger: Trigger, line: Line) -> Self {
        Self {
            kind: trigger.target(),
            opener: match trigger {
                Trigger::Title => Opener::Title,
                _ => Opener::Heading,
            },
            lines: vec![line],
        }
    }

    /// The opening heading line.
    pub fn heading(&self) -> Option<&Line> {
        match self.opener {
            Opener::Start => None,
            Opener::Heading | Opener::Title => self.lines.first(),
        }
    }

    /// Heading text, trimmed.
    pub fn heading_text(&self) -> Option<&str> {
        self.heading().map(|l| l.text.trim())
    }

    /// Lines after the heading.
    pub fn body(&self) -> &[Line] {
        match self.opener {
            Opener::Start => &self.lines,
            Opener::Heading | Opener::Title => self.lines.get(1..).unwrap_or(&[]),
        }
    }
}

/// Partition lines into sections.
pub fn segment(lines: Vec<Line>, options: &SegmentOptions) -> Vec<Section> {
    let profile = FontProfile::from_lines(&lines);
    log::debug!(
        "font profile: body={:.1} max={:.1}",
        profile.body_size,
        profile.max_size
    );

    let mut sections: Vec<Section> = Vec::new();
    let mut current = Section::start(SectionKind::Header);
    let mut last_heading: Option<Trigger> = None;

    for line in lines {
        let class = classify(&line, &profile, options);
        let state = next_state(current.kind, class);

        match class {
            LineClass::Body => {
                debug_assert_eq!(state, current.kind);
                current.lines.push(line);
                last_heading = None;
            }
            LineClass::Heading(trigger) => {
                if let Some(earlier) = last_heading {
                    if options.adjacent_heading_policy.resolve(earlier, trigger)
                        == Resolution::DemoteEarlier
                    {
                        log::debug!(
                            "discarding adjacent heading {:?} before {:?}",
                            current.heading_text().unwrap_or_default(),
                            line.text
                        );
                        let demoted = std::mem::replace(
                            &mut current,
                            sections
                                .pop()
                                .unwrap_or_else(|| Section::start(SectionKind::Header)),
                        );
                        current.lines.extend(demoted.lines);
                    }
                }

                if !current.lines.is_empty() {
                    sections.push(current);
                }
                log::debug!("{} section opened by {:?}", state, line.text);
                current = Section::opened_by(trigger, line);
                last_heading = Some(trigger);
            }
        }
    }

    if !current.lines.is_empty() {
        sections.push(current);
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extractor::Fragment;
    use crate::parser::options::LayoutOptions;

    fn line(text: &str, page: u32, y: f32, size: f32) -> Line {
        Line::from_fragments(
            vec![Fragment::new(text, page, 50.0, y, size)],
            0,
            &LayoutOptions::default(),
        )
    }

    fn body(text: &str, y: f32) -> Line {
        line(text, 1, y, 10.0)
    }

    fn heading(text: &str, y: f32) -> Line {
        line(text, 1, y, 14.0)
    }

    fn kinds(sections: &[Section]) -> Vec<SectionKind> {
        sections.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_normalize_heading() {
        assert_eq!(normalize_heading("  Licenses &  Certifications "), "licenses & certifications");
        assert_eq!(normalize_heading("EXPERIENCE:"), "experience");
        assert_eq!(normalize_heading("Top-Kenntnisse"), "top kenntnisse");
        assert_eq!(normalize_heading("Ｓｋｉｌｌｓ"), "skills");
    }

    #[test]
    fn test_vocabulary_lookup() {
        assert_eq!(lookup_heading("Work Experience"), Some(SectionKind::Experience));
        assert_eq!(lookup_heading("Berufserfahrung"), Some(SectionKind::Experience));
        assert_eq!(lookup_heading("Опыт работы"), Some(SectionKind::Experience));
        assert_eq!(lookup_heading("Centres d'intérêt"), Some(SectionKind::Interests));
        assert_eq!(lookup_heading("Contact"), Some(SectionKind::Header));
        assert_eq!(lookup_heading("Honors & Awards"), None);
    }

    #[test]
    fn test_font_profile_body_ties_to_smaller() {
        let lines = vec![body("abcd", 700.0), heading("wxyz", 680.0)];
        let profile = FontProfile::from_lines(&lines);
        assert_eq!(profile.body_size, 10.0);
        assert_eq!(profile.max_size, 14.0);
    }

    #[test]
    fn test_classify() {
        let lines = vec![
            line("Jane Doe", 1, 750.0, 24.0),
            body("a long body line that sets the body size of this document", 700.0),
            heading("Experience", 650.0),
            heading("Honors", 600.0),
            body("Skills", 550.0),
            heading("2019 Awards", 500.0),
        ];
        let profile = FontProfile::from_lines(&lines);
        let opts = SegmentOptions::default();
        let classes: Vec<_> = lines.iter().map(|l| classify(l, &profile, &opts)).collect();
        assert_eq!(classes[0], LineClass::Heading(Trigger::Title));
        assert_eq!(classes[1], LineClass::Body);
        assert_eq!(
            classes[2],
            LineClass::Heading(Trigger::Vocabulary(SectionKind::Experience))
        );
        assert_eq!(classes[3], LineClass::Heading(Trigger::Unrecognized));
        // vocabulary text at body size is not a heading
        assert_eq!(classes[4], LineClass::Body);
        // digits disqualify
        assert_eq!(classes[5], LineClass::Body);
    }

    #[test]
    fn test_next_state_table() {
        assert_eq!(next_state(SectionKind::Header, LineClass::Body), SectionKind::Header);
        assert_eq!(
            next_state(
                SectionKind::Header,
                LineClass::Heading(Trigger::Vocabulary(SectionKind::Skills))
            ),
            SectionKind::Skills
        );
        assert_eq!(
            next_state(SectionKind::Skills, LineClass::Heading(Trigger::Title)),
            SectionKind::Header
        );
        assert_eq!(
            next_state(SectionKind::Skills, LineClass::Heading(Trigger::Unrecognized)),
            SectionKind::Unknown
        );
    }

    #[test]
    fn test_segment_basic() {
        let lines = vec![
            body("Jane Doe", 750.0),
            body("Senior Engineer", 730.0),
            heading("Experience", 700.0),
            body("Acme Corp", 680.0),
            heading("Skills", 650.0),
            body("Go, Rust, Python", 630.0),
        ];
        let sections = segment(lines, &SegmentOptions::default());
        assert_eq!(
            kinds(&sections),
            vec![SectionKind::Header, SectionKind::Experience, SectionKind::Skills]
        );
        assert_eq!(sections[0].opener, Opener::Start);
        assert_eq!(sections[0].body().len(), 2);
        assert_eq!(sections[1].heading_text(), Some("Experience"));
        assert_eq!(sections[1].body()[0].text, "Acme Corp");
    }

    #[test]
    fn test_unknown_heading_preserved() {
        let lines = vec![
            body("Jane Doe", 750.0),
            heading("Honors", 700.0),
            body("Best Paper", 680.0),
        ];
        let sections = segment(lines, &SegmentOptions::default());
        assert_eq!(kinds(&sections), vec![SectionKind::Header, SectionKind::Unknown]);
        assert_eq!(sections[1].lines.len(), 2);
    }

    #[test]
    fn test_adjacent_headings_discard_earlier() {
        let lines = vec![
            body("Jane Doe", 750.0),
            heading("Honors", 700.0),
            heading("Experience", 680.0),
            body("Acme Corp", 660.0),
        ];
        let sections = segment(lines.clone(), &SegmentOptions::default());
        assert_eq!(kinds(&sections), vec![SectionKind::Header, SectionKind::Experience]);
        assert_eq!(sections[0].lines.len(), 2);
        assert_eq!(sections[0].lines[1].text, "Honors");

        let keep = SegmentOptions {
            adjacent_heading_policy: AdjacentHeadingPolicy::KeepBoth,
            ..Default::default()
        };
        let sections = segment(lines, &keep);
        assert_eq!(
            kinds(&sections),
            vec![SectionKind::Header, SectionKind::Unknown, SectionKind::Experience]
        );
    }

    #[test]
    fn test_leading_adjacent_heading_demoted_into_header() {
        let lines = vec![
            heading("Honors", 700.0),
            heading("Skills", 680.0),
            body("Go, Rust, Python, TypeScript", 660.0),
        ];
        let sections = segment(lines, &SegmentOptions::default());
        assert_eq!(kinds(&sections), vec![SectionKind::Header, SectionKind::Skills]);
        assert_eq!(sections[0].opener, Opener::Start);
    }

    #[test]
    fn test_title_reenters_header() {
        let lines = vec![
            heading("Contact", 750.0),
            body("jane@example.com", 730.0),
            heading("Top Skills", 700.0),
            body("Rust", 680.0),
            line("Jane Doe", 1, 760.0, 24.0),
            body("Senior Engineer", 740.0),
            body("a long body line that sets the body size of this document", 720.0),
        ];
        let sections = segment(lines, &SegmentOptions::default());
        assert_eq!(
            kinds(&sections),
            vec![SectionKind::Header, SectionKind::Skills, SectionKind::Header]
        );
        assert_eq!(sections[2].opener, Opener::Title);
        assert_eq!(sections[2].heading_text(), Some("Jane Doe"));
    }

    #[test]
    fn test_partition_holds() {
        let lines = vec![
            heading("Summary", 760.0),
            heading("Honors", 740.0),
            body("a long body line that sets the body size", 720.0),
            heading("Skills", 700.0),
            heading("Languages", 680.0),
            body("English", 660.0),
        ];
        let sections = segment(lines.clone(), &SegmentOptions::default());
        let flattened: Vec<Line> = sections.into_iter().flat_map(|s| s.lines).collect();
        assert_eq!(flattened, lines);
    }

    #[test]
    fn test_empty_input() {
        assert!(segment(Vec::new(), &SegmentOptions::default()).is_empty());
    }
}
