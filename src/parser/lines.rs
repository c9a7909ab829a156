//! Line reconstruction: fragments → visual lines in reading order.

use std::collections::BTreeMap;

use serde::Serialize;

use super::extractor::Fragment;
use super::options::LayoutOptions;

/// Slice width used when scanning for a column gutter.
const SLICE_WIDTH: f32 = 3.0;
/// Pages narrower than this never split into columns.
const MIN_SPLIT_WIDTH: f32 = 250.0;
/// Gaps narrower than this are not gutter candidates.
const MIN_CANDIDATE_GAP: f32 = 10.0;
/// Widest span scanned for a gutter; wider text runs are clipped.
const MAX_PAGE_WIDTH: f32 = 5000.0;

/// A visual line: fragments sharing a page, a column and a vertical band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    /// 1-based page number
    pub page: u32,
    /// Column index on the page (0 = leftmost)
    pub column: usize,
    /// Leftmost X position
    pub x: f32,
    /// Baseline of the topmost fragment
    pub y: f32,
    /// Font size carrying the most characters
    pub font_size: f32,
    /// More than half of the characters are bold
    pub is_bold: bool,
    /// Fragments joined left to right
    pub text: String,
    /// The fragments, sorted by X
    #[serde(skip)]
    pub fragments: Vec<Fragment>,
}

impl Line {
    /// Build a line from fragments already known to share a band.
    pub fn from_fragments(
        mut fragments: Vec<Fragment>,
        column: usize,
        options: &LayoutOptions,
    ) -> Self {
        fragments.sort_by(|a, b| a.x.total_cmp(&b.x));

        let page = fragments.first().map(|f| f.page).unwrap_or(0);
        let x = fragments.first().map(|f| f.x).unwrap_or(0.0);
        let y = fragments
            .iter()
            .map(|f| f.y)
            .max_by(|a, b| a.total_cmp(b))
            .unwrap_or(0.0);

        Self {
            page,
            column,
            x,
            y,
            font_size: dominant_size(&fragments),
            is_bold: mostly_bold(&fragments),
            text: join_fragments(&fragments, options.space_gap_ratio),
            fragments,
        }
    }

    /// Trimmed text.
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Number of whitespace-separated words.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Font size weighted by character count; ties go to the smaller size.
fn dominant_size(fragments: &[Fragment]) -> f32 {
    let mut histogram: BTreeMap<i32, usize> = BTreeMap::new();
    for frag in fragments {
        let key = (frag.font_size * 10.0).round() as i32;
        *histogram.entry(key).or_insert(0) += frag.text.chars().count();
    }
    let mut best: Option<(i32, usize)> = None;
    for (&key, &count) in &histogram {
        if best.map(|(_, c)| count > c).unwrap_or(true) {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key as f32 / 10.0).unwrap_or(0.0)
}

fn mostly_bold(fragments: &[Fragment]) -> bool {
    let bold_chars: usize = fragments
        .iter()
        .filter(|f| f.is_bold)
        .map(|f| f.text.chars().count())
        .sum();
    let total_chars: usize = fragments.iter().map(|f| f.text.chars().count()).sum();
    total_chars > 0 && bold_chars as f32 / total_chars as f32 > 0.5
}

/// Concatenate X-sorted fragments, inserting a space across visible gaps.
fn join_fragments(fragments: &[Fragment], space_gap_ratio: f32) -> String {
    let mut result = String::new();

    for (i, frag) in fragments.iter().enumerate() {
        if i > 0 {
            let prev = &fragments[i - 1];
            let gap = frag.x - prev.right();

            let char_count = frag.text.chars().count();
            let avg_char_width = if char_count > 0 && frag.width > 0.0 {
                frag.width / char_count as f32
            } else {
                frag.font_size * 0.5
            };

            let spaceless = matches!(
                (prev.text.chars().last(), frag.text.chars().next()),
                (Some(a), Some(b)) if is_spaceless_script_char(a) && is_spaceless_script_char(b)
            );
            let has_space = result.ends_with(char::is_whitespace)
                || frag.text.starts_with(char::is_whitespace);

            if gap > avg_char_width * space_gap_ratio && !spaceless && !has_space {
                result.push(' ');
            }
        }
        result.push_str(&frag.text);
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Scripts written without spaces between words (Han, kana).
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;
    (0x4E00..=0x9FFF).contains(&code)
        || (0x3400..=0x4DBF).contains(&code)
        || (0x20000..=0x2EBEF).contains(&code)
        || (0x3040..=0x309F).contains(&code)
        || (0x30A0..=0x30FF).contains(&code)
        || (0x3000..=0x303F).contains(&code)
}

/// Group fragments into lines ordered by (page, column, y descending).
///
/// Whitespace-only fragments are dropped first. Two fragments share a line
/// when their baselines differ by less than `line_tolerance_ratio` times the
/// smaller font size.
pub fn reconstruct_lines(fragments: &[Fragment], options: &LayoutOptions) -> Vec<Line> {
    let mut pages: BTreeMap<u32, Vec<Fragment>> = BTreeMap::new();
    for frag in fragments.iter().filter(|f| !f.text.trim().is_empty()) {
        pages.entry(frag.page).or_default().push(frag.clone());
    }

    let mut lines = Vec::new();
    for (page, frags) in pages {
        let gutter = if options.detect_columns {
            detect_gutter(&frags, options)
        } else {
            None
        };

        let mut columns: [Vec<Fragment>; 2] = [Vec::new(), Vec::new()];
        match gutter {
            Some(g) => {
                log::debug!("page {}: two columns split at x={:.1}", page, g);
                for frag in frags {
                    let idx = usize::from(frag.center() >= g);
                    columns[idx].push(frag);
                }
            }
            None => columns[0] = frags,
        }

        for (column, frags) in columns.into_iter().enumerate() {
            lines.extend(group_column(frags, column, options));
        }
    }

    lines
}

/// Y-band grouping within a single column.
fn group_column(mut frags: Vec<Fragment>, column: usize, options: &LayoutOptions) -> Vec<Line> {
    // Stable: equal positions keep emission order.
    frags.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines = Vec::new();
    let mut current: Vec<Fragment> = Vec::new();
    let mut band_y = 0.0f32;
    let mut band_size = 0.0f32;

    for frag in frags {
        if !current.is_empty() {
            let tolerance = options.line_tolerance_ratio * band_size.min(frag.font_size);
            if (frag.y - band_y).abs() < tolerance {
                band_size = band_size.min(frag.font_size);
                current.push(frag);
                continue;
            }
            lines.push(Line::from_fragments(
                std::mem::take(&mut current),
                column,
                options,
            ));
        }
        band_y = frag.y;
        band_size = frag.font_size;
        current.push(frag);
    }

    if !current.is_empty() {
        lines.push(Line::from_fragments(current, column, options));
    }

    lines
}

/// Find a vertical gutter splitting the page into two columns.
///
/// Scans narrow vertical slices for occupancy and picks the widest empty
/// run in the middle band of the page, preferring runs near the center.
pub fn detect_gutter(frags: &[Fragment], options: &LayoutOptions) -> Option<f32> {
    let spans: Vec<(f32, f32)> = frags
        .iter()
        .filter(|f| f.x.is_finite() && f.right().is_finite())
        .map(|f| (f.x, f.right().max(f.x)))
        .collect();
    let min_x = spans.iter().map(|s| s.0).min_by(|a, b| a.total_cmp(b))?;
    let max_x = spans.iter().map(|s| s.1).max_by(|a, b| a.total_cmp(b))?;
    let page_width = (max_x - min_x).min(MAX_PAGE_WIDTH);
    if page_width < MIN_SPLIT_WIDTH {
        return None;
    }

    let num_slices = (page_width / SLICE_WIDTH) as usize + 1;
    let mut occupancy = vec![0usize; num_slices];
    for &(left, right) in &spans {
        let start = ((left - min_x) / SLICE_WIDTH) as usize;
        let end = ((right.min(min_x + page_width) - min_x) / SLICE_WIDTH) as usize;
        for slot in occupancy
            .iter_mut()
            .take(end.min(num_slices - 1) + 1)
            .skip(start)
        {
            *slot += 1;
        }
    }

    let search_start = num_slices * 15 / 100;
    let search_end = num_slices * 85 / 100;
    let center = num_slices as i64 / 2;

    let mut best: Option<(usize, usize)> = None;
    let mut best_center_dist = i64::MAX;
    let mut run_start = 0;
    let mut run_len = 0;

    let mut consider = |start: usize, len: usize, best: &mut Option<(usize, usize)>| {
        let width = len as f32 * SLICE_WIDTH;
        if width < MIN_CANDIDATE_GAP {
            return;
        }
        let dist = ((start + len / 2) as i64 - center).abs();
        let best_width = best.map(|(_, l)| l as f32 * SLICE_WIDTH).unwrap_or(0.0);
        if width > best_width * 1.5 || (width >= best_width * 0.7 && dist < best_center_dist) {
            *best = Some((start, len));
            best_center_dist = dist;
        }
    };

    for (i, &occ) in occupancy
        .iter()
        .enumerate()
        .take(search_end)
        .skip(search_start)
    {
        if occ == 0 {
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
        } else {
            if run_len > 0 {
                consider(run_start, run_len, &mut best);
            }
            run_len = 0;
        }
    }
    if run_len > 0 {
        consider(run_start, run_len, &mut best);
    }

    let (gap_start, gap_len) = best?;
    if (gap_len as f32 * SLICE_WIDTH) < options.min_gutter_width {
        return None;
    }

    let gutter = min_x + (gap_start as f32 + gap_len as f32 / 2.0) * SLICE_WIDTH;
    if gutter - min_x < options.min_column_width || max_x - gutter < options.min_column_width {
        log::debug!("column too narrow, treating as single column");
        return None;
    }

    let left = frags.iter().filter(|f| f.center() < gutter).count();
    let right = frags.len() - left;
    let min_frags = (frags.len() / 10).max(2);
    if left < min_frags || right < min_frags {
        log::debug!("fragments too imbalanced, treating as single column");
        return None;
    }

    Some(gutter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> LayoutOptions {
        LayoutOptions::default()
    }

    #[test]
    fn test_same_band_joins_with_space() {
        let frags = vec![
            Fragment::new("Rust", 1, 100.0, 500.0, 10.0),
            Fragment::new("Go,", 1, 50.0, 500.5, 10.0),
        ];
        let lines = reconstruct_lines(&frags, &opts());
        assert_eq!(lines.len(), 1);
        // "Go," ends at 65, "Rust" starts at 100
        assert_eq!(lines[0].text, "Go, Rust");
        assert_eq!(lines[0].x, 50.0);
    }

    #[test]
    fn test_adjacent_fragments_no_space() {
        let frags = vec![
            Fragment::new("Engin", 1, 50.0, 500.0, 10.0).with_width(25.0),
            Fragment::new("eer", 1, 75.0, 500.0, 10.0).with_width(15.0),
        ];
        let lines = reconstruct_lines(&frags, &opts());
        assert_eq!(lines[0].text, "Engineer");
    }

    #[test]
    fn test_lines_ordered_top_to_bottom_across_pages() {
        let frags = vec![
            Fragment::new("page two", 2, 50.0, 700.0, 10.0),
            Fragment::new("bottom", 1, 50.0, 100.0, 10.0),
            Fragment::new("top", 1, 50.0, 700.0, 10.0),
        ];
        let lines = reconstruct_lines(&frags, &opts());
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["top", "bottom", "page two"]);
    }

    #[test]
    fn test_blank_fragments_dropped() {
        let frags = vec![
            Fragment::new("   ", 1, 50.0, 700.0, 10.0),
            Fragment::new("", 1, 50.0, 600.0, 10.0),
            Fragment::new("kept", 1, 50.0, 500.0, 10.0),
        ];
        let lines = reconstruct_lines(&frags, &opts());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "kept");
    }

    #[test]
    fn test_tolerance_uses_smaller_font() {
        // 3pt apart: within 0.3 × 12 but not within 0.3 × 8
        let frags = vec![
            Fragment::new("Big", 1, 50.0, 500.0, 12.0),
            Fragment::new("small", 1, 120.0, 497.0, 8.0),
        ];
        let lines = reconstruct_lines(&frags, &opts());
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_dominant_size_and_bold() {
        let frags = vec![
            Fragment::new("Senior", 1, 50.0, 500.0, 12.0).bold(),
            Fragment::new("Engineer at Acme", 1, 90.0, 500.0, 10.0),
        ];
        let lines = reconstruct_lines(&frags, &opts());
        assert_eq!(lines[0].font_size, 10.0);
        assert!(!lines[0].is_bold);
    }

    #[test]
    fn test_two_columns_read_left_then_right() {
        let mut frags = Vec::new();
        for i in 0..6 {
            let y = 700.0 - i as f32 * 20.0;
            frags.push(Fragment::new(format!("side {}", i), 1, 30.0, y, 10.0).with_width(100.0));
            frags.push(Fragment::new(format!("main {}", i), 1, 250.0, y, 10.0).with_width(250.0));
        }
        let lines = reconstruct_lines(&frags, &opts());
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0].text, "side 0");
        assert_eq!(lines[5].text, "side 5");
        assert_eq!(lines[6].text, "main 0");
        assert_eq!(lines[6].column, 1);

        let single = reconstruct_lines(
            &frags,
            &LayoutOptions {
                detect_columns: false,
                ..opts()
            },
        );
        assert_eq!(single.len(), 6);
        assert_eq!(single[0].text, "side 0 main 0");
    }

    #[test]
    fn test_gutter_with_unbounded_widths() {
        let frags = vec![
            Fragment::new("side", 1, 30.0, 700.0, 10.0).with_width(100.0),
            Fragment::new("main", 1, 250.0, 700.0, 10.0).with_width(250.0),
            Fragment::new("runaway", 1, 40.0, 680.0, 10.0).with_width(f32::INFINITY),
            Fragment::new("huge", 1, 40.0, 660.0, 10.0).with_width(1.0e30),
            Fragment::new("nan", 1, f32::NAN, 640.0, 10.0),
        ];
        // the huge run covers every slice, so no gutter survives
        assert_eq!(detect_gutter(&frags, &opts()), None);

        let lines = reconstruct_lines(&frags, &opts());
        assert!(lines.iter().any(|l| l.text.contains("runaway")));
    }

    #[test]
    fn test_reconstruction_is_idempotent() {
        let frags = vec![
            Fragment::new("Jane", 1, 50.0, 700.0, 20.0).bold(),
            Fragment::new("Doe", 1, 110.0, 700.0, 20.0).bold(),
            Fragment::new("Berlin, Germany", 1, 50.0, 670.0, 10.0),
        ];
        let first = reconstruct_lines(&frags, &opts());
        let second = reconstruct_lines(&frags, &opts());
        assert_eq!(first, second);
    }
}
