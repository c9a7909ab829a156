//! Flat list sections: skills, languages and interests.

use std::collections::HashSet;

use crate::model::{InterestEntry, LanguageEntry, SkillEntry};
use crate::parser::Line;

use super::patterns::{clean, is_noise_line, normalize_key, strip_bullet, LIST_DELIMITER, PAREN_TAIL};

/// Items of every line, split on list delimiters, deduplicated
/// case-insensitively. The first spelling seen wins.
pub fn split_items<'a, I>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for text in texts {
        if is_noise_line(text) {
            continue;
        }
        for part in LIST_DELIMITER.split(text) {
            let item = clean(strip_bullet(part));
            if item.is_empty() {
                continue;
            }
            if seen.insert(normalize_key(&item)) {
                items.push(item);
            }
        }
    }
    items
}

fn texts(lines: &[Line]) -> impl Iterator<Item = &str> {
    lines.iter().map(|l| l.trimmed())
}

pub fn extract_skills(lines: &[Line]) -> Vec<SkillEntry> {
    split_items(texts(lines))
        .into_iter()
        .map(SkillEntry::new)
        .collect()
}

/// `Hobbies: chess, climbing` keeps only the list.
fn strip_list_label(text: &str) -> &str {
    match text.split_once(':') {
        Some((label, rest)) if label.split_whitespace().count() <= 2 => rest,
        _ => text,
    }
}

pub fn extract_interests(lines: &[Line]) -> Vec<InterestEntry> {
    split_items(texts(lines).map(strip_list_label))
        .into_iter()
        .map(|name| InterestEntry { name })
        .collect()
}

/// `English (Native or Bilingual)` → language plus fluency. A line that is
/// only `(...)` is the wrapped fluency of the previous language.
pub fn extract_languages(lines: &[Line]) -> Vec<LanguageEntry> {
    let mut languages: Vec<LanguageEntry> = Vec::new();

    for text in texts(lines) {
        if text.starts_with('(') && text.ends_with(')') {
            if let Some(last) = languages.last_mut().filter(|l| l.fluency.is_none()) {
                last.fluency = Some(clean(text.trim_matches(|c| c == '(' || c == ')')));
                continue;
            }
        }

        for item in split_items([text]) {
            let entry = match PAREN_TAIL.captures(&item) {
                Some(caps) => LanguageEntry {
                    language: clean(&caps[1]),
                    fluency: Some(clean(&caps[2])),
                },
                None => LanguageEntry {
                    language: item,
                    fluency: None,
                },
            };
            let key = normalize_key(&entry.language);
            if !languages.iter().any(|l| normalize_key(&l.language) == key) {
                languages.push(entry);
            }
        }
    }
    languages
}
