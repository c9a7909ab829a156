//! Shared text patterns and line predicates.

use once_cell::sync::Lazy;
use regex::Regex;

pub static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").unwrap());

pub static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)https?://\S+|www\.\S+|linkedin\.com/\S+|github\.com/\S+|gitlab\.com/\S+")
        .unwrap()
});

pub static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[\s.-]?)?(?:\(?\d{2,4}\)?[\s.-]?)?\d{3}[\s.-]?\d{3,4}").unwrap()
});

/// `handle (LinkedIn)` as printed in the contact block.
pub static LINKEDIN_HANDLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\S+)\s*\(LinkedIn\)").unwrap());

/// Any `(label)` suffix such as `(Mobile)` or `(Company)`.
pub static PAREN_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)\s*$").unwrap());

static PAGE_FOOTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:page|seite|página|pagina|страница)\s+\d+\s+(?:of|/|von|de|di|из)\s*\d+$").unwrap());

static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\(?\d+\s+(?:years?|yrs?|months?|mos?|jahre?|monate?|años?|meses?|ans?|mois|anni|mesi|год|года|лет|месяц|месяца|месяцев)\b").unwrap()
});

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4}\b").unwrap());

/// Splits skill, language and interest lines.
pub static LIST_DELIMITER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[•·,;|]").unwrap());

/// `Name (Fluency)`.
pub static PAREN_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s*\(([^)]+)\)$").unwrap());

const BULLETS: &[char] = &['•', '-', '–', '—', '*', '▪', '●', '◦', '‣'];

const LOCATION_KEYWORDS: &[&str] = &[
    "area",
    "region",
    "province",
    "state",
    "metropolitan",
    "county",
    "область",
    "край",
    "регион",
    "агломерация",
    "район",
    "республика",
];

const EMPLOYMENT_TYPES: &[&str] = &[
    "full-time",
    "part-time",
    "contract",
    "internship",
    "self-employed",
    "freelance",
    "apprenticeship",
    "seasonal",
];

const ROLE_KEYWORDS: &[&str] = &[
    "developer",
    "engineer",
    "manager",
    "director",
    "lead",
    "architect",
    "consultant",
    "analyst",
    "designer",
    "owner",
    "founder",
    "intern",
    "cto",
    "ceo",
    "head of",
    "principal",
    "specialist",
    "scientist",
];

/// `Page 1 of 3` footers.
pub fn is_page_footer(text: &str) -> bool {
    PAGE_FOOTER.is_match(text.trim())
}

/// Lines field extractors ignore: footers and bare contact labels.
pub fn is_noise_line(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    lowered.is_empty()
        || is_page_footer(&lowered)
        || lowered == "contact"
        || lowered == "контакты"
        || lowered == "способы связаться"
}

/// `3 years 2 months` with no year number.
pub fn is_duration_line(text: &str) -> bool {
    let text = text.trim();
    !YEAR.is_match(text) && DURATION.is_match(text)
}

/// A bare tag such as `Full-time` or `Internship · Seasonal`. Every
/// `·`-separated part must be a known employment type, so titles like
/// `Contract Manager` are not tags.
pub fn is_employment_type_line(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return false;
    }
    lowered.split('·').all(|part| {
        let part = part.split_whitespace().collect::<Vec<_>>().join("-");
        EMPLOYMENT_TYPES.contains(&part.as_str())
    })
}

/// Starts with a bullet glyph or dash.
pub fn is_bullet_line(text: &str) -> bool {
    text.trim_start().starts_with(BULLETS)
}

/// Text with any leading bullet glyph removed.
pub fn strip_bullet(text: &str) -> &str {
    text.trim_start().trim_start_matches(BULLETS).trim()
}

pub fn contains_role_keyword(text: &str) -> bool {
    let lowered = text.to_lowercase();
    ROLE_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// `City, Region` or a location keyword, short, with no contact tokens.
pub fn is_location_text(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty()
        || text.chars().count() > 60
        || text.chars().any(|c| c.is_ascii_digit())
        || EMAIL.is_match(text)
        || URL.is_match(text)
        || text.to_lowercase().contains(" at ")
    {
        return false;
    }

    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let comma_form = (2..=3).contains(&parts.len())
        && parts.iter().all(|p| {
            let words = p.split_whitespace().count();
            (1..=4).contains(&words) && p.chars().next().map(char::is_uppercase).unwrap_or(false)
        });
    if comma_form && !contains_role_keyword(text) {
        return true;
    }

    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| LOCATION_KEYWORDS.contains(&word))
}

/// Phone number with at least seven digits.
pub fn find_phone(text: &str) -> Option<String> {
    PHONE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .find(|m| m.chars().filter(char::is_ascii_digit).count() >= 7)
        .map(str::to_string)
}

/// Collapse internal whitespace and trim.
pub fn clean(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trimmed, lowercased, whitespace-collapsed comparison key.
pub fn normalize_key(text: &str) -> String {
    clean(text).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_lines() {
        assert!(is_noise_line("Page 1 of 3"));
        assert!(is_noise_line("page 2 / 2"));
        assert!(is_noise_line("Contact"));
        assert!(is_noise_line("   "));
        assert!(!is_noise_line("Acme Corp"));
    }

    #[test]
    fn test_duration_and_employment() {
        assert!(is_duration_line("3 years 2 months"));
        assert!(is_duration_line("1 year"));
        assert!(is_duration_line("(8 months)"));
        assert!(!is_duration_line("January 2019 - Present (3 years)"));
        assert!(is_employment_type_line("Full-time"));
        assert!(!is_employment_type_line("Led the contract negotiation team for five years"));
        assert!(is_employment_type_line("Internship"));
        assert!(is_employment_type_line("full time"));
        assert!(is_employment_type_line("Full-time · Contract"));
    }

    #[test]
    fn test_employment_words_inside_titles() {
        assert!(!is_employment_type_line("Contract Manager"));
        assert!(!is_employment_type_line("Internship Coordinator"));
        assert!(!is_employment_type_line("Freelance Designer"));
        assert!(!is_employment_type_line("Summer internship"));
        assert!(!is_employment_type_line("Full-time · Engineer"));
        assert!(!is_employment_type_line(""));
    }

    #[test]
    fn test_bullets() {
        assert!(is_bullet_line("• Shipped v2"));
        assert!(is_bullet_line("- Shipped v2"));
        assert_eq!(strip_bullet("•  Shipped v2"), "Shipped v2");
        assert!(!is_bullet_line("Shipped v2"));
    }

    #[test]
    fn test_location_text() {
        assert!(is_location_text("Berlin, Germany"));
        assert!(is_location_text("San Francisco Bay Area"));
        assert!(is_location_text("Berlin, Berlin, Germany"));
        assert!(!is_location_text("Senior Engineer at Acme, Inc"));
        assert!(!is_location_text("jane@example.com"));
        assert!(!is_location_text("Go, Rust, Python, TypeScript, SQL"));
        assert!(!is_location_text("Senior Engineer"));
    }

    #[test]
    fn test_find_phone() {
        assert_eq!(find_phone("+49 170 1234567 (Mobile)").as_deref(), Some("+49 170 1234567"));
        assert_eq!(find_phone("555-1234").as_deref(), Some("555-1234"));
        assert!(find_phone("Class of 2019").is_none());
    }

    #[test]
    fn test_email_and_url() {
        assert_eq!(
            EMAIL.find("mail: jane.doe@example.com").map(|m| m.as_str()),
            Some("jane.doe@example.com")
        );
        assert_eq!(
            URL.find("www.linkedin.com/in/janedoe (LinkedIn)").map(|m| m.as_str()),
            Some("www.linkedin.com/in/janedoe")
        );
    }
}
