// ==========================================
// Cadet Roster - Data cleaner
// ==========================================
// Responsibility: TRIM / NULL normalization, name splitting,
// point parsing
// ==========================================

use crate::domain::NameParts;

/// Surname particles that belong to the last name ("Dela Cruz", "de los Santos").
const SURNAME_PARTICLES: &[&str] = &[
    "de", "dela", "del", "delos", "los", "la", "las", "san", "santa", "sta", "van", "von", "da",
    "di", "du", "le",
];

/// Generational suffixes, compared without the trailing dot.
const NAME_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv", "v"];

pub struct DataCleaner;

impl DataCleaner {
    /// Trims; empty becomes None.
    pub fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Collapses inner whitespace runs.
    pub fn clean_text(&self, value: &str) -> String {
        value.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn is_particle(&self, token: &str) -> bool {
        let t = token.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        SURNAME_PARTICLES.contains(&t.as_str())
    }

    /// Canonical suffix spelling ("jr." → "Jr", "iii" → "III").
    pub fn normalize_suffix(&self, token: &str) -> Option<String> {
        let t = token
            .trim()
            .trim_end_matches(['.', ','])
            .to_lowercase();
        if !NAME_SUFFIXES.contains(&t.as_str()) {
            return None;
        }
        Some(match t.as_str() {
            "jr" => "Jr".to_string(),
            "sr" => "Sr".to_string(),
            roman => roman.to_uppercase(),
        })
    }

    /// Splits a full name into parts.
    ///
    /// Accepts "First [Middle…] Last [Suffix]" and "Last, First [Middle…] [Suffix]".
    /// Particles before the final token attach to the last name.
    /// Returns None unless both first and last name are present.
    pub fn split_full_name(&self, full_name: &str) -> Option<NameParts> {
        let cleaned = self.clean_text(full_name);
        if cleaned.is_empty() {
            return None;
        }

        if let Some((last, rest)) = cleaned.split_once(',') {
            return self.split_comma_form(last, rest);
        }

        let mut tokens: Vec<&str> = cleaned.split(' ').collect();
        // "Juan V" keeps V as the last name
        let suffix = self.take_suffix(&mut tokens, 2);
        if tokens.len() < 2 {
            return None;
        }

        let mut last_start = tokens.len() - 1;
        while last_start > 1 && self.is_particle(tokens[last_start - 1]) {
            last_start -= 1;
        }

        Some(NameParts {
            first_name: tokens[0].to_string(),
            middle_name: join_non_empty(&tokens[1..last_start]),
            last_name: tokens[last_start..].join(" "),
            suffix,
        })
    }

    fn split_comma_form(&self, last: &str, rest: &str) -> Option<NameParts> {
        let last_name = last.trim();
        let rest = rest.replace(',', " ");
        let mut tokens: Vec<&str> = rest.split_whitespace().collect();
        let suffix = self.take_suffix(&mut tokens, 1);
        if last_name.is_empty() || tokens.is_empty() {
            return None;
        }
        Some(NameParts {
            first_name: tokens[0].to_string(),
            middle_name: join_non_empty(&tokens[1..]),
            last_name: last_name.to_string(),
            suffix,
        })
    }

    /// Pops a trailing suffix if at least `min_remaining` tokens are left.
    fn take_suffix(&self, tokens: &mut Vec<&str>, min_remaining: usize) -> Option<String> {
        if tokens.len() <= min_remaining {
            return None;
        }
        let suffix = self.normalize_suffix(tokens.last()?)?;
        tokens.pop();
        Some(suffix)
    }

    /// Positive integer points; accepts "5", "+5", "5.0". Zero and negatives are rejected.
    pub fn parse_points(&self, value: &str) -> Option<u32> {
        let t = value.trim().trim_start_matches('+');
        if let Ok(n) = t.parse::<u32>() {
            return (n > 0).then_some(n);
        }
        let f = t.parse::<f64>().ok()?;
        (f.fract() == 0.0 && f >= 1.0 && f <= f64::from(u32::MAX)).then_some(f as u32)
    }

    /// Enumeration prefixes such as "1." or "12)" at the start of list lines.
    pub fn is_list_marker(&self, token: &str) -> bool {
        token
            .strip_suffix('.')
            .or_else(|| token.strip_suffix(')'))
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    }
}

fn join_non_empty(tokens: &[&str]) -> Option<String> {
    let joined = tokens.join(" ");
    let joined = joined.trim();
    if joined.is_empty() {
        None
    } else {
        Some(joined.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_markers() {
        let c = DataCleaner;
        assert!(c.is_list_marker("1."));
        assert!(c.is_list_marker("12)"));
        assert!(!c.is_list_marker("3"));
        assert!(!c.is_list_marker("."));
        assert!(!c.is_list_marker("M."));
    }

    #[test]
    fn test_split_with_particles() {
        let name = DataCleaner.split_full_name("Juan Dela Cruz").unwrap();
        assert_eq!(name.first_name, "Juan");
        assert_eq!(name.last_name, "Dela Cruz");
        assert_eq!(name.middle_name, None);

        let name = DataCleaner.split_full_name("Maria Clara de los Santos").unwrap();
        assert_eq!(name.first_name, "Maria");
        assert_eq!(name.middle_name.as_deref(), Some("Clara"));
        assert_eq!(name.last_name, "de los Santos");
    }

    #[test]
    fn test_split_suffix_and_middle() {
        let name = DataCleaner
            .split_full_name("Juan Carlos M. Dela Cruz Jr.")
            .unwrap();
        assert_eq!(name.first_name, "Juan");
        assert_eq!(name.middle_name.as_deref(), Some("Carlos M."));
        assert_eq!(name.last_name, "Dela Cruz");
        assert_eq!(name.suffix.as_deref(), Some("Jr"));
    }

    #[test]
    fn test_split_comma_form() {
        let name = DataCleaner.split_full_name("Reyes, Ana B.").unwrap();
        assert_eq!(name.first_name, "Ana");
        assert_eq!(name.last_name, "Reyes");
        assert_eq!(name.middle_name.as_deref(), Some("B."));

        let name = DataCleaner.split_full_name("Dela Cruz, Juan, III").unwrap();
        assert_eq!(name.last_name, "Dela Cruz");
        assert_eq!(name.suffix.as_deref(), Some("III"));
    }

    #[test]
    fn test_single_token_is_not_a_name() {
        assert!(DataCleaner.split_full_name("Juan").is_none());
        assert!(DataCleaner.split_full_name("  ").is_none());
        assert!(DataCleaner.split_full_name("Reyes,").is_none());
    }

    #[test]
    fn test_parse_points() {
        assert_eq!(DataCleaner.parse_points("5"), Some(5));
        assert_eq!(DataCleaner.parse_points("+3"), Some(3));
        assert_eq!(DataCleaner.parse_points("2.0"), Some(2));
        assert_eq!(DataCleaner.parse_points("0"), None);
        assert_eq!(DataCleaner.parse_points("-4"), None);
        assert_eq!(DataCleaner.parse_points("1.5"), None);
    }
}
