//! Value normalizer.
//!
//! Handles:
//! - Gender synonyms (M/F/1/0/U → Male/Female/Unknown)
//! - Diagnosis code canonical form (upper case, dotted)
//! - Title casing of names and places
//! - Zip code truncation

use std::collections::HashMap;

use crate::models::Gender;

/// Normalizer for free-text source values.
pub struct Normalizer {
    /// Upper-cased source token → gender
    genders: HashMap<&'static str, Gender>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            genders: Self::default_genders(),
        }
    }

    /// Standardize a gender token. Blank is `Unknown`; unrecognised
    /// tokens are `None`.
    pub fn gender(&self, value: Option<&str>) -> Option<Gender> {
        match value {
            None => Some(Gender::Unknown),
            Some(v) => self.genders.get(v.trim().to_uppercase().as_str()).copied(),
        }
    }

    /// Canonical ICD-10 style code: upper case, only alphanumerics and
    /// dots, with a dot after the category when none was given.
    /// Returns `None` when nothing is left after cleaning.
    pub fn diagnosis_code(&self, code: &str) -> Option<String> {
        let mut canonical: String = code
            .trim()
            .to_uppercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
            .collect();

        let starts_alpha = canonical
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_alphabetic());
        if starts_alpha && !canonical.contains('.') && canonical.len() > 3 {
            canonical.insert(3, '.');
        }

        if canonical.is_empty() {
            None
        } else {
            Some(canonical)
        }
    }

    /// "st. mary's GENERAL" → "St. Mary'S General". A letter is upper
    /// cased when the previous character is not a letter.
    pub fn title_case(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        let mut previous_alpha = false;
        for c in value.trim().chars() {
            if c.is_alphabetic() {
                if previous_alpha {
                    out.extend(c.to_lowercase());
                } else {
                    out.extend(c.to_uppercase());
                }
                previous_alpha = true;
            } else {
                out.push(c);
                previous_alpha = false;
            }
        }
        out
    }

    /// First five characters of a zip code ("02139-4307" → "02139").
    pub fn zip_code(&self, value: &str) -> String {
        value.trim().chars().take(5).collect()
    }

    /// Trimmed and upper-cased, for codes such as procedure codes and states.
    pub fn upper(&self, value: &str) -> String {
        value.trim().to_uppercase()
    }

    fn default_genders() -> HashMap<&'static str, Gender> {
        let mut map = HashMap::new();
        for token in ["M", "MALE", "1"] {
            map.insert(token, Gender::Male);
        }
        for token in ["F", "FEMALE", "0"] {
            map.insert(token, Gender::Female);
        }
        for token in ["U", "UNKNOWN"] {
            map.insert(token, Gender::Unknown);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_synonyms() {
        let n = Normalizer::new();
        assert_eq!(n.gender(Some("m")), Some(Gender::Male));
        assert_eq!(n.gender(Some("Female")), Some(Gender::Female));
        assert_eq!(n.gender(Some("1")), Some(Gender::Male));
        assert_eq!(n.gender(Some("0")), Some(Gender::Female));
        assert_eq!(n.gender(Some("u")), Some(Gender::Unknown));
        assert_eq!(n.gender(None), Some(Gender::Unknown));
        assert_eq!(n.gender(Some("X")), None);
    }

    #[test]
    fn test_diagnosis_code_canonical() {
        let n = Normalizer::new();
        assert_eq!(n.diagnosis_code("e119").as_deref(), Some("E11.9"));
        assert_eq!(n.diagnosis_code(" I25.10 ").as_deref(), Some("I25.10"));
        assert_eq!(n.diagnosis_code("i2510").as_deref(), Some("I25.10"));
        assert_eq!(n.diagnosis_code("J45").as_deref(), Some("J45"));
        assert_eq!(n.diagnosis_code("E11-9").as_deref(), Some("E11.9"));
        assert_eq!(n.diagnosis_code("--"), None);
    }

    #[test]
    fn test_title_case() {
        let n = Normalizer::new();
        assert_eq!(n.title_case("massachusetts GENERAL hospital"), "Massachusetts General Hospital");
        assert_eq!(n.title_case("  new york "), "New York");
        assert_eq!(n.title_case("winston-salem"), "Winston-Salem");
    }

    #[test]
    fn test_zip_truncated() {
        let n = Normalizer::new();
        assert_eq!(n.zip_code("02139-4307"), "02139");
        assert_eq!(n.zip_code("123"), "123");
    }
}
