//! # Symptom Matching
//!
//! Maps a free-text symptom description onto medical specialties and ranks a
//! doctor roster against it.
//!
//! ## Scoring
//! - Lower-case the text
//! - Every keyword contained in the text (plain substring, no word boundaries) adds 1
//!   to each specialty it maps to
//! - A keyword counts once no matter how often it appears
//!
//! ## Ranking
//! - Each doctor gets the score of their specialization, 0 if unscored
//! - Stable sort, highest score first, then keep the first 5
//! - If none of those 5 scored, return the first 3 as general suggestions
//! - Otherwise return only the scored ones
use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::doctors::{DoctorRecord, Recommendation, Recommendations};

pub const TOP_MATCHES: usize = 5;
pub const GENERAL_FALLBACK: usize = 3;

pub const MATCHED_MESSAGE: &str = "Based on your symptoms, we recommend these doctors:";
pub const GENERAL_MESSAGE: &str = "Here are some available doctors. For better recommendations, please describe your symptoms in more detail.";

const BUILTIN_KEYWORDS: &[(&str, &[&str])] = &[
    ("heart", &["Cardiology", "Internal Medicine"]),
    ("chest", &["Cardiology", "Pulmonology"]),
    ("pain", &["Cardiology", "Orthopedics", "Neurology"]),
    ("breathing", &["Pulmonology", "Cardiology"]),
    ("cough", &["Pulmonology", "Internal Medicine"]),
    ("fever", &["Internal Medicine", "Infectious Disease"]),
    ("headache", &["Neurology", "Internal Medicine"]),
    ("migraine", &["Neurology"]),
    ("back", &["Orthopedics", "Neurology"]),
    ("joint", &["Orthopedics", "Rheumatology"]),
    ("skin", &["Dermatology"]),
    ("rash", &["Dermatology", "Allergology"]),
    ("stomach", &["Gastroenterology", "Internal Medicine"]),
    ("abdominal", &["Gastroenterology", "Surgery"]),
    ("digestive", &["Gastroenterology"]),
    ("child", &["Pediatrics"]),
    ("baby", &["Pediatrics"]),
    ("pregnancy", &["Obstetrics", "Gynecology"]),
    ("mental", &["Psychiatry", "Psychology"]),
    ("anxiety", &["Psychiatry", "Psychology"]),
    ("depression", &["Psychiatry", "Psychology"]),
    ("eye", &["Ophthalmology"]),
    ("vision", &["Ophthalmology"]),
    ("ear", &["Otolaryngology", "ENT"]),
    ("throat", &["Otolaryngology", "ENT"]),
    ("nose", &["Otolaryngology", "ENT"]),
    ("allergy", &["Allergology", "Immunology"]),
    ("diabetes", &["Endocrinology", "Internal Medicine"]),
    ("thyroid", &["Endocrinology"]),
    ("kidney", &["Nephrology", "Urology"]),
    ("urinary", &["Urology", "Nephrology"]),
    ("blood", &["Hematology", "Internal Medicine"]),
    ("cancer", &["Oncology"]),
];

static BUILTIN: Lazy<KeywordTable> = Lazy::new(|| KeywordTable {
    entries: BUILTIN_KEYWORDS
        .iter()
        .map(|(keyword, specialties)| {
            (
                keyword.to_string(),
                specialties.iter().map(|s| s.to_string()).collect(),
            )
        })
        .collect(),
});

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TableError {
    #[error("Duplicate keyword: {0}")]
    DuplicateKeyword(String),

    #[error("Keyword {0} has no specialties")]
    EmptySpecialties(String),
}

/// Keyword to specialty mapping. Keys are lower-case and unique, and every key
/// maps to at least one specialty.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    entries: Vec<(String, Vec<String>)>,
}

impl KeywordTable {
    pub fn new<I, K, S>(entries: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (K, Vec<S>)>,
        K: Into<String>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut table = Vec::new();

        for (keyword, specialties) in entries {
            let keyword = keyword.into().to_lowercase();

            if specialties.is_empty() {
                return Err(TableError::EmptySpecialties(keyword));
            }
            if !seen.insert(keyword.clone()) {
                return Err(TableError::DuplicateKeyword(keyword));
            }

            table.push((keyword, specialties.into_iter().map(Into::into).collect()));
        }

        Ok(Self { entries: table })
    }

    /// The compiled-in table, built on first use.
    pub fn builtin() -> &'static KeywordTable {
        &BUILTIN
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn specialties(&self, keyword: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(key, _)| key == keyword)
            .map(|(_, specialties)| specialties.as_slice())
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, specialties)| (key.as_str(), specialties.as_slice()))
    }
}

/// Per-request specialty scores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecialtyScores(HashMap<String, u32>);

impl SpecialtyScores {
    pub fn get(&self, specialty: &str) -> u32 {
        self.0.get(specialty).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn bump(&mut self, specialty: &str) {
        *self.0.entry(specialty.to_string()).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SymptomMatcher<'a> {
    table: &'a KeywordTable,
}

impl Default for SymptomMatcher<'static> {
    fn default() -> Self {
        Self::new(KeywordTable::builtin())
    }
}

impl<'a> SymptomMatcher<'a> {
    pub fn new(table: &'a KeywordTable) -> Self {
        Self { table }
    }

    /// Callers reject blank text before getting here.
    pub fn score(&self, symptoms: &str) -> SpecialtyScores {
        let lowered = symptoms.to_lowercase();
        let mut scores = SpecialtyScores::default();

        for (keyword, specialties) in self.table.iter() {
            if !lowered.contains(keyword) {
                continue;
            }

            for specialty in specialties {
                scores.bump(specialty);
            }
        }

        scores
    }

    pub fn recommend(&self, symptoms: &str, doctors: &[DoctorRecord]) -> Recommendations {
        let scores = self.score(symptoms);

        let mut ranked: Vec<Recommendation> = doctors
            .iter()
            .map(|doctor| Recommendation::for_doctor(doctor, scores.get(&doctor.specialization)))
            .collect();

        // sort_by is stable, equal scores keep roster order
        ranked.sort_by(|a, b| b.match_score.cmp(&a.match_score));
        ranked.truncate(TOP_MATCHES);

        if ranked.iter().all(|r| r.match_score == 0) {
            ranked.truncate(GENERAL_FALLBACK);

            return Recommendations {
                recommendations: ranked,
                message: GENERAL_MESSAGE.to_string(),
            };
        }

        ranked.retain(|r| r.match_score > 0);

        Recommendations {
            recommendations: ranked,
            message: MATCHED_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(id: &str, specialization: &str) -> DoctorRecord {
        DoctorRecord::new(id, format!("Dr {id}"), specialization)
    }

    fn ids(result: &Recommendations) -> Vec<&str> {
        result
            .recommendations
            .iter()
            .map(|r| r.id.as_str())
            .collect()
    }

    #[test]
    fn test_builtin_table() {
        let table = KeywordTable::builtin();

        assert_eq!(table.len(), 33);
        assert_eq!(
            table.specialties("pain").unwrap(),
            ["Cardiology", "Orthopedics", "Neurology"]
        );
        assert!(table.specialties("sneeze").is_none());
    }

    #[test]
    fn test_table_invariants() {
        assert_eq!(
            KeywordTable::new([("Fever", vec!["A"]), ("fever", vec!["B"])]).unwrap_err(),
            TableError::DuplicateKeyword("fever".into())
        );
        assert_eq!(
            KeywordTable::new([("itch", Vec::<String>::new())]).unwrap_err(),
            TableError::EmptySpecialties("itch".into())
        );
        assert!(KeywordTable::new([("itch", vec!["Dermatology"])]).is_ok());
    }

    #[test]
    fn test_score_chest_pain() {
        let scores =
            SymptomMatcher::default().score("I have chest pain and trouble breathing");

        assert_eq!(scores.get("Cardiology"), 3);
        assert_eq!(scores.get("Pulmonology"), 2);
        assert_eq!(scores.get("Orthopedics"), 1);
        assert_eq!(scores.get("Dermatology"), 0);
    }

    #[test]
    fn test_score_counts_presence_not_occurrences() {
        let matcher = SymptomMatcher::default();

        assert_eq!(matcher.score("fever").get("Internal Medicine"), 1);
        assert_eq!(matcher.score("fever fever fever").get("Internal Medicine"), 1);
    }

    #[test]
    fn test_score_is_case_insensitive_substring() {
        let matcher = SymptomMatcher::default();

        assert_eq!(matcher.score("HEADACHE").get("Neurology"), 1);
        // "spain" contains "pain", "hearing" contains "ear"
        assert_eq!(matcher.score("back from spain").get("Orthopedics"), 2);
        assert_eq!(matcher.score("hearing").get("ENT"), 1);
    }

    #[test]
    fn test_score_no_hits() {
        assert!(SymptomMatcher::default().score("just a checkup").is_empty());
    }

    #[test]
    fn test_recommend_chest_pain() {
        let roster = [doctor("1", "Cardiology"), doctor("2", "Dermatology")];
        let result = SymptomMatcher::default()
            .recommend("I have chest pain and trouble breathing", &roster);

        assert_eq!(result.message, MATCHED_MESSAGE);
        assert_eq!(ids(&result), ["1"]);
        assert_eq!(result.recommendations[0].match_score, 3);
        assert!(
            result.recommendations[0]
                .reason
                .contains("Specializes in Cardiology")
        );
    }

    #[test]
    fn test_recommend_general_fallback() {
        let roster = [
            doctor("a", "Cardiology"),
            doctor("b", "Dermatology"),
            doctor("c", "Neurology"),
            doctor("d", "Oncology"),
        ];
        let result = SymptomMatcher::default().recommend("just a checkup", &roster);

        assert_eq!(result.message, GENERAL_MESSAGE);
        assert_eq!(ids(&result), ["a", "b", "c"]);
        assert_eq!(
            result.recommendations[1].reason,
            "General practitioner in Dermatology"
        );
    }

    #[test]
    fn test_recommend_empty_roster() {
        let result = SymptomMatcher::default().recommend("chest pain", &[]);

        assert!(result.recommendations.is_empty());
        assert_eq!(result.message, GENERAL_MESSAGE);
    }

    #[test]
    fn test_recommend_ties_keep_roster_order() {
        let roster = [
            doctor("x", "Dermatology"),
            doctor("a", "Pediatrics"),
            doctor("b", "Pediatrics"),
        ];
        let result = SymptomMatcher::default().recommend("my baby", &roster);

        assert_eq!(ids(&result), ["a", "b"]);
    }

    #[test]
    fn test_recommend_ranks_full_roster_before_truncating() {
        let mut roster: Vec<DoctorRecord> = (0..6)
            .map(|i| doctor(&format!("g{i}"), "Dermatology"))
            .collect();
        roster.push(doctor("n", "Neurology"));
        roster.push(doctor("c", "Cardiology"));

        let result = SymptomMatcher::default().recommend("heart pain and a headache", &roster);

        // Cardiology 2, Neurology 2, nobody else scores
        assert_eq!(ids(&result), ["n", "c"]);
    }

    #[test]
    fn test_recommend_caps_at_five() {
        let roster: Vec<DoctorRecord> = (0..8)
            .map(|i| doctor(&i.to_string(), "Psychiatry"))
            .collect();
        let result = SymptomMatcher::default().recommend("anxiety", &roster);

        assert_eq!(ids(&result), ["0", "1", "2", "3", "4"]);
        assert_eq!(result.message, MATCHED_MESSAGE);
    }

    #[test]
    fn test_recommend_filters_unscored_from_top_five() {
        let roster = [
            doctor("1", "Dermatology"),
            doctor("2", "Oncology"),
            doctor("3", "Dermatology"),
        ];
        let result = SymptomMatcher::default().recommend("itchy skin", &roster);

        assert_eq!(ids(&result), ["1", "3"]);
    }

    #[test]
    fn test_recommend_is_repeatable() {
        let roster = [doctor("1", "Cardiology"), doctor("2", "Pulmonology")];
        let matcher = SymptomMatcher::default();

        assert_eq!(
            matcher.recommend("cough and chest", &roster),
            matcher.recommend("cough and chest", &roster)
        );
    }

    #[test]
    fn test_custom_table() {
        let table = KeywordTable::new([("itch", vec!["Dermatology", "Allergology"])]).unwrap();
        let matcher = SymptomMatcher::new(&table);

        assert_eq!(matcher.score("Itching all day").get("Allergology"), 1);
        assert!(matcher.score("chest pain").is_empty());
    }
}
