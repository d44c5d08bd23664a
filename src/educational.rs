//! Educational Filter - Age Appropriateness
//!
//! Makes sure an assembled prompt reads as a simple anatomy diagram request
//! for elementary school students.

use regex::{NoExpand, Regex};
use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use crate::vocabulary::Vocabulary;

/// Marker phrase added to prompts without recognisable anatomy.
pub const GENERAL_ANATOMY_MARKER: &str = "human anatomy";

pub const ANATOMY_PREFIX: &str = "human anatomy educational diagram, ";
pub const EDUCATIONAL_SUFFIX: &str = ", educational illustration for elementary science";
pub const UNKNOWN_SYSTEM_DESCRIPTION: &str = "body system that helps keep us healthy";

pub const POSITIVE_INDICATORS: [&str; 10] = [
    "diagram", "illustration", "educational", "learning", "study",
    "science", "anatomy", "medical", "textbook", "simplified",
];

/// Reported only; nothing is rejected on these.
pub const NEGATIVE_INDICATORS: [&str; 5] =
    ["complex", "advanced", "professional", "clinical", "pathological"];

const SIMPLIFICATIONS: [(&str, &str); 6] = [
    ("anatomical structure", "body part"),
    ("physiological", "body function"),
    ("morphology", "shape"),
    ("pathophysiology", "how illness affects the body"),
    ("biomechanics", "how the body moves"),
    ("histology", "tissue study"),
];

static SIMPLIFICATION_REGEXES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    SIMPLIFICATIONS
        .iter()
        .map(|&(complex, simple)| {
            let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(complex)))
                .expect("static simplification pattern is valid");
            (re, simple)
        })
        .collect()
});

pub struct EducationalFilter {
    vocabulary: Arc<Vocabulary>,
    valid_terms: BTreeSet<String>,
}

impl EducationalFilter {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        let mut valid_terms = BTreeSet::from([GENERAL_ANATOMY_MARKER.to_string()]);
        for system in vocabulary.body_systems.values() {
            valid_terms.extend(system.organs.iter().map(|t| t.to_lowercase()));
            valid_terms.extend(system.keywords.iter().map(|t| t.to_lowercase()));
        }

        Self { vocabulary, valid_terms }
    }

    /// Simplify wording, then prefix anatomy and append educational context.
    /// Applying it twice gives the same result as applying it once.
    pub fn ensure_appropriate(&self, prompt: &str) -> String {
        // Checks run on the simplified text; a term hidden inside a replaced
        // word must not count.
        let mut result = simplify_language(prompt);

        if !self.contains_valid_anatomy(&result) {
            tracing::warn!("Prompt lacks valid anatomical content");
            result = format!("{ANATOMY_PREFIX}{result}");
        }

        if !self.has_educational_context(&result) {
            tracing::info!("Adding educational context to prompt");
            result.push_str(EDUCATIONAL_SUFFIX);
        }

        result
    }

    pub fn contains_valid_anatomy(&self, prompt: &str) -> bool {
        let lower = prompt.to_lowercase();
        self.valid_terms.iter().any(|term| lower.contains(term.as_str()))
    }

    pub fn has_educational_context(&self, prompt: &str) -> bool {
        let lower = prompt.to_lowercase();
        POSITIVE_INDICATORS.iter().any(|indicator| lower.contains(indicator))
    }

    /// Advanced-register words present in the prompt.
    pub fn advanced_indicators(&self, prompt: &str) -> Vec<&'static str> {
        let lower = prompt.to_lowercase();
        NEGATIVE_INDICATORS
            .iter()
            .copied()
            .filter(|indicator| lower.contains(indicator))
            .collect()
    }

    pub fn validate_system_focus(&self, prompt: &str, system_name: &str) -> bool {
        let Some(system) = self.vocabulary.get_system(system_name) else {
            return false;
        };

        let lower = prompt.to_lowercase();
        system
            .organs
            .iter()
            .chain(system.keywords.iter())
            .any(|term| lower.contains(&term.to_lowercase()))
    }

    pub fn get_age_appropriate_description(&self, system_name: &str) -> &str {
        self.vocabulary
            .get_system(system_name)
            .map(|system| system.description.as_str())
            .unwrap_or(UNKNOWN_SYSTEM_DESCRIPTION)
    }
}

fn simplify_language(prompt: &str) -> String {
    let mut result = prompt.to_string();
    for (re, simple) in SIMPLIFICATION_REGEXES.iter() {
        result = re.replace_all(&result, NoExpand(simple)).into_owned();
    }
    result
}
