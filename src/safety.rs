//! Safety Filter - K-6 Content Screening
//!
//! Forbidden terms are deleted, advanced medical vocabulary is softened,
//! and NSFW patterns are stripped. Unsafe input never produces an error:
//! the worst case is the fixed fallback prompt.

use regex::{NoExpand, Regex};
use std::sync::LazyLock;

/// Returned when nothing survives filtering.
pub const SAFE_FALLBACK: &str = "human anatomy educational diagram";

pub const NSFW_PATTERNS: [&str; 4] = [
    r"\b(nude?|naked|undressed)\b",
    r"\b(sexual?|erotic|arousal)\b",
    r"\b(genital|penis|vagina|breast)\b",
    r"\b(reproductive|fertility|conception)\b",
];

/// Advanced or graphic medical terms and their K-6 replacements.
pub const ADVANCED_MEDICAL: [(&str, &str); 8] = [
    ("dissection", "diagram"),
    ("autopsy", "study"),
    ("cadaver", "model"),
    ("surgical", "medical"),
    ("pathology", "health study"),
    ("trauma", "injury study"),
    ("blood", "circulation"),
    ("gore", "anatomy"),
];

static NSFW_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    NSFW_PATTERNS
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).expect("static NSFW pattern is valid"))
        .collect()
});

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Case-insensitive whole-word matcher for a literal term.
///
/// `\b` only applies on a side that starts or ends with a word character,
/// so terms like "18+" still match.
pub(crate) fn whole_word(term: &str) -> Result<Regex, regex::Error> {
    let start = if term.starts_with(is_word_char) { r"\b" } else { "" };
    let end = if term.ends_with(is_word_char) { r"\b" } else { "" };
    Regex::new(&format!("(?i){start}{}{end}", regex::escape(term)))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn remove_nsfw(text: &str) -> String {
    let mut out = text.to_string();
    for (pattern, re) in NSFW_PATTERNS.iter().zip(NSFW_REGEXES.iter()) {
        if re.is_match(&out) {
            tracing::warn!(pattern = %pattern, "Blocked NSFW content");
            out = re.replace_all(&out, "").into_owned();
        }
    }
    out
}

struct ForbiddenTerm {
    term: String,
    pattern: Regex,
}

struct Substitution {
    term: &'static str,
    replacement: &'static str,
    pattern: Regex,
}

pub struct SafetyFilter {
    forbidden: Vec<ForbiddenTerm>,
    substitutions: Vec<Substitution>,
}

impl SafetyFilter {
    /// Build from the vocabulary's forbidden terms.
    ///
    /// A term that is both forbidden and in [`ADVANCED_MEDICAL`] is only ever
    /// deleted; its substitution is dropped for this filter.
    pub fn new<S: AsRef<str>>(forbidden_terms: &[S]) -> Result<Self, regex::Error> {
        let mut terms: Vec<String> = forbidden_terms
            .iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        // Longest first, so phrases go before the single words inside them.
        terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        terms.dedup();

        let forbidden = terms
            .into_iter()
            .map(|term| Ok(ForbiddenTerm { pattern: whole_word(&term)?, term }))
            .collect::<Result<Vec<_>, regex::Error>>()?;

        let substitutions = ADVANCED_MEDICAL
            .iter()
            .filter(|(term, _)| !forbidden.iter().any(|f| f.term == *term))
            .map(|&(term, replacement)| {
                Ok(Substitution { term, replacement, pattern: whole_word(term)? })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { forbidden, substitutions })
    }

    pub fn forbidden_terms(&self) -> impl Iterator<Item = &str> {
        self.forbidden.iter().map(|f| f.term.as_str())
    }

    /// Clean a raw prompt. The result is lower-case, never empty, and holds no
    /// forbidden whole word or NSFW match.
    pub fn clean(&self, raw: &str) -> String {
        let mut cleaned = self.remove_forbidden(&raw.trim().to_lowercase());

        for sub in &self.substitutions {
            if sub.pattern.is_match(&cleaned) {
                tracing::debug!(term = sub.term, replacement = sub.replacement, "Simplified advanced term");
                cleaned = sub.pattern.replace_all(&cleaned, NoExpand(sub.replacement)).into_owned();
            }
        }

        cleaned = collapse_whitespace(&remove_nsfw(&cleaned));

        // Deleting words can bring new phrases together.
        loop {
            let next = collapse_whitespace(&remove_nsfw(&self.remove_forbidden(&cleaned)));
            if next == cleaned {
                break;
            }
            cleaned = next;
        }

        if cleaned.is_empty() {
            tracing::info!("Prompt completely filtered, using safe fallback");
            return SAFE_FALLBACK.to_string();
        }

        cleaned
    }

    /// True iff no forbidden term occurs anywhere and no NSFW pattern matches.
    pub fn is_safe(&self, text: &str) -> bool {
        let lower = text.to_lowercase();

        if self.forbidden.iter().any(|f| lower.contains(&f.term)) {
            return false;
        }

        !NSFW_REGEXES.iter().any(|re| re.is_match(&lower))
    }

    fn remove_forbidden(&self, text: &str) -> String {
        let mut out = text.to_string();
        for f in &self.forbidden {
            if f.pattern.is_match(&out) {
                tracing::warn!(term = %f.term, "Blocked forbidden term");
                out = f.pattern.replace_all(&out, "").into_owned();
            }
        }
        out
    }
}
