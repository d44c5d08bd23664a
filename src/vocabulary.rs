//! Vocabulary Store - Read-Only Anatomy Data
//!
//! Loaded once, validated, then shared immutably by the filters and the enhancer.

use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::validation::{Validator, ViolationSeverity};

/// The vocabulary compiled into the crate.
pub const BUNDLED_VOCABULARY: &str = include_str!("../data/anatomical_terms.json");

pub const MEDICAL_ILLUSTRATION: &str = "medical_illustration";
pub const CROSS_SECTION: &str = "cross_section";
pub const SYSTEM_OVERVIEW: &str = "system_overview";
pub const EDUCATIONAL_CONTEXT: &str = "educational_context";

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("Vocabulary not found: {}", path.display())]
    NotFound { path: PathBuf, source: io::Error },

    #[error("Failed to read vocabulary {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("Malformed vocabulary: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Forbidden term pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid vocabulary: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodySystem {
    pub organs: Vec<String>,
    pub structures: Vec<String>,
    pub keywords: Vec<String>,
    pub description: String,
}

impl BodySystem {
    /// Organs followed by structures: the terms the enhancer can detect.
    pub fn terms(&self) -> impl Iterator<Item = &String> {
        self.organs.iter().chain(self.structures.iter())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusTemplate {
    pub style_prefix: String,
    pub context: String,
    pub style_modifiers: Vec<String>,
    pub view_modifiers: Vec<String>,
    pub optimization_tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    #[serde(deserialize_with = "unique_keys")]
    pub body_systems: IndexMap<String, BodySystem>,
    pub forbidden_terms: Vec<String>,
    #[serde(deserialize_with = "unique_keys")]
    pub enhancement_templates: IndexMap<String, String>,
    #[serde(deserialize_with = "unique_keys")]
    pub focus_templates: IndexMap<String, FocusTemplate>,
    pub style_modifiers: Vec<String>,
    pub view_modifiers: Vec<String>,
    #[serde(rename = "3d_optimization_tags")]
    pub optimization_tags: Vec<String>,
    pub negative_prompt_additions: Vec<String>,
    #[serde(default)]
    pub focus_negative_prompts: IndexMap<String, Vec<String>>,
}

/// Ordered map that rejects repeated keys instead of keeping the last one.
fn unique_keys<'de, D, V>(deserializer: D) -> Result<IndexMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct UniqueKeys<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueKeys<V> {
        type Value = IndexMap<String, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map with unique keys")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry::<String, V>()? {
                if map.contains_key(&key) {
                    return Err(de::Error::custom(format!("duplicate key '{key}'")));
                }
                map.insert(key, value);
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(UniqueKeys(PhantomData))
}

impl Vocabulary {
    /// Parse and validate the bundled vocabulary.
    pub fn bundled() -> Result<Self, VocabularyError> {
        Self::from_json_str(BUNDLED_VOCABULARY)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, VocabularyError> {
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                VocabularyError::NotFound { path: path.to_path_buf(), source }
            } else {
                VocabularyError::Io { path: path.to_path_buf(), source }
            }
        })?;
        let vocabulary = Self::from_json_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            systems = vocabulary.body_systems.len(),
            "vocabulary loaded"
        );
        Ok(vocabulary)
    }

    pub fn from_json_str(content: &str) -> Result<Self, VocabularyError> {
        let vocabulary: Vocabulary = serde_json::from_str(content)?;
        vocabulary.validated()
    }

    /// Run the load-time rules. Warnings are logged, errors reject the vocabulary.
    pub fn validated(self) -> Result<Self, VocabularyError> {
        let report = Validator::new().validate(&self);

        for violation in report.violations.iter() {
            if violation.severity != ViolationSeverity::Error {
                tracing::warn!(rule = %violation.rule, "{}", violation.message);
            }
        }

        if report.valid {
            Ok(self)
        } else {
            Err(VocabularyError::Invalid(
                report
                    .violations
                    .iter()
                    .filter(|v| v.severity == ViolationSeverity::Error)
                    .map(|v| format!("{}: {}", v.rule, v.message))
                    .collect(),
            ))
        }
    }

    pub fn template(&self, key: &str) -> Option<&str> {
        self.enhancement_templates.get(key).map(String::as_str)
    }

    pub fn get_system(&self, name: &str) -> Option<&BodySystem> {
        self.body_systems.get(name)
    }

    pub fn system_names(&self) -> Vec<&str> {
        self.body_systems.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bundled_vocabulary_loads() {
        let vocabulary = Vocabulary::bundled().unwrap();
        assert!(vocabulary.get_system("circulatory").is_some());
        assert!(vocabulary.template(MEDICAL_ILLUSTRATION).is_some());
        assert!(vocabulary.optimization_tags.len() >= 3);
    }

    #[test]
    fn test_body_systems_keep_document_order() {
        let vocabulary = Vocabulary::bundled().unwrap();
        assert_eq!(vocabulary.system_names()[0], "circulatory");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Vocabulary::load_from_path(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, VocabularyError::NotFound { .. }));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BUNDLED_VOCABULARY.as_bytes()).unwrap();
        let vocabulary = Vocabulary::load_from_path(file.path()).unwrap();
        assert!(vocabulary.get_system("nervous").is_some());
    }

    #[test]
    fn test_missing_key_is_parse_error() {
        let err = Vocabulary::from_json_str(r#"{"body_systems": {}}"#).unwrap_err();
        assert!(matches!(err, VocabularyError::Parse(_)));
    }

    #[test]
    fn test_duplicate_system_is_rejected() {
        let duplicated = BUNDLED_VOCABULARY.replacen(
            r#""body_systems": {"#,
            r#""body_systems": {
    "nervous": {"organs": ["brain"], "structures": [], "keywords": [], "description": "signals"},"#,
            1,
        );
        let err = Vocabulary::from_json_str(&duplicated).unwrap_err();
        assert!(matches!(err, VocabularyError::Parse(_)));
        assert!(err.to_string().contains("duplicate key 'nervous'"));
    }

    #[test]
    fn test_malformed_json() {
        let err = Vocabulary::from_json_str("{ not json").unwrap_err();
        assert!(err.to_string().contains("Malformed vocabulary"));
    }

    #[test]
    fn test_too_few_optimization_tags_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(BUNDLED_VOCABULARY).unwrap();
        value["3d_optimization_tags"] = serde_json::json!(["sharp focus", "even lighting"]);
        let err = Vocabulary::from_json_str(&value.to_string()).unwrap_err();
        match err {
            VocabularyError::Invalid(messages) => {
                assert!(messages.iter().any(|m| m.starts_with("modifier_pools")));
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_terms_are_organs_then_structures() {
        let system = BodySystem {
            organs: vec!["heart".into()],
            structures: vec!["aorta".into()],
            keywords: vec!["pulse".into()],
            description: "moves blood".into(),
        };
        let terms: Vec<_> = system.terms().collect();
        assert_eq!(terms, vec!["heart", "aorta"]);
    }
}
