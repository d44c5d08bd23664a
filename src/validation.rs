//! Vocabulary Validation - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! Any error-severity violation rejects the vocabulary at load time.

use serde::{Deserialize, Serialize};

use crate::safety::whole_word;
use crate::templates::check_placeholders;
use crate::vocabulary::{
    Vocabulary, CROSS_SECTION, EDUCATIONAL_CONTEXT, MEDICAL_ILLUSTRATION, SYSTEM_OVERVIEW,
};

/// Default-path optimization tags are sampled without clamping.
pub const DEFAULT_OPTIMIZATION_SAMPLE: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub remediation: Vec<String>,
}

impl ValidationViolation {
    fn new(rule: &str, severity: ViolationSeverity, message: String, remediation: &str) -> Self {
        Self {
            rule: rule.to_string(),
            severity,
            message,
            remediation: vec![remediation.to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Warning)
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, vocabulary: &Vocabulary) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct RequiredTemplatesRule;

impl ValidationRule for RequiredTemplatesRule {
    fn name(&self) -> &'static str { "required_templates" }

    fn validate(&self, vocabulary: &Vocabulary) -> Vec<ValidationViolation> {
        let required: [(&str, &[&str]); 4] = [
            (MEDICAL_ILLUSTRATION, &["organ"]),
            (CROSS_SECTION, &["organ"]),
            (SYSTEM_OVERVIEW, &["system"]),
            (EDUCATIONAL_CONTEXT, &[]),
        ];

        let mut violations = vec![];
        for (key, allowed) in required {
            match vocabulary.template(key) {
                None => violations.push(ValidationViolation::new(
                    self.name(),
                    ViolationSeverity::Error,
                    format!("Missing enhancement template '{}'", key),
                    "Add the template to enhancement_templates",
                )),
                Some(template) => {
                    if let Err(e) = check_placeholders(template, allowed) {
                        violations.push(ValidationViolation::new(
                            self.name(),
                            ViolationSeverity::Error,
                            format!("Template '{}' is not renderable: {}", key, e),
                            "Use only the documented placeholders",
                        ));
                    }
                }
            }
        }
        violations
    }
}

pub struct FocusTemplatesRule;

impl ValidationRule for FocusTemplatesRule {
    fn name(&self) -> &'static str { "focus_templates" }

    fn validate(&self, vocabulary: &Vocabulary) -> Vec<ValidationViolation> {
        let mut violations = vec![];

        for (focus, config) in &vocabulary.focus_templates {
            if let Err(e) = check_placeholders(&config.style_prefix, &["organ"]) {
                violations.push(ValidationViolation::new(
                    self.name(),
                    ViolationSeverity::Error,
                    format!("Focus '{}' style_prefix is not renderable: {}", focus, e),
                    "Use only the {organ} placeholder",
                ));
            }
            if config.view_modifiers.is_empty() {
                violations.push(ValidationViolation::new(
                    self.name(),
                    ViolationSeverity::Error,
                    format!("Focus '{}' has no view_modifiers", focus),
                    "Provide at least one view modifier",
                ));
            }
            if config.style_modifiers.is_empty() || config.optimization_tags.is_empty() {
                violations.push(ValidationViolation::new(
                    self.name(),
                    ViolationSeverity::Warning,
                    format!("Focus '{}' has an empty modifier or tag list", focus),
                    "Prompts for this focus will carry fewer style hints",
                ));
            }
        }

        for focus in vocabulary.focus_negative_prompts.keys() {
            if !vocabulary.focus_templates.contains_key(focus) {
                violations.push(ValidationViolation::new(
                    self.name(),
                    ViolationSeverity::Info,
                    format!("Negative prompts defined for unknown focus '{}'", focus),
                    "Add a matching focus template",
                ));
            }
        }

        violations
    }
}

pub struct ModifierPoolsRule;

impl ValidationRule for ModifierPoolsRule {
    fn name(&self) -> &'static str { "modifier_pools" }

    fn validate(&self, vocabulary: &Vocabulary) -> Vec<ValidationViolation> {
        let mut violations = vec![];

        if vocabulary.view_modifiers.is_empty() {
            violations.push(ValidationViolation::new(
                self.name(),
                ViolationSeverity::Error,
                "view_modifiers is empty".to_string(),
                "Provide at least one view modifier",
            ));
        }
        if vocabulary.optimization_tags.len() < DEFAULT_OPTIMIZATION_SAMPLE {
            violations.push(ValidationViolation::new(
                self.name(),
                ViolationSeverity::Error,
                format!(
                    "3d_optimization_tags has {} entries, {} required",
                    vocabulary.optimization_tags.len(),
                    DEFAULT_OPTIMIZATION_SAMPLE
                ),
                "Add more optimization tags",
            ));
        }
        if vocabulary.style_modifiers.is_empty() {
            violations.push(ValidationViolation::new(
                self.name(),
                ViolationSeverity::Warning,
                "style_modifiers is empty".to_string(),
                "Default prompts will carry no style hints",
            ));
        }

        violations
    }
}

pub struct BodySystemsRule;

impl ValidationRule for BodySystemsRule {
    fn name(&self) -> &'static str { "body_systems" }

    fn validate(&self, vocabulary: &Vocabulary) -> Vec<ValidationViolation> {
        let mut violations = vec![];

        if vocabulary.body_systems.is_empty() {
            violations.push(ValidationViolation::new(
                self.name(),
                ViolationSeverity::Error,
                "No body systems defined".to_string(),
                "Add at least one body system",
            ));
        }

        let forbidden: Vec<_> = vocabulary
            .forbidden_terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .filter_map(|t| whole_word(&t).ok())
            .collect();

        for (name, system) in &vocabulary.body_systems {
            if name.trim().is_empty() {
                violations.push(ValidationViolation::new(
                    self.name(),
                    ViolationSeverity::Error,
                    "Body system with an empty name".to_string(),
                    "Name every body system",
                ));
            }

            let has_blank = system
                .terms()
                .chain(system.keywords.iter())
                .any(|term| term.trim().is_empty());
            if has_blank {
                violations.push(ValidationViolation::new(
                    self.name(),
                    ViolationSeverity::Error,
                    format!("System '{}' contains an empty organ, structure or keyword", name),
                    "Remove empty entries",
                ));
            }

            for term in system.terms() {
                if forbidden.iter().any(|re| re.is_match(term)) {
                    violations.push(ValidationViolation::new(
                        self.name(),
                        ViolationSeverity::Warning,
                        format!("Term '{}' in '{}' contains a forbidden word", term, name),
                        "The safety filter removes it before detection",
                    ));
                }
            }
        }

        violations
    }
}

/// Validator runs every rule and applies the blocking policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredTemplatesRule),
                Box::new(FocusTemplatesRule),
                Box::new(ModifierPoolsRule),
                Box::new(BodySystemsRule),
            ],
        }
    }

    pub fn validate(&self, vocabulary: &Vocabulary) -> ValidationResult {
        let violations: Vec<_> = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(vocabulary))
            .collect();

        ValidationResult {
            valid: !violations.iter().any(|v| v.severity == ViolationSeverity::Error),
            violations,
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::BUNDLED_VOCABULARY;

    fn raw_vocabulary() -> Vocabulary {
        serde_json::from_str(BUNDLED_VOCABULARY).unwrap()
    }

    #[test]
    fn test_bundled_vocabulary_has_no_errors() {
        let result = Validator::new().validate(&raw_vocabulary());
        assert!(result.valid);
        assert!(!result.has_errors());
    }

    #[test]
    fn test_missing_template_is_error() {
        let mut vocabulary = raw_vocabulary();
        vocabulary.enhancement_templates.shift_remove(CROSS_SECTION);
        let result = Validator::new().validate(&vocabulary);
        assert!(!result.valid);
        assert!(result.violations.iter().any(|v| v.rule == "required_templates"));
    }

    #[test]
    fn test_wrong_placeholder_is_error() {
        let mut vocabulary = raw_vocabulary();
        vocabulary
            .enhancement_templates
            .insert(SYSTEM_OVERVIEW.to_string(), "overview of the {organ}".to_string());
        let result = Validator::new().validate(&vocabulary);
        assert!(!result.valid);
    }

    #[test]
    fn test_focus_without_view_modifiers_is_error() {
        let mut vocabulary = raw_vocabulary();
        if let Some(focus) = vocabulary.focus_templates.get_mut("education") {
            focus.view_modifiers.clear();
        }
        let result = Validator::new().validate(&vocabulary);
        assert!(result.violations.iter().any(|v| v.rule == "focus_templates"
            && v.severity == ViolationSeverity::Error));
    }

    #[test]
    fn test_shadowed_term_is_warning_only() {
        let mut vocabulary = raw_vocabulary();
        vocabulary.forbidden_terms.push("heart".to_string());
        let result = Validator::new().validate(&vocabulary);
        assert!(result.valid);
        assert!(result.has_warnings());
    }

    #[test]
    fn test_empty_organ_is_error() {
        let mut vocabulary = raw_vocabulary();
        if let Some(system) = vocabulary.body_systems.get_mut("nervous") {
            system.organs.push("  ".to_string());
        }
        let result = Validator::new().validate(&vocabulary);
        assert!(!result.valid);
    }
}
