//! Enhancement Engine - Single Entry Point
//!
//! raw prompt -> safety clean -> term/system detection -> template assembly
//! -> educational check -> negative prompt.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::educational::EducationalFilter;
use crate::random::{self, RandomSource, SamplingError};
use crate::safety::SafetyFilter;
use crate::templates::{self, TemplateError};
use crate::vocabulary::{
    BodySystem, FocusTemplate, Vocabulary, VocabularyError, CROSS_SECTION, EDUCATIONAL_CONTEXT,
    MEDICAL_ILLUSTRATION, SYSTEM_OVERVIEW,
};

const FOCUS_STYLE_SAMPLE: usize = 3;
const FOCUS_TAG_SAMPLE: usize = 4;
const DEFAULT_STYLE_SAMPLE: usize = 2;

#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("Enhancement template not found: {0}")]
    MissingTemplate(String),

    #[error("Template '{key}' could not be rendered: {source}")]
    Template { key: String, source: TemplateError },

    #[error("Cannot select from '{pool}': {source}")]
    Sampling { pool: String, source: SamplingError },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    #[default]
    Standard,
    CrossSection,
    SystemOverview,
}

impl ViewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewType::Standard => "standard",
            ViewType::CrossSection => "cross_section",
            ViewType::SystemOverview => "system_overview",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(ViewType::Standard),
            "cross_section" => Ok(ViewType::CrossSection),
            "system_overview" => Ok(ViewType::SystemOverview),
            other => Err(format!("Unknown view type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementResult {
    pub positive: String,
    pub negative: String,
    pub detected_terms: Vec<String>,
    pub detected_systems: Vec<String>,
}

/// The enhancement engine - owns both filters, shares the vocabulary
pub struct PromptEnhancer {
    vocabulary: Arc<Vocabulary>,
    safety_filter: SafetyFilter,
    educational_filter: EducationalFilter,
}

impl PromptEnhancer {
    pub fn new(vocabulary: Vocabulary) -> Result<Self, VocabularyError> {
        Self::from_shared(Arc::new(vocabulary))
    }

    /// Build an engine over a vocabulary that other engines may also hold.
    pub fn from_shared(vocabulary: Arc<Vocabulary>) -> Result<Self, VocabularyError> {
        let safety_filter = SafetyFilter::new(vocabulary.forbidden_terms.as_slice())?;
        let educational_filter = EducationalFilter::new(Arc::clone(&vocabulary));

        Ok(Self { vocabulary, safety_filter, educational_filter })
    }

    /// Engine over the vocabulary compiled into the crate.
    pub fn bundled() -> Result<Self, VocabularyError> {
        Self::new(Vocabulary::bundled()?)
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    pub fn safety_filter(&self) -> &SafetyFilter {
        &self.safety_filter
    }

    pub fn educational_filter(&self) -> &EducationalFilter {
        &self.educational_filter
    }

    /// Enhance a prompt using the thread-local random generator.
    pub fn enhance(
        &self,
        prompt: &str,
        focus: Option<&str>,
        view_type: ViewType,
    ) -> Result<EnhancementResult, EnhanceError> {
        self.enhance_with(prompt, focus, view_type, &mut rand::thread_rng())
    }

    /// Enhance a prompt, drawing modifier selections from `rng`.
    pub fn enhance_with(
        &self,
        prompt: &str,
        focus: Option<&str>,
        view_type: ViewType,
        rng: &mut dyn RandomSource,
    ) -> Result<EnhancementResult, EnhanceError> {
        let cleaned = self.safety_filter.clean(prompt);

        let detected_terms = self.detect_terms(&cleaned);
        let detected_systems = self.detect_systems(&detected_terms);
        tracing::debug!(
            terms = ?detected_terms,
            systems = ?detected_systems,
            "Detected anatomy"
        );

        let focus_config = focus.and_then(|name| self.vocabulary.focus_templates.get(name));
        let positive = match focus_config {
            Some(config) => self.build_focus_prompt(
                config,
                &cleaned,
                &detected_terms,
                &detected_systems,
                view_type,
                rng,
            )?,
            None => self.build_default_prompt(
                prompt,
                &detected_terms,
                &detected_systems,
                view_type,
                rng,
            )?,
        };

        let positive = self.educational_filter.ensure_appropriate(&positive);
        let negative = self.build_negative_prompt(focus);

        Ok(EnhancementResult {
            positive,
            negative,
            detected_terms,
            detected_systems,
        })
    }

    /// Organs and structures found as substrings, in vocabulary order.
    fn detect_terms(&self, cleaned: &str) -> Vec<String> {
        let lower = cleaned.to_lowercase();
        let mut detected = IndexSet::new();

        for system in self.vocabulary.body_systems.values() {
            for term in system.terms() {
                if lower.contains(&term.to_lowercase()) {
                    detected.insert(term.clone());
                }
            }
        }

        detected.into_iter().collect()
    }

    fn detect_systems(&self, detected_terms: &[String]) -> Vec<String> {
        let detected: Vec<String> = detected_terms.iter().map(|t| t.to_lowercase()).collect();

        self.vocabulary
            .body_systems
            .iter()
            .filter(|(_, system)| {
                system
                    .terms()
                    .any(|term| detected.contains(&term.to_lowercase()))
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn build_focus_prompt(
        &self,
        config: &FocusTemplate,
        cleaned: &str,
        detected_terms: &[String],
        detected_systems: &[String],
        view_type: ViewType,
        rng: &mut dyn RandomSource,
    ) -> Result<String, EnhanceError> {
        let primary = detected_terms.first().map(String::as_str).unwrap_or(cleaned);
        let mut parts = vec![
            render("style_prefix", &config.style_prefix, &[("organ", primary)])?,
            config.context.clone(),
        ];

        parts.extend(self.view_fragment(detected_terms, detected_systems, view_type)?);

        parts.extend(
            random::sample_up_to(rng, &config.style_modifiers, FOCUS_STYLE_SAMPLE)
                .into_iter()
                .map(str::to_string),
        );
        parts.push(pick(rng, "view_modifiers", &config.view_modifiers)?);
        parts.extend(
            random::sample_up_to(rng, &config.optimization_tags, FOCUS_TAG_SAMPLE)
                .into_iter()
                .map(str::to_string),
        );

        Ok(parts.join(", "))
    }

    fn build_default_prompt(
        &self,
        original: &str,
        detected_terms: &[String],
        detected_systems: &[String],
        view_type: ViewType,
        rng: &mut dyn RandomSource,
    ) -> Result<String, EnhanceError> {
        let mut parts = vec![];

        match detected_terms.first() {
            Some(primary) => parts.push(self.render_template(MEDICAL_ILLUSTRATION, &[("organ", primary.as_str())])?),
            None => parts.push(format!("anatomical illustration, {}", original.trim())),
        }

        parts.extend(self.view_fragment(detected_terms, detected_systems, view_type)?);
        parts.push(self.render_template(EDUCATIONAL_CONTEXT, &[])?);

        parts.extend(
            random::sample_up_to(rng, &self.vocabulary.style_modifiers, DEFAULT_STYLE_SAMPLE)
                .into_iter()
                .map(str::to_string),
        );
        parts.push(pick(rng, "view_modifiers", &self.vocabulary.view_modifiers)?);

        let tags = random::sample(
            rng,
            &self.vocabulary.optimization_tags,
            crate::validation::DEFAULT_OPTIMIZATION_SAMPLE,
        )
        .map_err(|source| EnhanceError::Sampling {
            pool: "3d_optimization_tags".to_string(),
            source,
        })?;
        parts.extend(tags.into_iter().map(str::to_string));

        Ok(parts.join(", "))
    }

    fn view_fragment(
        &self,
        detected_terms: &[String],
        detected_systems: &[String],
        view_type: ViewType,
    ) -> Result<Option<String>, EnhanceError> {
        match (view_type, detected_terms.first(), detected_systems.first()) {
            (ViewType::CrossSection, Some(term), _) => {
                self.render_template(CROSS_SECTION, &[("organ", term.as_str())]).map(Some)
            }
            (ViewType::SystemOverview, _, Some(system)) => {
                self.render_template(SYSTEM_OVERVIEW, &[("system", system.as_str())]).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn render_template(&self, key: &str, values: &[(&str, &str)]) -> Result<String, EnhanceError> {
        let template = self
            .vocabulary
            .template(key)
            .ok_or_else(|| EnhanceError::MissingTemplate(key.to_string()))?;
        render(key, template, values)
    }

    fn build_negative_prompt(&self, focus: Option<&str>) -> String {
        let mut parts: Vec<&str> = self
            .vocabulary
            .negative_prompt_additions
            .iter()
            .map(String::as_str)
            .collect();

        if let Some(extra) = focus.and_then(|name| self.vocabulary.focus_negative_prompts.get(name)) {
            parts.extend(extra.iter().map(String::as_str));
        }

        parts.join(", ")
    }

    /// Information about a body system, if it exists.
    pub fn get_system_info(&self, system_name: &str) -> Option<&BodySystem> {
        self.vocabulary.get_system(system_name)
    }

    /// Organs followed by structures for every body system.
    pub fn list_supported_terms(&self) -> IndexMap<String, Vec<String>> {
        self.vocabulary
            .body_systems
            .iter()
            .map(|(name, system)| (name.clone(), system.terms().cloned().collect()))
            .collect()
    }

    pub fn list_systems(&self) -> Vec<&str> {
        self.vocabulary.system_names()
    }
}

fn render(key: &str, template: &str, values: &[(&str, &str)]) -> Result<String, EnhanceError> {
    templates::render(template, values).map_err(|source| EnhanceError::Template {
        key: key.to_string(),
        source,
    })
}

fn pick(rng: &mut dyn RandomSource, pool_name: &str, pool: &[String]) -> Result<String, EnhanceError> {
    random::choose(rng, pool)
        .map(str::to_string)
        .map_err(|source| EnhanceError::Sampling {
            pool: pool_name.to_string(),
            source,
        })
}
