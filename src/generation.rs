//! Generation Adapter - Enhanced Prompts for Any Image Generator
//!
//! `EnhancedGenerator` implements the same `ImageGenerator` surface as the
//! generator it wraps. The only difference is that the incoming prompt is
//! treated as a raw anatomy term and replaced by the enhanced prompt pair.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::enhancer::{EnhanceError, PromptEnhancer, ViewType};

const LOGGED_PROMPT_CHARS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    /// Everything else (steps, guidance, seed, ...), forwarded untouched.
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Anything that turns a prompt pair into an image.
pub trait ImageGenerator {
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    fn generate(&self, request: GenerationRequest) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Error)]
pub enum GenerationError<E: std::error::Error + 'static> {
    #[error("Prompt enhancement failed: {0}")]
    Enhance(#[from] EnhanceError),

    #[error("Image generation failed: {0}")]
    Generator(#[source] E),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhanceOptions {
    pub focus: Option<String>,
    pub view_type: ViewType,
}

pub struct EnhancedGenerator<G> {
    inner: G,
    enhancer: Arc<PromptEnhancer>,
    options: EnhanceOptions,
}

impl<G: ImageGenerator> EnhancedGenerator<G> {
    pub fn new(inner: G, enhancer: Arc<PromptEnhancer>) -> Self {
        Self {
            inner,
            enhancer,
            options: EnhanceOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EnhanceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &EnhanceOptions {
        &self.options
    }

    /// The wrapped generator, for anything beyond `generate`.
    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn into_inner(self) -> G {
        self.inner
    }

    pub fn generate_term(
        &self,
        term: &str,
        parameters: Map<String, Value>,
    ) -> Result<G::Output, GenerationError<G::Error>> {
        self.generate(GenerationRequest::new(term).with_parameters(parameters))
    }

    /// One result per term. A failed item becomes `None`; the rest still run.
    pub fn generate_batch<S: AsRef<str>>(
        &self,
        terms: &[S],
        parameters: &Map<String, Value>,
    ) -> Vec<Option<G::Output>> {
        terms
            .iter()
            .map(|term| {
                let term = term.as_ref();
                match self.generate_term(term, parameters.clone()) {
                    Ok(output) => Some(output),
                    Err(e) => {
                        tracing::error!(term = %term, error = %e, "Failed to generate");
                        None
                    }
                }
            })
            .collect()
    }
}

impl<G: ImageGenerator> ImageGenerator for EnhancedGenerator<G> {
    type Output = G::Output;
    type Error = GenerationError<G::Error>;

    fn generate(&self, request: GenerationRequest) -> Result<Self::Output, Self::Error> {
        let enhanced = self.enhancer.enhance(
            &request.prompt,
            self.options.focus.as_deref(),
            self.options.view_type,
        )?;

        let preview: String = enhanced.positive.chars().take(LOGGED_PROMPT_CHARS).collect();
        tracing::info!(term = %request.prompt, "Enhanced prompt: {preview}...");

        let forwarded = GenerationRequest {
            prompt: enhanced.positive,
            negative_prompt: request.negative_prompt.or(Some(enhanced.negative)),
            parameters: request.parameters,
        };

        self.inner.generate(forwarded).map_err(GenerationError::Generator)
    }
}
