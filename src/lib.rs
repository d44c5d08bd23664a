//! Prompt Refiner Anatomy - K-6 Safe Prompt Enhancement
//!
//! # Ground Rules
//! 1. Unsafe input is filtered, never rejected
//! 2. Cleaned prompts are never empty
//! 3. Vocabulary is read-only after load
//! 4. Randomness is injected, never hidden
//! 5. Output always reads as an educational diagram request

pub mod config;
pub mod educational;
pub mod enhancer;
pub mod generation;
pub mod random;
pub mod safety;
pub mod templates;
pub mod validation;
pub mod vocabulary;

pub use config::RefinerConfig;
pub use educational::EducationalFilter;
pub use enhancer::{EnhanceError, EnhancementResult, PromptEnhancer, ViewType};
pub use generation::{EnhanceOptions, EnhancedGenerator, GenerationError, GenerationRequest, ImageGenerator};
pub use random::{RandomSource, SamplingError};
pub use safety::{SafetyFilter, SAFE_FALLBACK};
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};
pub use vocabulary::{BodySystem, FocusTemplate, Vocabulary, VocabularyError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
