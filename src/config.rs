//! Configuration - Vocabulary Location and Logging
//!
//! Values come from the environment and can be overridden by CLI flags.
//! The library never installs a log subscriber; the binary does that
//! from `log_level`.

use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

use crate::vocabulary::{Vocabulary, VocabularyError};

pub const VOCABULARY_ENV: &str = "PROMPT_REFINER_VOCABULARY";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinerConfig {
    /// `None` means the bundled vocabulary.
    pub vocabulary_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            vocabulary_path: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl RefinerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            vocabulary_path: get(VOCABULARY_ENV).map(PathBuf::from),
            log_level: get(LOG_LEVEL_ENV).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    pub fn with_vocabulary_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.vocabulary_path = path;
        }
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Raise the log level to at least `floor`. More detailed levels and
    /// filter directives that are not a plain level are left as they are.
    pub fn with_minimum_log_level(mut self, floor: LevelFilter) -> Self {
        if let Ok(current) = self.log_level.trim().parse::<LevelFilter>() {
            if current < floor {
                self.log_level = floor.to_string().to_lowercase();
            }
        }
        self
    }

    pub fn load_vocabulary(&self) -> Result<Vocabulary, VocabularyError> {
        match &self.vocabulary_path {
            Some(path) => Vocabulary::load_from_path(path),
            None => Vocabulary::bundled(),
        }
    }
}
