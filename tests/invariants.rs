//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees of the public API.

use std::io::Write;
use std::sync::Arc;
use std::thread;

use prompt_refiner_anatomy::{
    EnhanceError, PromptEnhancer, RefinerConfig, SafetyFilter, ViewType, Vocabulary,
    VocabularyError, SAFE_FALLBACK,
};

fn create_enhancer() -> PromptEnhancer {
    PromptEnhancer::bundled().unwrap()
}

#[test]
fn invariant_heart_is_enhanced() {
    let result = create_enhancer().enhance("heart", None, ViewType::Standard).unwrap();

    assert!(result.detected_terms.contains(&"heart".to_string()));
    assert!(result.detected_systems.contains(&"circulatory".to_string()));

    let positive = result.positive.to_lowercase();
    assert!(positive.contains("anatomical illustration"));
    assert!(positive.contains("educational"));

    assert!(result.negative.contains("blood"));
    assert!(result.negative.contains("gore"));
    assert!(result.negative.contains("labels"));
}

#[test]
fn invariant_brain_is_nervous() {
    let result = create_enhancer().enhance("brain", None, ViewType::Standard).unwrap();

    assert!(result.detected_terms.contains(&"brain".to_string()));
    assert!(result.detected_systems.contains(&"nervous".to_string()));
    assert!(result.positive.to_lowercase().contains("anatomical illustration"));
}

#[test]
fn invariant_view_types_add_framing() {
    let enhancer = create_enhancer();

    let cross = enhancer.enhance("heart", None, ViewType::CrossSection).unwrap();
    assert!(cross.positive.to_lowercase().contains("cross-section"));

    let overview = enhancer.enhance("heart", None, ViewType::SystemOverview).unwrap();
    assert!(overview.positive.to_lowercase().contains("system"));
}

#[test]
fn invariant_focus_adds_negative_prompts() {
    let enhancer = create_enhancer();

    let education = enhancer.enhance("heart", Some("education"), ViewType::Standard).unwrap();
    assert!(education.negative.contains("frightening"));

    let reconstruction = enhancer
        .enhance("heart", Some("3d_reconstruction"), ViewType::Standard)
        .unwrap();
    assert!(reconstruction.negative.contains("multiple objects"));
}

#[test]
fn invariant_unknown_term_still_succeeds() {
    let result = create_enhancer().enhance("flibberjib", None, ViewType::Standard).unwrap();

    assert!(result.detected_terms.is_empty());
    assert!(result.detected_systems.is_empty());
    assert!(result.positive.to_lowercase().contains("anatomical"));
    assert!(!result.negative.is_empty());
}

#[test]
fn invariant_supported_terms_listed() {
    let terms = create_enhancer().list_supported_terms();

    assert!(terms["circulatory"].contains(&"heart".to_string()));
    assert!(terms["nervous"].contains(&"brain".to_string()));
    assert!(terms.contains_key("skeletal"));
}

#[test]
fn invariant_system_info_lookup() {
    let enhancer = create_enhancer();

    let info = enhancer.get_system_info("circulatory").unwrap();
    assert!(info.organs.contains(&"heart".to_string()));
    assert!(!info.description.is_empty());

    assert!(enhancer.get_system_info("unknown_system").is_none());
}

#[test]
fn invariant_forbidden_input_falls_back() {
    let enhancer = create_enhancer();
    assert_eq!(enhancer.safety_filter().clean("gore nude blood"), SAFE_FALLBACK);

    let result = enhancer.enhance("naked gore", None, ViewType::Standard).unwrap();
    assert!(result.detected_terms.is_empty());
    assert!(!result.positive.is_empty());
}

#[test]
fn invariant_every_forbidden_term_is_removed() {
    let vocabulary = Vocabulary::bundled().unwrap();
    let filter = SafetyFilter::new(&vocabulary.forbidden_terms).unwrap();

    for term in &vocabulary.forbidden_terms {
        let prompt = format!("a {} picture of the heart", term.to_uppercase());
        let cleaned = filter.clean(&prompt);
        let words: Vec<_> = cleaned.split_whitespace().collect();
        assert!(!words.contains(&term.as_str()), "{term} survived in {cleaned:?}");
        assert!(cleaned.contains("heart"));
    }
}

#[test]
fn invariant_positive_prompt_is_educational() {
    let enhancer = create_enhancer();
    for prompt in ["heart", "flibberjib", "skull", "gore", "lungs and liver"] {
        for focus in [None, Some("education"), Some("scientific"), Some("3d_reconstruction")] {
            let result = enhancer.enhance(prompt, focus, ViewType::Standard).unwrap();
            let filter = enhancer.educational_filter();
            assert!(filter.contains_valid_anatomy(&result.positive), "{prompt} {focus:?}");
            assert!(filter.has_educational_context(&result.positive), "{prompt} {focus:?}");
        }
    }
}

#[test]
fn invariant_vocabulary_shared_across_threads() {
    let vocabulary = Arc::new(Vocabulary::bundled().unwrap());

    let handles: Vec<_> = ["heart", "brain", "lungs"]
        .into_iter()
        .map(|prompt| {
            let vocabulary = Arc::clone(&vocabulary);
            thread::spawn(move || {
                let enhancer = PromptEnhancer::from_shared(vocabulary).unwrap();
                enhancer.enhance(prompt, None, ViewType::Standard).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap();
        assert_eq!(result.detected_systems.len(), 1);
    }
}

#[test]
fn invariant_custom_vocabulary_from_config() {
    let mut value: serde_json::Value =
        serde_json::from_str(prompt_refiner_anatomy::vocabulary::BUNDLED_VOCABULARY).unwrap();
    value["negative_prompt_additions"] = serde_json::json!(["labels", "purple"]);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(value.to_string().as_bytes()).unwrap();

    let config = RefinerConfig::default().with_vocabulary_path(Some(file.path().to_path_buf()));
    let enhancer = PromptEnhancer::new(config.load_vocabulary().unwrap()).unwrap();
    let result = enhancer.enhance("heart", None, ViewType::Standard).unwrap();

    assert_eq!(result.negative, "labels, purple");
}

#[test]
fn invariant_invalid_vocabulary_is_fatal() {
    let mut value: serde_json::Value =
        serde_json::from_str(prompt_refiner_anatomy::vocabulary::BUNDLED_VOCABULARY).unwrap();
    value["enhancement_templates"]["cross_section"] = serde_json::json!("inside the {organ");

    let err = Vocabulary::from_json_str(&value.to_string()).unwrap_err();
    assert!(matches!(err, VocabularyError::Invalid(_)));
}

#[test]
fn invariant_bad_template_is_enhance_error() {
    let mut vocabulary = Vocabulary::bundled().unwrap();
    vocabulary
        .enhancement_templates
        .insert("medical_illustration".to_string(), "{organ} in {place}".to_string());

    let enhancer = PromptEnhancer::new(vocabulary).unwrap();
    let err = enhancer.enhance("heart", None, ViewType::Standard).unwrap_err();
    assert!(matches!(err, EnhanceError::Template { .. }));
}
