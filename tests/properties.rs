//! Property Tests - Filters Over Arbitrary Input

use proptest::prelude::*;
use std::sync::LazyLock;

use prompt_refiner_anatomy::{PromptEnhancer, ViewType};

static ENHANCER: LazyLock<PromptEnhancer> = LazyLock::new(|| PromptEnhancer::bundled().unwrap());

/// Free text mixed with vocabulary and forbidden words.
fn prompt_strategy() -> impl Strategy<Value = String> {
    let word = prop_oneof![
        "[a-zA-Z]{1,8}",
        Just("heart".to_string()),
        Just("brain".to_string()),
        Just("Gore".to_string()),
        Just("NUDE".to_string()),
        Just("surgical".to_string()),
        Just("dissection".to_string()),
        Just("blood".to_string()),
        Just(",".to_string()),
    ];
    prop::collection::vec(word, 0..8).prop_map(|words| words.join(" "))
}

proptest! {
    #[test]
    fn clean_is_never_empty(prompt in prompt_strategy()) {
        let cleaned = ENHANCER.safety_filter().clean(&prompt);
        prop_assert!(!cleaned.trim().is_empty());
    }

    #[test]
    fn clean_output_is_safe(prompt in prompt_strategy()) {
        let filter = ENHANCER.safety_filter();
        let cleaned = filter.clean(&prompt);
        prop_assert_eq!(filter.clean(&cleaned), cleaned.clone());
        prop_assert!(!cleaned.split_whitespace().any(|w| w == "nude" || w == "gore"));
    }

    #[test]
    fn ensure_appropriate_is_idempotent(prompt in "[a-z ,]{0,40}") {
        let filter = ENHANCER.educational_filter();
        let once = filter.ensure_appropriate(&prompt);
        prop_assert_eq!(filter.ensure_appropriate(&once), once.clone());
    }

    #[test]
    fn enhance_always_succeeds(prompt in prompt_strategy(), seed in any::<u64>()) {
        use rand::{rngs::StdRng, SeedableRng};

        let result = ENHANCER
            .enhance_with(&prompt, Some("education"), ViewType::SystemOverview, &mut StdRng::seed_from_u64(seed))
            .unwrap();
        prop_assert!(!result.positive.is_empty());
        prop_assert!(result.negative.contains("frightening"));
    }
}
