use irongpt_core::domain::intent::Intent;

/// Trigger keywords per intent, scanned top to bottom. Earlier rows win ties.
pub const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::AskFormAdvice, &["form", "technique", "posture", "alignment", "cue"]),
    (
        Intent::GenerateWorkout,
        &[
            "workout",
            "plan",
            "exercise",
            "routine",
            "training",
            "lose",
            "lose weight",
            "fat loss",
            "gain",
            "muscle",
            "bulk",
            "strength",
        ],
    ),
    (
        Intent::GenerateNutrition,
        &["meal", "nutrition", "diet", "calories", "macros", "eat", "diet plan", "meal plan"],
    ),
    (Intent::LogFeeling, &["felt", "feeling", "sore", "tired", "energy"]),
    (Intent::SwapExercise, &["swap", "change", "alternate", "replace"]),
    (Intent::ViewPlan, &["view", "show", "open", "display"]),
    (Intent::Clarify, &["what", "repeat", "did you mean", "clarify"]),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedIntent {
    pub intent: Intent,
    pub matched_keyword: Option<&'static str>,
}

#[derive(Clone, Debug, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> Intent {
        self.classify_with_match(text).intent
    }

    pub fn classify_with_match(&self, text: &str) -> ClassifiedIntent {
        let normalized_text = normalize_text(text);

        INTENT_KEYWORDS
            .iter()
            .find_map(|(intent, keywords)| {
                keywords
                    .iter()
                    .find(|keyword| normalized_text.contains(*keyword))
                    .map(|keyword| ClassifiedIntent { intent: *intent, matched_keyword: Some(*keyword) })
            })
            .unwrap_or(ClassifiedIntent { intent: Intent::Clarify, matched_keyword: None })
    }
}

pub fn classify(text: &str) -> Intent {
    IntentClassifier::new().classify(text)
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
}
