// src/engine/recommendations.rs
use super::scoring::{EmotionalImpact, Summary};
use crate::config::ScoringConfig;
use crate::models::ThirdsAlignment;

struct Rule {
    applies: fn(&Summary, &ScoringConfig) -> bool,
    message: fn(&ScoringConfig) -> String,
}

/// Checked in order; every rule that applies contributes its message.
const RULES: &[Rule] = &[
    Rule {
        applies: |s, _| s.cta_present == Some(false),
        message: |_| "Add a clear call to action such as \"Buy now\" or \"Saiba mais\".".into(),
    },
    Rule {
        applies: |s, c| {
            s.cta_present == Some(true)
                && s.cta_effectiveness
                    .is_some_and(|e| e < c.cta_effectiveness_threshold)
        },
        message: |_| {
            "Strengthen the call to action: move it to the lower third or a top corner and make it larger."
                .into()
        },
    },
    Rule {
        applies: |s, _| s.attention_alignment == ThirdsAlignment::OffGrid,
        message: |_| "Place the main subject near a rule-of-thirds intersection.".into(),
    },
    Rule {
        applies: |s, _| s.attention_alignment == ThirdsAlignment::CenterBiased,
        message: |_| {
            "The focus sits in the center; an off-center subject on the thirds grid draws more attention."
                .into()
        },
    },
    Rule {
        applies: |s, _| s.has_text == Some(false),
        message: |_| "Add a short headline to reinforce the message.".into(),
    },
    Rule {
        applies: |s, c| s.average_contrast.is_some_and(|v| v < c.contrast_threshold),
        message: |c| {
            format!(
                "Increase color contrast to at least {}:1 for readability.",
                c.contrast_threshold
            )
        },
    },
    Rule {
        applies: |s, _| s.emotional_impact == EmotionalImpact::Negative,
        message: |_| "The image conveys a negative emotion; check that it fits the campaign.".into(),
    },
    Rule {
        applies: |s, _| s.face_count == Some(0),
        message: |_| "Consider including human faces to increase emotional engagement.".into(),
    },
];

pub fn recommend(summary: &Summary, config: &ScoringConfig) -> Vec<String> {
    RULES
        .iter()
        .filter(|rule| (rule.applies)(summary, config))
        .map(|rule| (rule.message)(config))
        .collect()
}
