// src/engine/scoring.rs
//! Summary metrics derived from report sections. Every function here is pure;
//! a missing or placeholder section contributes no signal.

use super::aggregator::Report;
use super::recommendations::recommend;
use crate::config::ScoringConfig;
use crate::models::{ColorEmotion, CtaElement, Detection, ThirdsAlignment};
use crate::services::analyzers::round_to;
use serde::{Deserialize, Serialize};

const THIRDS: [f32; 2] = [1.0 / 3.0, 2.0 / 3.0];

const SOCIAL_SYMBOL_TERMS: [&str; 6] = ["flag", "cross", "star", "crown", "money", "dollar"];

const CLOSE_UP_CONFIDENCE: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmotionalImpact {
    PositiveHigh,
    PositiveLow,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShotType {
    CloseUp,
    Medium,
    Wide,
    Undefined,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_objects: Option<usize>,
    pub people_count: Option<usize>,
    pub shot_type: ShotType,
    pub social_symbols: Vec<String>,
    pub has_text: Option<bool>,
    pub face_count: Option<usize>,
    pub scene_emotion: Option<String>,
    pub emotional_impact: EmotionalImpact,
    pub attention_score: Option<f32>,
    pub attention_alignment: ThirdsAlignment,
    pub cta_present: Option<bool>,
    pub cta_effectiveness: Option<f32>,
    pub color_palette: Option<ColorEmotion>,
    pub average_contrast: Option<f32>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Valence {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Energy {
    High,
    Low,
    Dark,
}

fn valence(scene_emotion: &str) -> Valence {
    match scene_emotion {
        "happy" | "surprise" => Valence::Positive,
        "sad" | "angry" | "fear" | "disgust" => Valence::Negative,
        _ => Valence::Neutral,
    }
}

fn energy(tag: ColorEmotion) -> Energy {
    match tag {
        ColorEmotion::WarmEnergetic | ColorEmotion::Cheerful | ColorEmotion::Creative => {
            Energy::High
        }
        ColorEmotion::Dark => Energy::Dark,
        _ => Energy::Low,
    }
}

/// Lookup keyed by the palette tag and the scene emotion. Either side missing
/// means neutral.
pub fn emotional_impact(
    palette: Option<ColorEmotion>,
    scene_emotion: Option<&str>,
) -> EmotionalImpact {
    let (Some(tag), Some(scene)) = (palette, scene_emotion) else {
        return EmotionalImpact::Neutral;
    };

    match (valence(scene), energy(tag)) {
        (Valence::Positive, Energy::High) => EmotionalImpact::PositiveHigh,
        (Valence::Positive, _) => EmotionalImpact::PositiveLow,
        (Valence::Neutral, Energy::High) => EmotionalImpact::PositiveLow,
        (Valence::Neutral, _) => EmotionalImpact::Neutral,
        (Valence::Negative, _) => EmotionalImpact::Negative,
    }
}

/// Nearest thirds line to a normalized coordinate.
pub fn nearest_third(value: f32) -> f32 {
    if (value - THIRDS[0]).abs() <= (value - THIRDS[1]).abs() {
        THIRDS[0]
    } else {
        THIRDS[1]
    }
}

pub fn classify_thirds(nx: f32, ny: f32, tolerance: f32) -> ThirdsAlignment {
    let near_intersection = (nx - nearest_third(nx)).abs() <= tolerance
        && (ny - nearest_third(ny)).abs() <= tolerance;
    let in_center_cell =
        (THIRDS[0]..=THIRDS[1]).contains(&nx) && (THIRDS[0]..=THIRDS[1]).contains(&ny);

    if near_intersection {
        ThirdsAlignment::Aligned
    } else if in_center_cell {
        ThirdsAlignment::CenterBiased
    } else {
        ThirdsAlignment::OffGrid
    }
}

/// Lower third, or one of the two top corner cells.
pub fn is_strategic_position(nx: f32, ny: f32) -> bool {
    let lower_third = ny >= THIRDS[1];
    let top_corner = ny <= THIRDS[0] && (nx <= THIRDS[0] || nx >= THIRDS[1]);
    lower_third || top_corner
}

/// Weighted mix of placement, size and keyword strength, in [0, 1].
pub fn cta_effectiveness(elements: &[CtaElement], config: &ScoringConfig) -> f32 {
    if elements.is_empty() {
        return 0.0;
    }
    let n = elements.len() as f32;

    let strategic = elements.iter().filter(|e| e.is_strategic_position).count() as f32 / n;
    let mean_size = elements.iter().map(|e| e.relative_size).sum::<f32>() / n;
    let size = (mean_size / config.cta_target_relative_size).clamp(0.0, 1.0);
    let saturation = config.cta_keyword_saturation.max(1) as f32;
    let keywords = elements
        .iter()
        .map(|e| (e.keywords.len() as f32 / saturation).min(1.0))
        .sum::<f32>()
        / n;

    let total_weight =
        config.cta_position_weight + config.cta_size_weight + config.cta_keyword_weight;
    if total_weight <= 0.0 {
        return 0.0;
    }

    let score = (config.cta_position_weight * strategic
        + config.cta_size_weight * size
        + config.cta_keyword_weight * keywords)
        / total_weight;
    round_to(score.clamp(0.0, 1.0), 2)
}

pub fn shot_type(objects: &[Detection]) -> ShotType {
    let people: Vec<&Detection> = objects.iter().filter(|d| d.name == "person").collect();
    match people.as_slice() {
        [] => ShotType::Undefined,
        [only] if only.confidence > CLOSE_UP_CONFIDENCE => ShotType::CloseUp,
        [_] | [_, _] => ShotType::Medium,
        _ => ShotType::Wide,
    }
}

/// Detected object names that read as social symbols, first occurrence order.
pub fn social_symbols(objects: &[Detection]) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for d in objects {
        let name = d.name.to_lowercase();
        if SOCIAL_SYMBOL_TERMS.iter().any(|t| name.contains(t)) && !symbols.contains(&d.name) {
            symbols.push(d.name.clone());
        }
    }
    symbols
}

pub fn summarize(report: &Report, config: &ScoringConfig) -> Summary {
    let objects = report.objects();
    let colors = report.colors();
    let emotion = report.emotion();
    let attention = report.attention();
    let cta = report.cta();

    let color_palette = colors
        .and_then(|c| c.dominant_colors.first())
        .map(|c| c.emotion_tag);
    let scene_emotion = emotion
        .filter(|e| e.faces_detected > 0)
        .map(|e| e.scene_emotion.clone());

    let mut summary = Summary {
        total_objects: objects.map(|o| o.count),
        people_count: objects.map(|o| o.objects.iter().filter(|d| d.name == "person").count()),
        shot_type: objects.map_or(ShotType::Undefined, |o| shot_type(&o.objects)),
        social_symbols: objects.map(|o| social_symbols(&o.objects)).unwrap_or_default(),
        has_text: report.text().map(|t| !t.full_text.trim().is_empty()),
        face_count: emotion.map(|e| e.faces_detected),
        emotional_impact: emotional_impact(color_palette, scene_emotion.as_deref()),
        scene_emotion,
        attention_score: attention.map(|a| a.attention_score),
        attention_alignment: attention
            .map_or(ThirdsAlignment::Unknown, |a| a.rule_of_thirds_alignment),
        cta_present: cta.map(|c| c.cta_present),
        cta_effectiveness: cta.map(|c| c.effectiveness_score),
        color_palette,
        average_contrast: colors.map(|c| c.average_contrast),
        recommendations: Vec::new(),
    };
    summary.recommendations = recommend(&summary, config);
    summary
}
