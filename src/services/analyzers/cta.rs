// src/services/analyzers/cta.rs
use super::{Analyzer, TextExtractor, round_to};
use crate::config::ScoringConfig;
use crate::engine::scoring::{cta_effectiveness, is_strategic_position};
use crate::errors::NeuromarkError;
use crate::models::{
    AnalyzerKind, CtaDetection, CtaElement, DecodedImage, FocusPoint, Payload, TextSegment,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Action words in Portuguese and English, matched as lowercase substrings.
pub const CTA_KEYWORDS: &[&str] = &[
    "compre",
    "buy",
    "comprar",
    "adquira",
    "peça",
    "order",
    "saiba mais",
    "learn more",
    "descubra",
    "discover",
    "cadastre-se",
    "sign up",
    "registre-se",
    "register",
    "baixe",
    "download",
    "baixar",
    "clique",
    "click",
    "toque",
    "tap",
    "agora",
    "now",
    "já",
    "already",
    "grátis",
    "free",
    "gratuito",
    "oferta",
    "offer",
    "promoção",
    "promotion",
    "experimente",
    "try",
    "teste",
    "test",
];

/// Call-to-action detection over OCR output. Shares the OCR extractor, so it
/// is available exactly when text extraction is and sees the same segments
/// as the OCR section of a run.
pub struct CtaDetector {
    text: Arc<TextExtractor>,
    scoring: ScoringConfig,
}

impl CtaDetector {
    pub fn new(text: Arc<TextExtractor>, scoring: ScoringConfig) -> Self {
        Self { text, scoring }
    }
}

pub fn matched_keywords(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    CTA_KEYWORDS
        .iter()
        .filter(|k| lowered.contains(*k))
        .map(|k| k.to_string())
        .collect()
}

pub fn detect_cta_elements(
    segments: &[TextSegment],
    width: u32,
    height: u32,
) -> Vec<CtaElement> {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);

    segments
        .iter()
        .filter_map(|segment| {
            let keywords = matched_keywords(&segment.text);
            if keywords.is_empty() {
                return None;
            }

            let (cx, cy) = segment.bbox.center();
            let (nx, ny) = (cx / w, cy / h);
            Some(CtaElement {
                text: segment.text.clone(),
                keywords,
                bbox: segment.bbox,
                position: FocusPoint {
                    x: round_to(cx, 1),
                    y: round_to(cy, 1),
                    normalized_x: round_to(nx, 3),
                    normalized_y: round_to(ny, 3),
                },
                is_strategic_position: is_strategic_position(nx, ny),
                relative_size: round_to(segment.bbox.area() / (w * h) * 100.0, 2),
                confidence: segment.confidence,
            })
        })
        .collect()
}

pub fn to_cta_detection(elements: Vec<CtaElement>, scoring: &ScoringConfig) -> CtaDetection {
    CtaDetection {
        cta_present: !elements.is_empty(),
        cta_count: elements.len(),
        effectiveness_score: cta_effectiveness(&elements, scoring),
        elements,
    }
}

#[async_trait]
impl Analyzer for CtaDetector {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Cta
    }

    async fn probe(&self) -> Result<(), String> {
        self.text.probe_model().await
    }

    async fn analyze(&self, image: Arc<DecodedImage>) -> Result<Payload, NeuromarkError> {
        let extraction = self.text.extract(&image).await?;
        let elements = detect_cta_elements(&extraction.segments, image.width(), image.height());
        Ok(Payload::Cta(to_cta_detection(elements, &self.scoring)))
    }
}
