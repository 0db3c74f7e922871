// src/services/analyzers/ocr.rs
use super::{Analyzer, ImageMemo, RemoteModel};
use crate::errors::NeuromarkError;
use crate::models::{AnalyzerKind, BoundingBox, DecodedImage, Payload, TextExtraction, TextSegment};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct RawOcr {
    #[serde(default)]
    pub results: Vec<RawTextBox>,
}

#[derive(Debug, Deserialize)]
pub struct RawTextBox {
    /// Corner points of the detected text quadrilateral.
    pub points: Vec<[f32; 2]>,
    pub text: String,
    pub confidence: f32,
}

/// Remote text extraction. OCR and CTA detection share one instance, and a
/// run that includes both calls the model once per image.
pub struct TextExtractor {
    model: RemoteModel,
    recent: ImageMemo<Result<TextExtraction, String>>,
}

impl TextExtractor {
    pub fn new(model: RemoteModel) -> Self {
        Self {
            model,
            recent: ImageMemo::new(),
        }
    }

    pub async fn probe_model(&self) -> Result<(), String> {
        self.model.probe().await
    }

    pub async fn extract(
        &self,
        image: &Arc<DecodedImage>,
    ) -> Result<TextExtraction, NeuromarkError> {
        self.recent
            .get_or_init(image, || async {
                self.request(image).await.map_err(|e| e.to_string())
            })
            .await
            .map_err(NeuromarkError::AnalyzerFailure)
    }

    async fn request(&self, image: &DecodedImage) -> Result<TextExtraction, NeuromarkError> {
        let raw: RawOcr = self
            .model
            .infer(image, &json!({ "languages": ["en", "pt"] }))
            .await?;
        Ok(to_extraction(raw))
    }
}

pub fn to_extraction(raw: RawOcr) -> TextExtraction {
    let segments: Vec<TextSegment> = raw
        .results
        .into_iter()
        .filter_map(|r| {
            let text = r.text.trim();
            if text.is_empty() {
                return None;
            }
            Some(TextSegment {
                text: text.to_string(),
                confidence: r.confidence.clamp(0.0, 1.0),
                bbox: BoundingBox::enclosing(&r.points)?,
            })
        })
        .collect();

    let full_text = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    TextExtraction {
        full_text,
        total_segments: segments.len(),
        segments,
    }
}

#[async_trait]
impl Analyzer for TextExtractor {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Ocr
    }

    async fn probe(&self) -> Result<(), String> {
        self.probe_model().await
    }

    async fn analyze(&self, image: Arc<DecodedImage>) -> Result<Payload, NeuromarkError> {
        Ok(Payload::Text(self.extract(&image).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrilaterals_become_axis_aligned_boxes() {
        let raw: RawOcr = serde_json::from_value(json!({
            "results": [
                {"points": [[50, 400], [250, 402], [249, 450], [51, 449]], "text": "Compre agora", "confidence": 0.93},
                {"points": [[10, 10], [90, 10], [90, 40], [10, 40]], "text": "SALE", "confidence": 0.88}
            ]
        }))
        .unwrap();

        let extraction = to_extraction(raw);
        assert_eq!(extraction.total_segments, 2);
        assert_eq!(extraction.full_text, "Compre agora SALE");
        assert_eq!(
            extraction.segments[0].bbox,
            BoundingBox::new(50.0, 400.0, 250.0, 450.0)
        );
    }

    #[test]
    fn blank_text_and_pointless_boxes_are_dropped() {
        let raw: RawOcr = serde_json::from_value(json!({
            "results": [
                {"points": [[0, 0], [1, 1]], "text": "   ", "confidence": 0.5},
                {"points": [], "text": "ghost", "confidence": 0.5},
                {"points": [[3, 4], [8, 9]], "text": " ok ", "confidence": 1.7}
            ]
        }))
        .unwrap();

        let extraction = to_extraction(raw);
        assert_eq!(extraction.total_segments, 1);
        assert_eq!(extraction.segments[0].text, "ok");
        assert_eq!(extraction.segments[0].confidence, 1.0);
    }

    #[test]
    fn empty_response_yields_empty_text() {
        let extraction = to_extraction(serde_json::from_value(json!({})).unwrap());
        assert_eq!(extraction.full_text, "");
        assert!(extraction.segments.is_empty());
    }
}
