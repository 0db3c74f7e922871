// src/services/analyzers/caption.rs
use super::{Analyzer, RemoteModel};
use crate::errors::NeuromarkError;
use crate::models::{AnalyzerKind, Caption, DecodedImage, Payload};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

// Captioning models do not report a confidence; this is the assumed value.
const DEFAULT_CONFIDENCE: f32 = 0.85;

#[derive(Debug, Deserialize)]
pub struct RawCaption {
    pub caption: String,
    pub confidence: Option<f32>,
}

pub struct CaptionAnalyzer {
    model: RemoteModel,
    max_length: u32,
}

impl CaptionAnalyzer {
    pub fn new(model: RemoteModel, max_length: u32) -> Self {
        Self { model, max_length }
    }
}

pub fn to_caption(raw: RawCaption) -> Result<Caption, NeuromarkError> {
    let caption = raw.caption.trim().to_string();
    if caption.is_empty() {
        return Err(NeuromarkError::AnalyzerFailure(
            "caption model returned an empty caption".to_string(),
        ));
    }

    Ok(Caption {
        word_count: caption.split_whitespace().count(),
        confidence: raw.confidence.unwrap_or(DEFAULT_CONFIDENCE).clamp(0.0, 1.0),
        caption,
    })
}

#[async_trait]
impl Analyzer for CaptionAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Caption
    }

    async fn probe(&self) -> Result<(), String> {
        self.model.probe().await
    }

    async fn analyze(&self, image: Arc<DecodedImage>) -> Result<Payload, NeuromarkError> {
        let raw: RawCaption = self
            .model
            .infer(&image, &json!({ "max_length": self.max_length }))
            .await?;
        Ok(Payload::Caption(to_caption(raw)?))
    }
}
