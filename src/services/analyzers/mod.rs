// src/services/analyzers/mod.rs
//! Analyzer adapters. Each one wraps a single model or algorithm behind the
//! shared [`Analyzer`] contract so the pipeline can treat them uniformly.

pub mod attention;
pub mod caption;
pub mod color;
pub mod cta;
pub mod emotion;
pub mod object_detection;
pub mod ocr;

pub use attention::AttentionAnalyzer;
pub use caption::CaptionAnalyzer;
pub use color::ColorAnalyzer;
pub use cta::CtaDetector;
pub use emotion::EmotionAnalyzer;
pub use object_detection::ObjectDetector;
pub use ocr::TextExtractor;

use crate::config::{ModelsConfig, Settings};
use crate::errors::NeuromarkError;
use crate::models::{AnalyzerKind, DecodedImage, Payload};
use crate::services::image_processor::encode_png;
use crate::services::inference_client::InferenceClient;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, OnceCell};

#[async_trait]
pub trait Analyzer: Send + Sync {
    fn kind(&self) -> AnalyzerKind;

    /// Load or reach the underlying model. Called once per process by the
    /// capability registry; the error is the human-readable reason.
    async fn probe(&self) -> Result<(), String> {
        Ok(())
    }

    async fn analyze(&self, image: Arc<DecodedImage>) -> Result<Payload, NeuromarkError>;
}

/// A model served over HTTP. Without a configured URL the capability is
/// reported as unavailable.
#[derive(Debug, Clone)]
pub struct RemoteModel {
    kind: AnalyzerKind,
    client: Option<InferenceClient>,
}

impl RemoteModel {
    pub fn new(kind: AnalyzerKind, client: Option<InferenceClient>) -> Self {
        Self { kind, client }
    }

    pub fn from_url(
        kind: AnalyzerKind,
        url: Option<&str>,
        models: &ModelsConfig,
    ) -> Result<Self, NeuromarkError> {
        let client = url
            .filter(|u| !u.trim().is_empty())
            .map(|u| InferenceClient::new(u, models))
            .transpose()?;
        Ok(Self::new(kind, client))
    }

    fn not_configured(&self) -> String {
        format!("no model endpoint configured for {}", self.kind)
    }

    pub async fn probe(&self) -> Result<(), String> {
        match &self.client {
            Some(client) => client.probe().await,
            None => Err(self.not_configured()),
        }
    }

    pub async fn infer<T: DeserializeOwned>(
        &self,
        image: &DecodedImage,
        options: &serde_json::Value,
    ) -> Result<T, NeuromarkError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| NeuromarkError::CapabilityUnavailable(self.not_configured()))?;
        let png = encode_png(image)?;
        client
            .infer(&png, image.width(), image.height(), options)
            .await
    }
}

/// Build the full analyzer set from settings.
pub fn build_analyzers(settings: &Settings) -> Result<Vec<Arc<dyn Analyzer>>, NeuromarkError> {
    let models = &settings.models;

    let detection = RemoteModel::from_url(
        AnalyzerKind::ObjectDetection,
        models.detection_url.as_deref(),
        models,
    )?;
    let ocr = RemoteModel::from_url(AnalyzerKind::Ocr, models.ocr_url.as_deref(), models)?;
    let caption =
        RemoteModel::from_url(AnalyzerKind::Caption, models.caption_url.as_deref(), models)?;
    let emotion =
        RemoteModel::from_url(AnalyzerKind::Emotion, models.emotion_url.as_deref(), models)?;

    let text = Arc::new(TextExtractor::new(ocr));

    let analyzers: Vec<Arc<dyn Analyzer>> = vec![
        Arc::new(ObjectDetector::new(detection, settings.detection.clone())),
        text.clone(),
        Arc::new(ColorAnalyzer::new(settings.color.clone())),
        Arc::new(CaptionAnalyzer::new(caption, models.caption_max_length)),
        Arc::new(EmotionAnalyzer::new(emotion)),
        Arc::new(AttentionAnalyzer::new(
            settings.attention.clone(),
            settings.scoring.thirds_tolerance,
        )),
        Arc::new(CtaDetector::new(text, settings.scoring.clone())),
    ];

    Ok(analyzers)
}

/// The value last computed for an image, keyed by the image's allocation.
/// Callers racing on the same image share one computation.
pub(crate) struct ImageMemo<T> {
    last: Mutex<Option<(Weak<DecodedImage>, Arc<OnceCell<T>>)>>,
}

impl<T: Clone> ImageMemo<T> {
    pub(crate) fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }

    pub(crate) async fn get_or_init<F, Fut>(&self, image: &Arc<DecodedImage>, init: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let cell = {
            let mut last = self.last.lock().await;
            let current = last.as_ref().and_then(|(seen, cell)| {
                let same = seen.upgrade().is_some_and(|s| Arc::ptr_eq(&s, image));
                same.then(|| cell.clone())
            });
            match current {
                Some(cell) => cell,
                None => {
                    let cell = Arc::new(OnceCell::new());
                    *last = Some((Arc::downgrade(image), cell.clone()));
                    cell
                }
            }
        };

        cell.get_or_init(init).await.clone()
    }
}

pub(crate) fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f32.powi(decimals);
    (value * factor).round() / factor
}

/// Run CPU-bound analysis off the async executor.
pub(crate) async fn run_blocking<T, F>(kind: AnalyzerKind, f: F) -> Result<T, NeuromarkError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| NeuromarkError::AnalyzerFailure(format!("{} task aborted: {}", kind, e)))
}
