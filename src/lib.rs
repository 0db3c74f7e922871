// src/lib.rs
pub mod config;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;

use crate::config::Settings;
use crate::engine::{AnalysisPipeline, NeuromarketingEngine};
use crate::errors::NeuromarkError;
use crate::services::analyzers::{Analyzer, build_analyzers};
use crate::services::{CapabilityRegistry, ImageProcessor};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub image_processor: Arc<ImageProcessor>,
    pub engine: Arc<NeuromarketingEngine>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wire the engine around an explicit analyzer set.
    pub fn with_analyzers(settings: &Settings, analyzers: Vec<Arc<dyn Analyzer>>) -> Self {
        let registry = Arc::new(CapabilityRegistry::new(analyzers));
        let pipeline = AnalysisPipeline::new(registry, settings.pipeline.analyzer_timeout());

        Self {
            image_processor: Arc::new(ImageProcessor::from_config(&settings.image)),
            engine: Arc::new(NeuromarketingEngine::new(
                pipeline,
                settings.scoring.clone(),
            )),
            max_upload_bytes: settings.image.max_upload_bytes,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, NeuromarkError> {
        Ok(Self::with_analyzers(settings, build_analyzers(settings)?))
    }
}
