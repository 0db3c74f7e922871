// src/engine/mod.rs
//! Orchestration: run analyzers, normalize their output, score it.

pub mod aggregator;
pub mod pipeline;
pub mod recommendations;
pub mod scoring;

pub use aggregator::{Report, Section};
pub use pipeline::AnalysisPipeline;
pub use scoring::Summary;

use crate::config::ScoringConfig;
use crate::errors::NeuromarkError;
use crate::models::{AnalyzerKind, AnalyzerResult, DecodedImage, ObjectDetection, Payload};
use crate::services::Capability;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl From<&DecodedImage> for ImageInfo {
    fn from(image: &DecodedImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            channels: image.channels(),
        }
    }
}

/// The composite neuromarketing report for one image.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub image: ImageInfo,
    pub processing_time_ms: u64,
    pub kinds: Vec<AnalyzerKind>,
    pub sections: Report,
    pub summary: Summary,
}

pub struct NeuromarketingEngine {
    pipeline: AnalysisPipeline,
    scoring: ScoringConfig,
}

impl NeuromarketingEngine {
    pub fn new(pipeline: AnalysisPipeline, scoring: ScoringConfig) -> Self {
        Self { pipeline, scoring }
    }

    pub async fn analyze(
        &self,
        image: Arc<DecodedImage>,
        requested: &BTreeSet<AnalyzerKind>,
    ) -> AnalysisReport {
        let started = Instant::now();
        let info = ImageInfo::from(image.as_ref());

        let results = self.pipeline.run(image, requested).await;
        let kinds: Vec<AnalyzerKind> = results.keys().copied().collect();
        let sections = aggregator::normalize(results);
        let summary = scoring::summarize(&sections, &self.scoring);

        AnalysisReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            image: info,
            processing_time_ms: started.elapsed().as_millis() as u64,
            kinds,
            sections,
            summary,
        }
    }

    /// One normalized section, without the kinds a full run always adds.
    pub async fn analyze_one(&self, kind: AnalyzerKind, image: Arc<DecodedImage>) -> Section {
        Section::from(self.pipeline.run_one(kind, image).await)
    }

    /// Object detection alone. Unlike a report section, an unavailable or
    /// failed detector is an error here.
    pub async fn detect_objects(
        &self,
        image: Arc<DecodedImage>,
    ) -> Result<ObjectDetection, NeuromarkError> {
        match self.pipeline.run_one(AnalyzerKind::ObjectDetection, image).await {
            AnalyzerResult::Ok(Payload::Objects(detections)) => Ok(detections),
            AnalyzerResult::Ok(other) => Err(NeuromarkError::AnalyzerFailure(format!(
                "object detection returned a {} payload",
                other.kind()
            ))),
            AnalyzerResult::Unavailable(reason) => {
                Err(NeuromarkError::CapabilityUnavailable(reason))
            }
            AnalyzerResult::Failed(reason) => Err(NeuromarkError::AnalyzerFailure(reason)),
        }
    }

    /// Probes on first call, so calling this at startup front-loads model
    /// initialization.
    pub async fn capabilities(&self) -> BTreeMap<AnalyzerKind, Capability> {
        self.pipeline.registry().snapshot().await
    }

    /// Every run includes object detection and color analysis, so the
    /// service must not start without them.
    pub async fn ensure_required(&self) -> Result<(), NeuromarkError> {
        let registry = self.pipeline.registry();
        for kind in AnalyzerKind::REQUIRED {
            let capability = registry.capability(kind).await;
            if !capability.available {
                return Err(NeuromarkError::CapabilityUnavailable(format!(
                    "{} is required but unavailable: {}",
                    kind,
                    capability.reason.unwrap_or_default()
                )));
            }
        }
        Ok(())
    }
}
