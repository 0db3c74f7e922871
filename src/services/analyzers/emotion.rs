// src/services/analyzers/emotion.rs
use super::{Analyzer, RemoteModel, round_to};
use crate::errors::NeuromarkError;
use crate::models::{AnalyzerKind, BoundingBox, DecodedImage, EmotionAnalysis, FaceEmotion, Payload};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const NEUTRAL_SCENE: &str = "neutral";

#[derive(Debug, Deserialize)]
pub struct RawEmotions {
    #[serde(default)]
    pub faces: Vec<RawFace>,
}

#[derive(Debug, Deserialize)]
pub struct RawFace {
    /// Label to score, in percent.
    pub emotion: BTreeMap<String, f32>,
    #[serde(default)]
    pub region: RawRegion,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawRegion {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

pub struct EmotionAnalyzer {
    model: RemoteModel,
}

impl EmotionAnalyzer {
    pub fn new(model: RemoteModel) -> Self {
        Self { model }
    }
}

pub fn to_emotion_analysis(raw: RawEmotions) -> EmotionAnalysis {
    let faces: Vec<FaceEmotion> = raw
        .faces
        .into_iter()
        .filter_map(face_emotion)
        .enumerate()
        .map(|(i, mut face)| {
            face.face_id = i + 1;
            face
        })
        .collect();

    let scene_emotion = scene_emotion(&faces);
    let average_confidence = if faces.is_empty() {
        0.0
    } else {
        round_to(
            faces.iter().map(|f| f.dominant_confidence).sum::<f32>() / faces.len() as f32,
            3,
        )
    };

    EmotionAnalysis {
        faces_detected: faces.len(),
        faces,
        scene_emotion,
        average_confidence,
    }
}

fn face_emotion(face: RawFace) -> Option<FaceEmotion> {
    // Alphabetical iteration, so ties resolve to the first label.
    let (label, score) = face
        .emotion
        .iter()
        .fold(None::<(&String, f32)>, |best, (label, score)| match best {
            Some((_, s)) if s >= *score => best,
            _ => Some((label, *score)),
        })?;
    let dominant_emotion = label.clone();
    let region = &face.region;

    Some(FaceEmotion {
        face_id: 0,
        dominant_emotion,
        dominant_confidence: round_to((score / 100.0).clamp(0.0, 1.0), 3),
        bbox: BoundingBox::from_region(region.x, region.y, region.w, region.h),
        emotions: face.emotion,
    })
}

/// Most frequent dominant emotion across faces. Ties go to the label with the
/// higher summed confidence, then alphabetically.
fn scene_emotion(faces: &[FaceEmotion]) -> String {
    let mut tally: BTreeMap<&str, (usize, f32)> = BTreeMap::new();
    for face in faces {
        let entry = tally.entry(face.dominant_emotion.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += face.dominant_confidence;
    }

    tally
        .into_iter()
        .fold(None::<(&str, usize, f32)>, |best, (label, (count, conf))| match best {
            Some((_, c, s)) if c > count || (c == count && s >= conf) => best,
            _ => Some((label, count, conf)),
        })
        .map(|(label, _, _)| label.to_string())
        .unwrap_or_else(|| NEUTRAL_SCENE.to_string())
}

#[async_trait]
impl Analyzer for EmotionAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Emotion
    }

    async fn probe(&self) -> Result<(), String> {
        self.model.probe().await
    }

    async fn analyze(&self, image: Arc<DecodedImage>) -> Result<Payload, NeuromarkError> {
        let raw: RawEmotions = self
            .model
            .infer(&image, &json!({ "actions": ["emotion"] }))
            .await?;
        Ok(Payload::Emotion(to_emotion_analysis(raw)))
    }
}
