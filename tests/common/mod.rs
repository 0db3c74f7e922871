//! Fake analyzers and image helpers shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use neuromark::errors::NeuromarkError;
use neuromark::models::*;
use neuromark::services::analyzers::{Analyzer, ColorAnalyzer};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

pub enum Behavior {
    Return(Payload),
    Fail(String),
    Panic,
    Hang,
    /// The probe fails, so the pipeline must never call `analyze`.
    Unavailable(String),
}

pub struct FakeAnalyzer {
    kind: AnalyzerKind,
    behavior: Behavior,
}

impl FakeAnalyzer {
    pub fn new(kind: AnalyzerKind, behavior: Behavior) -> Arc<dyn Analyzer> {
        Arc::new(Self { kind, behavior })
    }

    pub fn ok(kind: AnalyzerKind) -> Arc<dyn Analyzer> {
        Self::new(kind, Behavior::Return(sample_payload(kind)))
    }
}

#[async_trait]
impl Analyzer for FakeAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        self.kind
    }

    async fn probe(&self) -> Result<(), String> {
        match &self.behavior {
            Behavior::Unavailable(reason) => Err(reason.clone()),
            _ => Ok(()),
        }
    }

    async fn analyze(&self, _image: Arc<DecodedImage>) -> Result<Payload, NeuromarkError> {
        match &self.behavior {
            Behavior::Return(payload) => Ok(payload.clone()),
            Behavior::Fail(reason) => Err(NeuromarkError::Inference(reason.clone())),
            Behavior::Panic => panic!("model crashed"),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(sample_payload(self.kind))
            }
            Behavior::Unavailable(_) => unreachable!("unavailable analyzers are never invoked"),
        }
    }
}

/// A plausible payload for each kind.
pub fn sample_payload(kind: AnalyzerKind) -> Payload {
    let bbox = BoundingBox::new(50.0, 400.0, 250.0, 450.0);
    match kind {
        AnalyzerKind::ObjectDetection => Payload::Objects(ObjectDetection {
            objects: vec![
                Detection {
                    name: "car".to_string(),
                    class_id: 2,
                    confidence: 0.75,
                    bbox: BoundingBox::new(10.0, 20.0, 120.0, 90.0),
                },
                Detection {
                    name: "person".to_string(),
                    class_id: 0,
                    confidence: 0.5,
                    bbox: BoundingBox::new(150.0, 100.0, 250.0, 300.0),
                },
            ],
            count: 2,
        }),
        AnalyzerKind::Ocr => Payload::Text(TextExtraction {
            full_text: "Compre agora".to_string(),
            segments: vec![TextSegment {
                text: "Compre agora".to_string(),
                confidence: 0.875,
                bbox,
            }],
            total_segments: 1,
        }),
        AnalyzerKind::ColorAnalysis => Payload::Colors(ColorAnalysis {
            dominant_colors: vec![DominantColor {
                rgb: [224, 96, 32],
                hex: "#E06020".to_string(),
                percentage: 100.0,
                hsv: Hsv {
                    h: 20.0,
                    s: 85.7,
                    v: 87.8,
                },
                emotion_tag: ColorEmotion::WarmEnergetic,
            }],
            average_contrast: 0.0,
            emotion_palette: ColorEmotion::WarmEnergetic,
            color_count: 1,
        }),
        AnalyzerKind::Caption => Payload::Caption(Caption {
            caption: "a person standing next to a car".to_string(),
            confidence: 0.5,
            word_count: 7,
        }),
        AnalyzerKind::Emotion => Payload::Emotion(EmotionAnalysis {
            faces_detected: 1,
            faces: vec![FaceEmotion {
                face_id: 1,
                emotions: [("happy".to_string(), 90.0), ("sad".to_string(), 10.0)]
                    .into_iter()
                    .collect(),
                dominant_emotion: "happy".to_string(),
                dominant_confidence: 0.875,
                bbox: BoundingBox::new(160.0, 110.0, 200.0, 150.0),
            }],
            scene_emotion: "happy".to_string(),
            average_confidence: 0.875,
        }),
        AnalyzerKind::Attention => Payload::Attention(AttentionAnalysis {
            attention_score: 0.25,
            focus_center: FocusPoint {
                x: 100.0,
                y: 166.5,
                normalized_x: 0.333,
                normalized_y: 0.333,
            },
            rule_of_thirds_alignment: ThirdsAlignment::Aligned,
            primary_focus_zone: "aligned-0.3-0.3".to_string(),
            attention_points: Vec::new(),
        }),
        AnalyzerKind::Cta => Payload::Cta(CtaDetection {
            cta_present: true,
            cta_count: 1,
            elements: Vec::new(),
            effectiveness_score: 0.75,
        }),
    }
}

/// Fakes for every kind, with per-kind overrides.
pub fn analyzers_with(
    overrides: Vec<(AnalyzerKind, Behavior)>,
) -> Vec<Arc<dyn Analyzer>> {
    let mut overrides = overrides;
    AnalyzerKind::ALL
        .into_iter()
        .map(|kind| match overrides.iter().position(|(k, _)| *k == kind) {
            Some(i) => FakeAnalyzer::new(kind, overrides.remove(i).1),
            None => FakeAnalyzer::ok(kind),
        })
        .collect()
}

/// Same as [`analyzers_with`] but with the real local color analyzer.
pub fn analyzers_with_real_color(
    overrides: Vec<(AnalyzerKind, Behavior)>,
) -> Vec<Arc<dyn Analyzer>> {
    analyzers_with(overrides)
        .into_iter()
        .map(|a| {
            if a.kind() == AnalyzerKind::ColorAnalysis {
                Arc::new(ColorAnalyzer::new(Default::default())) as Arc<dyn Analyzer>
            } else {
                a
            }
        })
        .collect()
}

pub fn test_image(width: u32, height: u32) -> Arc<DecodedImage> {
    Arc::new(DecodedImage::new(DynamicImage::ImageRgb8(
        RgbImage::from_pixel(width, height, Rgb([255, 100, 50])),
    )))
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([255, 100, 50]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}
