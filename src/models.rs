// src/models.rs
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A decoded, immutable image owned by one analysis request.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: DynamicImage,
    width: u32,
    height: u32,
    channels: u8,
}

impl DecodedImage {
    pub fn new(image: DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let channels = image.color().channel_count();
        Self {
            image,
            width,
            height,
            channels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn area(&self) -> f32 {
        self.width as f32 * self.height as f32
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalyzerKind {
    ObjectDetection,
    Ocr,
    ColorAnalysis,
    Caption,
    Emotion,
    Attention,
    Cta,
}

impl AnalyzerKind {
    pub const ALL: [AnalyzerKind; 7] = [
        AnalyzerKind::ObjectDetection,
        AnalyzerKind::Ocr,
        AnalyzerKind::ColorAnalysis,
        AnalyzerKind::Caption,
        AnalyzerKind::Emotion,
        AnalyzerKind::Attention,
        AnalyzerKind::Cta,
    ];

    /// Kinds that take part in every run because the summary depends on them.
    pub const REQUIRED: [AnalyzerKind; 2] =
        [AnalyzerKind::ObjectDetection, AnalyzerKind::ColorAnalysis];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerKind::ObjectDetection => "object-detection",
            AnalyzerKind::Ocr => "ocr",
            AnalyzerKind::ColorAnalysis => "color-analysis",
            AnalyzerKind::Caption => "caption",
            AnalyzerKind::Emotion => "emotion",
            AnalyzerKind::Attention => "attention",
            AnalyzerKind::Cta => "cta",
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalyzerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        AnalyzerKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown analyzer kind '{}'", s.trim()))
    }
}

/// Axis-aligned box in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl BoundingBox {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin: xmin.min(xmax),
            ymin: ymin.min(ymax),
            xmax: xmin.max(xmax),
            ymax: ymin.max(ymax),
        }
    }

    /// Smallest box enclosing all points, e.g. an OCR quadrilateral.
    pub fn enclosing(points: &[[f32; 2]]) -> Option<Self> {
        let first = points.first()?;
        let init = Self::new(first[0], first[1], first[0], first[1]);
        Some(points.iter().fold(init, |acc, [x, y]| Self {
            xmin: acc.xmin.min(*x),
            ymin: acc.ymin.min(*y),
            xmax: acc.xmax.max(*x),
            ymax: acc.ymax.max(*y),
        }))
    }

    pub fn from_region(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.xmin + self.xmax) / 2.0,
            (self.ymin + self.ymax) / 2.0,
        )
    }

    pub fn clamped(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            xmin: self.xmin.clamp(0.0, w),
            ymin: self.ymin.clamp(0.0, h),
            xmax: self.xmax.clamp(0.0, w),
            ymax: self.ymax.clamp(0.0, h),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub name: String,
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetection {
    pub objects: Vec<Detection>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    pub text: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextExtraction {
    pub full_text: String,
    pub segments: Vec<TextSegment>,
    pub total_segments: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorEmotion {
    Dark,
    Light,
    Neutral,
    WarmEnergetic,
    Cheerful,
    Fresh,
    Calm,
    Trustworthy,
    Creative,
}

impl ColorEmotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorEmotion::Dark => "dark",
            ColorEmotion::Light => "light",
            ColorEmotion::Neutral => "neutral",
            ColorEmotion::WarmEnergetic => "warm-energetic",
            ColorEmotion::Cheerful => "cheerful",
            ColorEmotion::Fresh => "fresh",
            ColorEmotion::Calm => "calm",
            ColorEmotion::Trustworthy => "trustworthy",
            ColorEmotion::Creative => "creative",
        }
    }
}

impl fmt::Display for ColorEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsv {
    /// Degrees, 0..360.
    pub h: f32,
    /// Percent, 0..100.
    pub s: f32,
    /// Percent, 0..100.
    pub v: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominantColor {
    pub rgb: [u8; 3],
    pub hex: String,
    /// Share of sampled pixels, 0..100.
    pub percentage: f32,
    pub hsv: Hsv,
    pub emotion_tag: ColorEmotion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorAnalysis {
    pub dominant_colors: Vec<DominantColor>,
    pub average_contrast: f32,
    pub emotion_palette: ColorEmotion,
    pub color_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub caption: String,
    pub confidence: f32,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEmotion {
    pub face_id: usize,
    pub emotions: BTreeMap<String, f32>,
    pub dominant_emotion: String,
    pub dominant_confidence: f32,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionAnalysis {
    pub faces_detected: usize,
    pub faces: Vec<FaceEmotion>,
    pub scene_emotion: String,
    pub average_confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusPoint {
    pub x: f32,
    pub y: f32,
    pub normalized_x: f32,
    pub normalized_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttentionPoint {
    pub x: u32,
    pub y: u32,
    pub score: f32,
    pub normalized_x: f32,
    pub normalized_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThirdsAlignment {
    Aligned,
    CenterBiased,
    OffGrid,
    Unknown,
}

impl ThirdsAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThirdsAlignment::Aligned => "aligned",
            ThirdsAlignment::CenterBiased => "center-biased",
            ThirdsAlignment::OffGrid => "off-grid",
            ThirdsAlignment::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionAnalysis {
    pub attention_score: f32,
    pub focus_center: FocusPoint,
    pub rule_of_thirds_alignment: ThirdsAlignment,
    pub primary_focus_zone: String,
    pub attention_points: Vec<AttentionPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtaElement {
    pub text: String,
    pub keywords: Vec<String>,
    pub bbox: BoundingBox,
    pub position: FocusPoint,
    pub is_strategic_position: bool,
    /// Text area as percent of the image area.
    pub relative_size: f32,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtaDetection {
    pub cta_present: bool,
    pub cta_count: usize,
    pub elements: Vec<CtaElement>,
    pub effectiveness_score: f32,
}

/// Successful output of one analyzer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Objects(ObjectDetection),
    Text(TextExtraction),
    Colors(ColorAnalysis),
    Caption(Caption),
    Emotion(EmotionAnalysis),
    Attention(AttentionAnalysis),
    Cta(CtaDetection),
}

impl Payload {
    pub fn kind(&self) -> AnalyzerKind {
        match self {
            Payload::Objects(_) => AnalyzerKind::ObjectDetection,
            Payload::Text(_) => AnalyzerKind::Ocr,
            Payload::Colors(_) => AnalyzerKind::ColorAnalysis,
            Payload::Caption(_) => AnalyzerKind::Caption,
            Payload::Emotion(_) => AnalyzerKind::Emotion,
            Payload::Attention(_) => AnalyzerKind::Attention,
            Payload::Cta(_) => AnalyzerKind::Cta,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzerResult {
    Ok(Payload),
    Unavailable(String),
    Failed(String),
}

impl AnalyzerResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, AnalyzerResult::Ok(_))
    }
}
