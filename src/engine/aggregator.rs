// src/engine/aggregator.rs
use crate::models::{
    AnalyzerKind, AnalyzerResult, AttentionAnalysis, Caption, ColorAnalysis, CtaDetection,
    EmotionAnalysis, ObjectDetection, Payload, TextExtraction,
};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderStatus {
    Unavailable,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SectionBody {
    Payload(Payload),
    Placeholder {
        status: PlaceholderStatus,
        reason: String,
    },
}

/// One normalized report entry. Serializes as the payload fields, or as
/// `{status, reason}` for a placeholder, next to `available`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub available: bool,
    #[serde(flatten)]
    pub body: SectionBody,
}

impl Section {
    pub fn payload(&self) -> Option<&Payload> {
        match &self.body {
            SectionBody::Payload(payload) => Some(payload),
            SectionBody::Placeholder { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.body {
            SectionBody::Payload(_) => None,
            SectionBody::Placeholder { reason, .. } => Some(reason),
        }
    }
}

impl From<AnalyzerResult> for Section {
    fn from(result: AnalyzerResult) -> Self {
        let placeholder = |status, reason| Section {
            available: false,
            body: SectionBody::Placeholder { status, reason },
        };
        match result {
            AnalyzerResult::Ok(payload) => Section {
                available: true,
                body: SectionBody::Payload(payload),
            },
            AnalyzerResult::Unavailable(reason) => {
                placeholder(PlaceholderStatus::Unavailable, reason)
            }
            AnalyzerResult::Failed(reason) => placeholder(PlaceholderStatus::Failed, reason),
        }
    }
}

/// Normalized sections keyed by analyzer kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Report {
    sections: BTreeMap<AnalyzerKind, Section>,
}

macro_rules! section_accessor {
    ($name:ident, $kind:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&self) -> Option<&$ty> {
            match self.section(AnalyzerKind::$kind)?.payload()? {
                Payload::$variant(inner) => Some(inner),
                _ => None,
            }
        }
    };
}

impl Report {
    pub fn section(&self, kind: AnalyzerKind) -> Option<&Section> {
        self.sections.get(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = AnalyzerKind> + '_ {
        self.sections.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn into_sections(self) -> BTreeMap<AnalyzerKind, Section> {
        self.sections
    }

    section_accessor!(objects, ObjectDetection, Objects, ObjectDetection);
    section_accessor!(text, Ocr, Text, TextExtraction);
    section_accessor!(colors, ColorAnalysis, Colors, ColorAnalysis);
    section_accessor!(caption, Caption, Caption, Caption);
    section_accessor!(emotion, Emotion, Emotion, EmotionAnalysis);
    section_accessor!(attention, Attention, Attention, AttentionAnalysis);
    section_accessor!(cta, Cta, Cta, CtaDetection);
}

/// Turn pipeline results into report sections. Every input entry yields
/// exactly one section.
pub fn normalize(results: BTreeMap<AnalyzerKind, AnalyzerResult>) -> Report {
    Report {
        sections: results
            .into_iter()
            .map(|(kind, result)| (kind, Section::from(result)))
            .collect(),
    }
}
