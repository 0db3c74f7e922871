// src/services/analyzers/attention.rs
use super::{Analyzer, round_to, run_blocking};
use crate::config::AttentionConfig;
use crate::engine::scoring::{classify_thirds, nearest_third};
use crate::errors::NeuromarkError;
use crate::models::{
    AnalyzerKind, AttentionAnalysis, AttentionPoint, DecodedImage, FocusPoint, Payload,
    ThirdsAlignment,
};
use async_trait::async_trait;
use image::{DynamicImage, imageops::FilterType};
use imageproc::filter::{gaussian_blur_f32, laplacian_filter};
use std::sync::Arc;

const MAX_MAP_DIMENSION: u32 = 512;

/// Visual attention estimated from a blurred Laplacian saliency map.
pub struct AttentionAnalyzer {
    config: AttentionConfig,
    thirds_tolerance: f32,
}

impl AttentionAnalyzer {
    pub fn new(config: AttentionConfig, thirds_tolerance: f32) -> Self {
        Self {
            config,
            thirds_tolerance,
        }
    }
}

/// Saliency values in 0..255, row-major.
struct SaliencyMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl SaliencyMap {
    fn at(&self, x: u32, y: u32) -> f32 {
        self.values[(y * self.width + x) as usize]
    }
}

fn resize_if_large(img: &DynamicImage, max_dim: u32) -> DynamicImage {
    if img.width() > max_dim || img.height() > max_dim {
        img.resize(max_dim, max_dim, FilterType::Triangle)
    } else {
        img.clone()
    }
}

fn saliency_map(image: &DecodedImage, blur_sigma: f32) -> Option<SaliencyMap> {
    let gray = resize_if_large(image.as_dynamic(), MAX_MAP_DIMENSION).to_luma8();
    let blurred = gaussian_blur_f32(&gray, blur_sigma);
    let laplacian = laplacian_filter(&blurred);

    let magnitudes: Vec<f32> = laplacian.pixels().map(|p| (p[0] as f32).abs()).collect();
    let min = magnitudes.iter().copied().fold(f32::INFINITY, f32::min);
    let max = magnitudes.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if !range.is_finite() || range <= f32::EPSILON {
        return None;
    }

    Some(SaliencyMap {
        width: laplacian.width(),
        height: laplacian.height(),
        values: magnitudes
            .into_iter()
            .map(|v| (v - min) / range * 255.0)
            .collect(),
    })
}

fn empty_analysis() -> AttentionAnalysis {
    AttentionAnalysis {
        attention_score: 0.0,
        focus_center: FocusPoint {
            x: 0.0,
            y: 0.0,
            normalized_x: 0.0,
            normalized_y: 0.0,
        },
        rule_of_thirds_alignment: ThirdsAlignment::Unknown,
        primary_focus_zone: "unknown".to_string(),
        attention_points: Vec::new(),
    }
}

pub fn analyze_attention(
    image: &DecodedImage,
    config: &AttentionConfig,
    thirds_tolerance: f32,
) -> AttentionAnalysis {
    let Some(map) = saliency_map(image, config.blur_sigma) else {
        return empty_analysis();
    };

    let total: f64 = map.values.iter().map(|v| *v as f64).sum();
    if total <= 0.0 {
        return empty_analysis();
    }

    let (mut sum_x, mut sum_y) = (0.0f64, 0.0f64);
    for y in 0..map.height {
        for x in 0..map.width {
            let v = map.at(x, y) as f64;
            sum_x += x as f64 * v;
            sum_y += y as f64 * v;
        }
    }
    let normalized_x = (sum_x / total) as f32 / map.width as f32;
    let normalized_y = (sum_y / total) as f32 / map.height as f32;

    let alignment = classify_thirds(normalized_x, normalized_y, thirds_tolerance);
    let mean = total / map.values.len() as f64;

    AttentionAnalysis {
        attention_score: round_to((mean / 255.0) as f32, 3),
        focus_center: FocusPoint {
            x: round_to(normalized_x * image.width() as f32, 1),
            y: round_to(normalized_y * image.height() as f32, 1),
            normalized_x: round_to(normalized_x, 3),
            normalized_y: round_to(normalized_y, 3),
        },
        rule_of_thirds_alignment: alignment,
        primary_focus_zone: format!(
            "{}-{:.1}-{:.1}",
            alignment.as_str(),
            nearest_third(normalized_x),
            nearest_third(normalized_y)
        ),
        attention_points: attention_points(&map, image, config),
    }
}

/// Strongest map locations, each at least `suppression_radius` map pixels
/// away from every point already taken.
fn attention_points(
    map: &SaliencyMap,
    image: &DecodedImage,
    config: &AttentionConfig,
) -> Vec<AttentionPoint> {
    let mut order: Vec<usize> = (0..map.values.len())
        .filter(|&i| map.values[i] > 0.0)
        .collect();
    order.sort_by(|&a, &b| map.values[b].total_cmp(&map.values[a]).then(a.cmp(&b)));

    let radius_sq = (config.suppression_radius as i64).pow(2);
    let mut taken: Vec<(u32, u32)> = Vec::with_capacity(config.n_points);
    for index in order {
        if taken.len() >= config.n_points {
            break;
        }
        let (x, y) = (index as u32 % map.width, index as u32 / map.width);
        let suppressed = taken.iter().any(|&(tx, ty)| {
            let (dx, dy) = (tx as i64 - x as i64, ty as i64 - y as i64);
            dx * dx + dy * dy <= radius_sq
        });
        if !suppressed {
            taken.push((x, y));
        }
    }

    let scale_x = image.width() as f32 / map.width as f32;
    let scale_y = image.height() as f32 / map.height as f32;
    taken
        .into_iter()
        .map(|(x, y)| AttentionPoint {
            x: (x as f32 * scale_x) as u32,
            y: (y as f32 * scale_y) as u32,
            score: round_to(map.at(x, y) / 255.0, 3),
            normalized_x: round_to(x as f32 / map.width as f32, 3),
            normalized_y: round_to(y as f32 / map.height as f32, 3),
        })
        .collect()
}

#[async_trait]
impl Analyzer for AttentionAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Attention
    }

    async fn analyze(&self, image: Arc<DecodedImage>) -> Result<Payload, NeuromarkError> {
        let config = self.config.clone();
        let tolerance = self.thirds_tolerance;
        let analysis = run_blocking(self.kind(), move || {
            analyze_attention(&image, &config, tolerance)
        })
        .await?;
        Ok(Payload::Attention(analysis))
    }
}
