// src/services/analyzers/color.rs
use super::{Analyzer, round_to, run_blocking};
use crate::config::ColorConfig;
use crate::errors::NeuromarkError;
use crate::models::{
    AnalyzerKind, ColorAnalysis, ColorEmotion, DecodedImage, DominantColor, Hsv, Payload,
};
use async_trait::async_trait;
use image::imageops::FilterType;
use std::collections::HashMap;
use std::sync::Arc;

// Colors below this share (percent) do not vote for the emotion palette.
const PALETTE_MIN_PERCENTAGE: f32 = 10.0;

/// Dominant colors, their emotional tags and the contrast between them.
/// Pure pixel statistics, so this capability is always available.
pub struct ColorAnalyzer {
    config: ColorConfig,
}

impl ColorAnalyzer {
    pub fn new(config: ColorConfig) -> Self {
        Self { config }
    }
}

pub fn analyze_colors(image: &DecodedImage, config: &ColorConfig) -> ColorAnalysis {
    let dominant_colors = dominant_colors(image, config);

    let contrasts: Vec<f32> = dominant_colors
        .windows(2)
        .map(|pair| contrast_ratio(pair[0].rgb, pair[1].rgb))
        .collect();
    let average_contrast = if contrasts.is_empty() {
        0.0
    } else {
        round_to(contrasts.iter().sum::<f32>() / contrasts.len() as f32, 2)
    };

    ColorAnalysis {
        emotion_palette: emotion_palette(&dominant_colors),
        color_count: dominant_colors.len(),
        average_contrast,
        dominant_colors,
    }
}

fn dominant_colors(image: &DecodedImage, config: &ColorConfig) -> Vec<DominantColor> {
    let sample = image
        .as_dynamic()
        .resize_exact(config.sample_size, config.sample_size, FilterType::Triangle)
        .to_rgb8();

    let step = config.quantization_step;
    let mut color_counts: HashMap<[u8; 3], u32> = HashMap::new();
    for px in sample.pixels() {
        let key = [
            (px[0] / step) * step,
            (px[1] / step) * step,
            (px[2] / step) * step,
        ];
        *color_counts.entry(key).or_insert(0) += 1;
    }

    let total = (sample.width() * sample.height()) as f32;
    let mut sorted: Vec<([u8; 3], u32)> = color_counts.into_iter().collect();
    sorted.sort_by(|(rgb_a, a), (rgb_b, b)| b.cmp(a).then_with(|| rgb_a.cmp(rgb_b)));

    sorted
        .into_iter()
        .take(config.n_colors)
        .map(|(rgb, count)| {
            let (h, s, v) = rgb_to_hsv(rgb);
            DominantColor {
                rgb,
                hex: format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2]),
                percentage: round_to(count as f32 / total * 100.0, 2),
                hsv: Hsv {
                    h: round_to(h * 360.0, 1),
                    s: round_to(s * 100.0, 1),
                    v: round_to(v * 100.0, 1),
                },
                emotion_tag: classify_color_emotion(h, s, v),
            }
        })
        .collect()
}

/// Most frequent tag among colors above the palette threshold; ties go to
/// the tag seen first, i.e. the more dominant one.
fn emotion_palette(colors: &[DominantColor]) -> ColorEmotion {
    let mut tally: Vec<(ColorEmotion, usize)> = Vec::new();
    for color in colors
        .iter()
        .filter(|c| c.percentage > PALETTE_MIN_PERCENTAGE)
    {
        match tally.iter_mut().find(|(tag, _)| *tag == color.emotion_tag) {
            Some((_, count)) => *count += 1,
            None => tally.push((color.emotion_tag, 1)),
        }
    }

    tally
        .into_iter()
        .fold(None::<(ColorEmotion, usize)>, |best, (tag, count)| match best {
            Some((_, c)) if c >= count => best,
            _ => Some((tag, count)),
        })
        .map(|(tag, _)| tag)
        .unwrap_or(ColorEmotion::Neutral)
}

/// HSV with every component in 0..1.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> (f32, f32, f32) {
    let r = rgb[0] as f32 / 255.0;
    let g = rgb[1] as f32 / 255.0;
    let b = rgb[2] as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max == 0.0 { 0.0 } else { delta / max };
    if delta == 0.0 {
        return (0.0, s, v);
    }

    let h = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    (h / 6.0, s, v)
}

pub fn classify_color_emotion(h: f32, s: f32, v: f32) -> ColorEmotion {
    let h_deg = h * 360.0;

    if v < 0.3 {
        ColorEmotion::Dark
    } else if v > 0.8 && s < 0.3 {
        ColorEmotion::Light
    } else if s < 0.3 {
        ColorEmotion::Neutral
    } else if !(30.0..330.0).contains(&h_deg) {
        ColorEmotion::WarmEnergetic
    } else if h_deg < 90.0 {
        ColorEmotion::Cheerful
    } else if h_deg < 150.0 {
        ColorEmotion::Fresh
    } else if h_deg < 210.0 {
        ColorEmotion::Calm
    } else if h_deg < 270.0 {
        ColorEmotion::Trustworthy
    } else {
        ColorEmotion::Creative
    }
}

fn relative_luminance(rgb: [u8; 3]) -> f32 {
    let adjust = |c: u8| {
        let c = c as f32 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * adjust(rgb[0]) + 0.7152 * adjust(rgb[1]) + 0.0722 * adjust(rgb[2])
}

/// WCAG contrast ratio, 1..21.
pub fn contrast_ratio(a: [u8; 3], b: [u8; 3]) -> f32 {
    let (l1, l2) = (relative_luminance(a), relative_luminance(b));
    let (lighter, darker) = if l1 >= l2 { (l1, l2) } else { (l2, l1) };
    round_to((lighter + 0.05) / (darker + 0.05), 2)
}

#[async_trait]
impl Analyzer for ColorAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::ColorAnalysis
    }

    async fn analyze(&self, image: Arc<DecodedImage>) -> Result<Payload, NeuromarkError> {
        let config = self.config.clone();
        let analysis = run_blocking(self.kind(), move || analyze_colors(&image, &config)).await?;
        Ok(Payload::Colors(analysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DecodedImage {
        DecodedImage::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb(rgb),
        )))
    }

    #[test]
    fn solid_image_has_single_dominant_color() {
        let analysis = analyze_colors(&solid(64, 64, [255, 100, 50]), &ColorConfig::default());

        assert_eq!(analysis.color_count, 1);
        let color = &analysis.dominant_colors[0];
        assert_eq!(color.rgb, [224, 96, 32]);
        assert_eq!(color.hex, "#E06020");
        assert_eq!(color.percentage, 100.0);
        assert_eq!(color.emotion_tag, ColorEmotion::WarmEnergetic);
        assert_eq!(analysis.emotion_palette, ColorEmotion::WarmEnergetic);
        assert_eq!(analysis.average_contrast, 0.0);
    }

    #[test]
    fn split_image_orders_colors_by_share() {
        let mut img = RgbImage::from_pixel(100, 100, Rgb([0, 0, 255]));
        for y in 0..100 {
            for x in 0..25 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let analysis = analyze_colors(
            &DecodedImage::new(DynamicImage::ImageRgb8(img)),
            &ColorConfig::default(),
        );

        let first = &analysis.dominant_colors[0];
        assert_eq!(first.rgb, [0, 0, 224]);
        assert!(first.percentage > 60.0);
        assert_eq!(first.emotion_tag, ColorEmotion::Trustworthy);
        assert!(analysis.average_contrast > 1.0);
        assert!(
            analysis
                .dominant_colors
                .iter()
                .all(|c| c.hex.starts_with('#') && c.hex.len() == 7)
        );
        let total: f32 = analysis.dominant_colors.iter().map(|c| c.percentage).sum();
        assert!(total <= 100.01);
    }

    #[test]
    fn hex_is_uppercase() {
        let analysis = analyze_colors(&solid(8, 8, [171, 205, 239]), &ColorConfig::default());
        let hex = &analysis.dominant_colors[0].hex;
        assert_eq!(hex, &hex.to_uppercase());
    }

    #[test]
    fn classifies_hue_bands() {
        assert_eq!(classify_color_emotion(0.0, 0.0, 0.1), ColorEmotion::Dark);
        assert_eq!(classify_color_emotion(0.0, 0.1, 0.9), ColorEmotion::Light);
        assert_eq!(classify_color_emotion(0.5, 0.1, 0.5), ColorEmotion::Neutral);
        assert_eq!(classify_color_emotion(0.95, 0.8, 0.8), ColorEmotion::WarmEnergetic);
        assert_eq!(classify_color_emotion(60.0 / 360.0, 0.8, 0.8), ColorEmotion::Cheerful);
        assert_eq!(classify_color_emotion(120.0 / 360.0, 0.8, 0.8), ColorEmotion::Fresh);
        assert_eq!(classify_color_emotion(180.0 / 360.0, 0.8, 0.8), ColorEmotion::Calm);
        assert_eq!(classify_color_emotion(240.0 / 360.0, 0.8, 0.8), ColorEmotion::Trustworthy);
        assert_eq!(classify_color_emotion(300.0 / 360.0, 0.8, 0.8), ColorEmotion::Creative);
    }

    #[test]
    fn hsv_of_primary_colors() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), (0.0, 1.0, 1.0));
        let (h, s, v) = rgb_to_hsv([0, 0, 255]);
        assert!((h * 360.0 - 240.0).abs() < 1e-3);
        assert_eq!((s, v), (1.0, 1.0));
        assert_eq!(rgb_to_hsv([0, 0, 0]), (0.0, 0.0, 0.0));
    }

    #[test]
    fn black_on_white_has_maximum_contrast() {
        assert_eq!(contrast_ratio([0, 0, 0], [255, 255, 255]), 21.0);
        assert_eq!(contrast_ratio([90, 90, 90], [90, 90, 90]), 1.0);
    }
}
