// src/services/image_processor.rs
use crate::config::ImageConfig;
use crate::errors::NeuromarkError;
use crate::models::{DecodedImage, Detection};
use ab_glyph::FontArc;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat as ImgFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use log::warn;
use std::path::Path;

const JPEG_QUALITY: u8 = 85;
const BOX_THICKNESS: u32 = 3;
const LABEL_SCALE: f32 = 16.0;
const LABEL_PADDING: u32 = 2;
const LABEL_TEXT: Rgb<u8> = Rgb([255, 255, 255]);

// Per-class overlay colors, indexed by class id.
const PALETTE: [[u8; 3]; 20] = [
    [0xFF, 0x38, 0x38],
    [0xFF, 0x9D, 0x97],
    [0xFF, 0x70, 0x1F],
    [0xFF, 0xB2, 0x1D],
    [0xCF, 0xD2, 0x31],
    [0x48, 0xF9, 0x0A],
    [0x92, 0xCC, 0x17],
    [0x3D, 0xDB, 0x86],
    [0x1A, 0x93, 0x34],
    [0x00, 0xD4, 0xBB],
    [0x2C, 0x99, 0xA8],
    [0x00, 0xC2, 0xFF],
    [0x34, 0x45, 0x93],
    [0x64, 0x73, 0xFF],
    [0x00, 0x18, 0xEC],
    [0x84, 0x38, 0xFF],
    [0x52, 0x00, 0x85],
    [0xCB, 0x38, 0xFF],
    [0xFF, 0x95, 0xC8],
    [0xFF, 0x37, 0xC7],
];

pub struct ImageProcessor {
    max_dimension: u32,
    font: Option<FontArc>,
}

impl ImageProcessor {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension,
            font: None,
        }
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    pub fn from_config(config: &ImageConfig) -> Self {
        let processor = Self::new(config.max_dimension);
        match config.label_font.as_deref().map(load_font) {
            Some(Ok(font)) => processor.with_font(font),
            Some(Err(e)) => {
                warn!("Detection labels disabled: {}", e);
                processor
            }
            None => processor,
        }
    }

    /// Decode raw upload bytes into an RGB image.
    pub fn decode(&self, data: &[u8]) -> Result<DecodedImage, NeuromarkError> {
        if data.is_empty() {
            return Err(NeuromarkError::MalformedImage("empty upload".to_string()));
        }

        let img = image::load_from_memory(data)
            .map_err(|e| NeuromarkError::MalformedImage(format!("Invalid image format: {}", e)))?;

        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(NeuromarkError::MalformedImage(
                "image has no pixels".to_string(),
            ));
        }

        if width > self.max_dimension || height > self.max_dimension {
            return Err(NeuromarkError::Validation(format!(
                "Image dimensions exceed {}x{}",
                self.max_dimension, self.max_dimension
            )));
        }

        Ok(DecodedImage::new(DynamicImage::ImageRgb8(img.to_rgb8())))
    }

    pub fn encode_jpeg(&self, image: &RgbImage) -> Result<Vec<u8>, NeuromarkError> {
        let mut output = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY);
        image.write_with_encoder(encoder).map_err(|e| {
            NeuromarkError::ImageProcessing(format!("Failed to encode annotated image: {}", e))
        })?;
        Ok(output)
    }

    /// Draw one box outline per detection, left to right, each labelled
    /// `"<name>: <percent>%"` when a font is loaded.
    pub fn annotate(&self, image: &DecodedImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = image.as_dynamic().to_rgb8();
        let (width, height) = canvas.dimensions();

        let mut ordered: Vec<&Detection> = detections.iter().collect();
        ordered.sort_by(|a, b| a.bbox.xmin.total_cmp(&b.bbox.xmin));

        for detection in ordered {
            let bbox = detection.bbox.clamped(width, height);
            let color = Rgb(PALETTE[detection.class_id as usize % PALETTE.len()]);

            for inset in 0..BOX_THICKNESS {
                let x = bbox.xmin as i32 + inset as i32;
                let y = bbox.ymin as i32 + inset as i32;
                let w = (bbox.width() as u32).saturating_sub(2 * inset);
                let h = (bbox.height() as u32).saturating_sub(2 * inset);
                if w == 0 || h == 0 {
                    break;
                }
                draw_hollow_rect_mut(&mut canvas, Rect::at(x, y).of_size(w, h), color);
            }

            if let Some(font) = &self.font {
                let label = format!(
                    "{}: {}%",
                    detection.name,
                    (detection.confidence * 100.0) as u32
                );
                let (x, top) = (bbox.xmin as i32, bbox.ymin as i32);
                draw_label(&mut canvas, font, &label, x, top, color);
            }
        }

        canvas
    }
}

/// Filled tag in the box color with white text, above the box when it fits
/// and inside its top edge otherwise.
fn draw_label(
    canvas: &mut RgbImage,
    font: &FontArc,
    label: &str,
    x: i32,
    top: i32,
    color: Rgb<u8>,
) {
    let (text_w, text_h) = text_size(LABEL_SCALE, font, label);
    let tag_w = text_w + 2 * LABEL_PADDING;
    let tag_h = text_h + 2 * LABEL_PADDING;

    let y = if top >= tag_h as i32 {
        top - tag_h as i32
    } else {
        top
    };

    let tag = Rect::at(x, y).of_size(tag_w, tag_h);
    draw_filled_rect_mut(canvas, tag, color);
    draw_text_mut(
        canvas,
        LABEL_TEXT,
        x + LABEL_PADDING as i32,
        y + LABEL_PADDING as i32,
        LABEL_SCALE,
        font,
        label,
    );
}

pub fn load_font(path: &str) -> Result<FontArc, NeuromarkError> {
    let data = std::fs::read(Path::new(path)).map_err(|e| {
        NeuromarkError::ImageProcessing(format!("Failed to read font {}: {}", path, e))
    })?;
    FontArc::try_from_vec(data)
        .map_err(|e| NeuromarkError::ImageProcessing(format!("Invalid font {}: {}", path, e)))
}

/// PNG bytes of a decoded image, as shipped to the model servers.
pub fn encode_png(image: &DecodedImage) -> Result<Vec<u8>, NeuromarkError> {
    let mut output = Vec::new();
    image
        .as_dynamic()
        .write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Png)
        .map_err(|e| NeuromarkError::ImageProcessing(format!("Failed to encode image: {}", e)))?;
    Ok(output)
}
