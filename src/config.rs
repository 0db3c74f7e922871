// src/config.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Service settings, layered from built-in defaults, optional files under
/// `config/` and `NEUROMARK__`-prefixed environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub image: ImageConfig,
    pub detection: DetectionConfig,
    pub models: ModelsConfig,
    pub pipeline: PipelineConfig,
    pub color: ColorConfig,
    pub attention: AttentionConfig,
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub max_dimension: u32,
    pub max_upload_bytes: usize,
    /// TrueType font for detection labels. Boxes are drawn without labels
    /// when it cannot be loaded.
    pub label_font: Option<String>,
}

pub const DEFAULT_LABEL_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_dimension: 4096,
            max_upload_bytes: 10 * 1024 * 1024,
            label_font: Some(DEFAULT_LABEL_FONT.to_string()),
        }
    }
}

/// Passed through to the object-detection model as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub confidence_threshold: f32,
    pub image_size: u32,
    pub augment: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            image_size: 640,
            augment: false,
        }
    }
}

/// Base URLs of the model servers. A missing URL leaves that capability
/// unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub detection_url: Option<String>,
    pub ocr_url: Option<String>,
    pub caption_url: Option<String>,
    pub emotion_url: Option<String>,
    pub caption_max_length: u32,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            detection_url: None,
            ocr_url: None,
            caption_url: None,
            emotion_url: None,
            caption_max_length: 50,
            request_timeout_secs: 30,
            connect_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub analyzer_timeout_ms: u64,
}

impl PipelineConfig {
    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_millis(self.analyzer_timeout_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            analyzer_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub n_colors: usize,
    pub quantization_step: u8,
    pub sample_size: u32,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            n_colors: 5,
            quantization_step: 32,
            sample_size: 150,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    pub n_points: usize,
    pub blur_sigma: f32,
    pub suppression_radius: u32,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            n_points: 5,
            blur_sigma: 2.0,
            suppression_radius: 10,
        }
    }
}

/// Weights and thresholds used by the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub cta_position_weight: f32,
    pub cta_size_weight: f32,
    pub cta_keyword_weight: f32,
    /// Relative CTA area, in percent of the image, that earns the full size score.
    pub cta_target_relative_size: f32,
    /// Number of matched keywords that earns the full keyword score.
    pub cta_keyword_saturation: usize,
    pub cta_effectiveness_threshold: f32,
    pub thirds_tolerance: f32,
    pub contrast_threshold: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            cta_position_weight: 0.4,
            cta_size_weight: 0.3,
            cta_keyword_weight: 0.3,
            cta_target_relative_size: 2.0,
            cta_keyword_saturation: 2,
            cta_effectiveness_threshold: 0.5,
            thirds_tolerance: 0.1,
            contrast_threshold: 4.5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

impl Settings {
    /// Load settings from defaults, `config/default`, `config/{NEUROMARK_ENV}`,
    /// `config/local` and the environment, in increasing priority.
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name("config/default").required(false));

        if let Ok(env) = std::env::var("NEUROMARK_ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("NEUROMARK")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let invalid = |msg: &str| Err(ConfigLoadError::Validation(msg.to_string()));

        let d = &self.detection;
        if !(0.0..=1.0).contains(&d.confidence_threshold) {
            return invalid("detection.confidence_threshold must be within [0, 1]");
        }
        if self.pipeline.analyzer_timeout_ms == 0 {
            return invalid("pipeline.analyzer_timeout_ms must be positive");
        }
        if self.models.request_timeout_secs == 0 || self.models.connect_timeout_secs == 0 {
            return invalid("models timeouts must be positive");
        }
        if self.color.n_colors == 0 || self.color.quantization_step == 0 {
            return invalid("color.n_colors and color.quantization_step must be positive");
        }
        if self.color.sample_size == 0 {
            return invalid("color.sample_size must be positive");
        }
        if self.attention.blur_sigma <= 0.0 {
            return invalid("attention.blur_sigma must be positive");
        }

        let s = &self.scoring;
        let weights = [
            s.cta_position_weight,
            s.cta_size_weight,
            s.cta_keyword_weight,
        ];
        if weights.iter().any(|w| *w < 0.0) || weights.iter().sum::<f32>() <= 0.0 {
            return invalid("scoring CTA weights must be non-negative and not all zero");
        }
        if s.thirds_tolerance <= 0.0 || s.thirds_tolerance >= 0.5 {
            return invalid("scoring.thirds_tolerance must be within (0, 0.5)");
        }
        if s.cta_target_relative_size <= 0.0 || s.cta_keyword_saturation == 0 {
            return invalid("scoring CTA size target and keyword saturation must be positive");
        }

        Ok(())
    }
}
