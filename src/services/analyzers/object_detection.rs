// src/services/analyzers/object_detection.rs
use super::{Analyzer, RemoteModel};
use crate::config::DetectionConfig;
use crate::errors::NeuromarkError;
use crate::models::{AnalyzerKind, BoundingBox, DecodedImage, Detection, ObjectDetection, Payload};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct RawDetections {
    #[serde(default)]
    pub boxes: Vec<RawBox>,
}

#[derive(Debug, Deserialize)]
pub struct RawBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    pub confidence: f32,
    #[serde(default)]
    pub class_id: u32,
    pub name: String,
}

/// YOLO-style object detector served by a model server.
pub struct ObjectDetector {
    model: RemoteModel,
    config: DetectionConfig,
}

impl ObjectDetector {
    pub fn new(model: RemoteModel, config: DetectionConfig) -> Self {
        Self { model, config }
    }

    fn options(&self) -> serde_json::Value {
        json!({
            "conf": self.config.confidence_threshold,
            "imgsz": self.config.image_size,
            "augment": self.config.augment,
        })
    }
}

/// Drop low-confidence boxes, clamp the rest to the image and order them
/// left to right.
pub fn to_detections(
    raw: RawDetections,
    threshold: f32,
    width: u32,
    height: u32,
) -> ObjectDetection {
    let mut objects: Vec<Detection> = raw
        .boxes
        .into_iter()
        .filter(|b| b.confidence >= threshold)
        .map(|b| Detection {
            name: b.name,
            class_id: b.class_id,
            confidence: b.confidence.clamp(0.0, 1.0),
            bbox: BoundingBox::new(b.xmin, b.ymin, b.xmax, b.ymax).clamped(width, height),
        })
        .collect();

    objects.sort_by(|a, b| a.bbox.xmin.total_cmp(&b.bbox.xmin));

    ObjectDetection {
        count: objects.len(),
        objects,
    }
}

#[async_trait]
impl Analyzer for ObjectDetector {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::ObjectDetection
    }

    async fn probe(&self) -> Result<(), String> {
        self.model.probe().await
    }

    async fn analyze(&self, image: Arc<DecodedImage>) -> Result<Payload, NeuromarkError> {
        let raw: RawDetections = self.model.infer(&image, &self.options()).await?;
        Ok(Payload::Objects(to_detections(
            raw,
            self.config.confidence_threshold,
            image.width(),
            image.height(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: serde_json::Value) -> RawDetections {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn filters_below_threshold_and_sorts_by_xmin() {
        let detections = to_detections(
            raw(json!({
                "boxes": [
                    {"xmin": 300.0, "ymin": 10.0, "xmax": 400.0, "ymax": 200.0, "confidence": 0.91, "class_id": 0, "name": "person"},
                    {"xmin": 20.0, "ymin": 30.0, "xmax": 120.0, "ymax": 90.0, "confidence": 0.87, "class_id": 2, "name": "car"},
                    {"xmin": 5.0, "ymin": 5.0, "xmax": 15.0, "ymax": 15.0, "confidence": 0.2, "class_id": 16, "name": "dog"}
                ]
            })),
            0.5,
            640,
            480,
        );

        assert_eq!(detections.count, 2);
        let names: Vec<_> = detections.objects.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["car", "person"]);
    }

    #[test]
    fn clamps_boxes_to_image_bounds() {
        let detections = to_detections(
            raw(json!({
                "boxes": [
                    {"xmin": -4.0, "ymin": 10.0, "xmax": 900.0, "ymax": 50.0, "confidence": 0.7, "name": "bus"}
                ]
            })),
            0.5,
            640,
            480,
        );
        assert_eq!(
            detections.objects[0].bbox,
            BoundingBox::new(0.0, 10.0, 640.0, 50.0)
        );
        assert_eq!(detections.objects[0].class_id, 0);
    }

    #[test]
    fn missing_boxes_means_no_objects() {
        let detections = to_detections(raw(json!({})), 0.5, 10, 10);
        assert_eq!(detections.count, 0);
        assert!(detections.objects.is_empty());
    }

    #[test]
    fn options_pass_detection_settings_through() {
        let detector = ObjectDetector::new(
            RemoteModel::new(AnalyzerKind::ObjectDetection, None),
            DetectionConfig {
                confidence_threshold: 0.25,
                image_size: 1248,
                augment: true,
            },
        );
        let options = detector.options();
        assert_eq!(options["conf"], 0.25);
        assert_eq!(options["imgsz"], 1248);
        assert_eq!(options["augment"], true);
    }
}
