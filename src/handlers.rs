// src/handlers.rs
use crate::{AppState, errors::NeuromarkError, models::*};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct KindsQuery {
    /// Comma-separated analyzer kinds; all kinds when absent.
    pub kinds: Option<String>,
}

#[derive(Debug, Serialize)]
struct DetectedObject {
    name: String,
    confidence: f32,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/healthcheck", web::get().to(healthcheck))
        .route("/capabilities", web::get().to(capabilities))
        .route(
            "/img_object_detection_to_json",
            web::post().to(detect_objects_json),
        )
        .route(
            "/img_object_detection_to_img",
            web::post().to(detect_objects_image),
        )
        .route("/analyze/{kind}", web::post().to(analyze_kind))
        .route("/neuromarketing", web::post().to(neuromarketing));
}

pub async fn healthcheck() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "healthcheck": "Everything OK!" }))
}

pub async fn capabilities(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.engine.capabilities().await)
}

pub async fn detect_objects_json(
    payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let image = read_image(payload, &data).await?;
    let detections = data.engine.detect_objects(image).await?;

    let names: Vec<&str> = detections.objects.iter().map(|d| d.name.as_str()).collect();
    let objects: Vec<DetectedObject> = detections
        .objects
        .iter()
        .map(|d| DetectedObject {
            name: d.name.clone(),
            confidence: d.confidence,
        })
        .collect();

    info!("Detected {} objects", objects.len());

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "detect_objects": objects,
        "detect_objects_names": names.join(", ")
    })))
}

pub async fn detect_objects_image(
    payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let image = read_image(payload, &data).await?;
    let detections = data.engine.detect_objects(image.clone()).await?;

    let processor = data.image_processor.clone();
    let jpeg = web::block(move || {
        let annotated = processor.annotate(&image, &detections.objects);
        processor.encode_jpeg(&annotated)
    })
    .await??;

    Ok(HttpResponse::Ok().content_type("image/jpeg").body(jpeg))
}

pub async fn analyze_kind(
    path: web::Path<String>,
    payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let kind: AnalyzerKind = path
        .into_inner()
        .parse()
        .map_err(NeuromarkError::Validation)?;

    let image = read_image(payload, &data).await?;
    let section = data.engine.analyze_one(kind, image).await;

    Ok(HttpResponse::Ok().json(section))
}

pub async fn neuromarketing(
    query: web::Query<KindsQuery>,
    payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let kinds = parse_kinds(query.kinds.as_deref())?;

    let image = read_image(payload, &data).await?;
    let report = data.engine.analyze(image, &kinds).await;

    info!(
        "Report {} built in {}ms",
        report.id, report.processing_time_ms
    );

    Ok(HttpResponse::Ok().json(&report))
}

/// Parse `a,b,c` into analyzer kinds. Blank input selects every kind.
pub fn parse_kinds(raw: Option<&str>) -> Result<BTreeSet<AnalyzerKind>, NeuromarkError> {
    let names: Vec<&str> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if names.is_empty() {
        return Ok(AnalyzerKind::ALL.into_iter().collect());
    }

    names
        .into_iter()
        .map(|name| name.parse().map_err(NeuromarkError::Validation))
        .collect()
}

/// Read the `file` field and decode it off the async executor.
async fn read_image(
    payload: Multipart,
    data: &web::Data<AppState>,
) -> Result<Arc<DecodedImage>, Error> {
    let bytes = read_upload(payload, data.max_upload_bytes).await?;

    let processor = data.image_processor.clone();
    let image = web::block(move || processor.decode(&bytes)).await??;

    Ok(Arc::new(image))
}

async fn read_upload(mut payload: Multipart, max_bytes: usize) -> Result<BytesMut, Error> {
    while let Some(mut field) = payload.try_next().await? {
        if field.content_disposition().get_name() != Some(UPLOAD_FIELD) {
            while field.try_next().await?.is_some() {}
            continue;
        }

        let mut buf = BytesMut::new();
        while let Some(chunk) = field.try_next().await? {
            if buf.len() + chunk.len() > max_bytes {
                return Err(NeuromarkError::Validation(format!(
                    "Upload exceeds {} bytes",
                    max_bytes
                ))
                .into());
            }
            buf.extend_from_slice(&chunk);
        }
        return Ok(buf);
    }

    Err(NeuromarkError::Validation(format!("Missing multipart field '{}'", UPLOAD_FIELD)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_kinds_select_everything() {
        assert_eq!(parse_kinds(None).unwrap().len(), AnalyzerKind::ALL.len());
        assert_eq!(parse_kinds(Some(" , ")).unwrap().len(), AnalyzerKind::ALL.len());
    }

    #[test]
    fn kinds_are_parsed_and_deduplicated() {
        let kinds = parse_kinds(Some("ocr, caption,OCR")).unwrap();
        assert_eq!(
            kinds,
            BTreeSet::from([AnalyzerKind::Ocr, AnalyzerKind::Caption])
        );
    }

    #[test]
    fn unknown_kind_is_a_validation_error() {
        let err = parse_kinds(Some("ocr,gaze")).unwrap_err();
        assert!(matches!(err, NeuromarkError::Validation(ref m) if m.contains("gaze")));
    }
}
