mod common;

use common::{Behavior, FakeAnalyzer, analyzers_with, analyzers_with_real_color, test_image};
use neuromark::config::{ScoringConfig, Settings};
use neuromark::engine::scoring::{EmotionalImpact, summarize};
use neuromark::engine::{AnalysisPipeline, NeuromarketingEngine, aggregator};
use neuromark::errors::NeuromarkError;
use neuromark::models::{AnalyzerKind, AnalyzerResult, ColorEmotion};
use neuromark::services::CapabilityRegistry;
use neuromark::services::analyzers::Analyzer;
use neuromark::AppState;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

fn pipeline(analyzers: Vec<Arc<dyn Analyzer>>, timeout: Duration) -> AnalysisPipeline {
    AnalysisPipeline::new(Arc::new(CapabilityRegistry::new(analyzers)), timeout)
}

fn kinds(list: &[AnalyzerKind]) -> BTreeSet<AnalyzerKind> {
    list.iter().copied().collect()
}

#[tokio::test]
async fn result_keys_match_requested_plus_required_kinds() {
    let pipeline = pipeline(analyzers_with(vec![]), Duration::from_secs(5));
    let image = test_image(40, 30);

    let cases = [
        vec![AnalyzerKind::ObjectDetection],
        vec![
            AnalyzerKind::ObjectDetection,
            AnalyzerKind::Ocr,
            AnalyzerKind::Caption,
        ],
        AnalyzerKind::ALL.to_vec(),
    ];

    for requested in cases {
        let requested = kinds(&requested);
        let results = pipeline.run(image.clone(), &requested).await;

        let expected = AnalysisPipeline::resolve_kinds(&requested);
        let got: BTreeSet<_> = results.keys().copied().collect();
        assert_eq!(got, expected);
        assert!(got.contains(&AnalyzerKind::ColorAnalysis));
        assert!(results.values().all(AnalyzerResult::is_ok));
    }
}

#[tokio::test]
async fn unavailable_kind_is_not_invoked() {
    let pipeline = pipeline(
        analyzers_with(vec![(
            AnalyzerKind::Caption,
            Behavior::Unavailable("caption weights missing".into()),
        )]),
        Duration::from_secs(5),
    );

    let results = pipeline
        .run(test_image(10, 10), &kinds(&[AnalyzerKind::Caption]))
        .await;

    assert_eq!(
        results[&AnalyzerKind::Caption],
        AnalyzerResult::Unavailable("caption weights missing".into())
    );
    assert!(results[&AnalyzerKind::ObjectDetection].is_ok());
}

#[tokio::test]
async fn slow_analyzer_times_out_without_blocking_others() {
    let pipeline = pipeline(
        analyzers_with(vec![(AnalyzerKind::Emotion, Behavior::Hang)]),
        Duration::from_millis(50),
    );

    let results = pipeline
        .run(test_image(10, 10), &kinds(&[AnalyzerKind::Emotion, AnalyzerKind::Ocr]))
        .await;

    assert_eq!(
        results[&AnalyzerKind::Emotion],
        AnalyzerResult::Failed("Analyzer timed out after 50ms".into())
    );
    assert!(results[&AnalyzerKind::Ocr].is_ok());
    assert_eq!(results.len(), 4);
}

#[tokio::test]
async fn panicking_and_failing_analyzers_are_isolated() {
    let pipeline = pipeline(
        analyzers_with(vec![
            (AnalyzerKind::Attention, Behavior::Panic),
            (AnalyzerKind::Cta, Behavior::Fail("HTTP 500".into())),
        ]),
        Duration::from_secs(5),
    );

    let results = pipeline
        .run(test_image(10, 10), &kinds(&AnalyzerKind::ALL))
        .await;

    assert_eq!(results.len(), AnalyzerKind::ALL.len());
    match &results[&AnalyzerKind::Attention] {
        AnalyzerResult::Failed(reason) => assert!(reason.contains("model crashed")),
        other => panic!("expected failure, got {:?}", other),
    }
    match &results[&AnalyzerKind::Cta] {
        AnalyzerResult::Failed(reason) => assert!(reason.contains("HTTP 500")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(results[&AnalyzerKind::Caption].is_ok());
}

#[tokio::test]
async fn mismatched_payload_is_a_failure() {
    let pipeline = pipeline(
        analyzers_with(vec![(
            AnalyzerKind::Caption,
            Behavior::Return(common::sample_payload(AnalyzerKind::Ocr)),
        )]),
        Duration::from_secs(5),
    );

    let result = pipeline
        .run_one(AnalyzerKind::Caption, test_image(10, 10))
        .await;
    assert!(matches!(result, AnalyzerResult::Failed(_)));
}

#[tokio::test]
async fn missing_analyzer_reports_unavailable() {
    let pipeline = pipeline(
        vec![FakeAnalyzer::ok(AnalyzerKind::ObjectDetection)],
        Duration::from_secs(5),
    );

    let results = pipeline
        .run(test_image(10, 10), &kinds(&[AnalyzerKind::Ocr]))
        .await;

    assert_eq!(
        results[&AnalyzerKind::Ocr],
        AnalyzerResult::Unavailable("no analyzer registered".into())
    );
    assert_eq!(
        results[&AnalyzerKind::ColorAnalysis],
        AnalyzerResult::Unavailable("no analyzer registered".into())
    );
}

#[tokio::test]
async fn caption_outage_still_yields_full_report() {
    let settings = Settings::default();
    let analyzers = analyzers_with_real_color(vec![(
        AnalyzerKind::Caption,
        Behavior::Unavailable("no model endpoint configured for caption".into()),
    )]);
    let engine = NeuromarketingEngine::new(
        pipeline(analyzers, settings.pipeline.analyzer_timeout()),
        settings.scoring.clone(),
    );

    let report = engine
        .analyze(test_image(64, 64), &kinds(&AnalyzerKind::ALL))
        .await;

    assert_eq!(report.sections.len(), AnalyzerKind::ALL.len());
    let caption = report.sections.section(AnalyzerKind::Caption).unwrap();
    assert!(!caption.available);
    assert_eq!(
        caption.reason(),
        Some("no model endpoint configured for caption")
    );

    for kind in AnalyzerKind::ALL {
        if kind != AnalyzerKind::Caption {
            assert!(report.sections.section(kind).unwrap().available, "{}", kind);
        }
    }

    assert_eq!(report.summary.color_palette, Some(ColorEmotion::WarmEnergetic));
    assert_eq!(report.summary.emotional_impact, EmotionalImpact::PositiveHigh);
    assert_eq!(report.summary.total_objects, Some(2));
    assert_eq!(report.image.width, 64);
}

#[tokio::test]
async fn color_without_emotion_is_neutral_impact() {
    let analyzers = analyzers_with_real_color(vec![(
        AnalyzerKind::Emotion,
        Behavior::Unavailable("no model endpoint configured for emotion".into()),
    )]);
    let results = pipeline(analyzers, Duration::from_secs(5))
        .run(
            test_image(32, 32),
            &kinds(&[AnalyzerKind::ColorAnalysis, AnalyzerKind::Emotion]),
        )
        .await;

    let report = aggregator::normalize(results);
    let summary = summarize(&report, &ScoringConfig::default());
    assert_eq!(summary.emotional_impact, EmotionalImpact::Neutral);
    assert_eq!(summary.color_palette, Some(ColorEmotion::WarmEnergetic));
    assert_eq!(summary, summarize(&report, &ScoringConfig::default()));
}

fn engine(analyzers: Vec<Arc<dyn Analyzer>>) -> NeuromarketingEngine {
    NeuromarketingEngine::new(
        pipeline(analyzers, Duration::from_secs(5)),
        ScoringConfig::default(),
    )
}

#[tokio::test]
async fn startup_check_passes_with_required_kinds_available() {
    let engine = engine(analyzers_with(vec![(
        AnalyzerKind::Caption,
        Behavior::Unavailable("no model endpoint configured for caption".into()),
    )]));

    assert!(engine.ensure_required().await.is_ok());
}

#[tokio::test]
async fn startup_check_fails_without_object_detection() {
    let engine = engine(analyzers_with(vec![(
        AnalyzerKind::ObjectDetection,
        Behavior::Unavailable("detector weights missing".into()),
    )]));

    match engine.ensure_required().await {
        Err(NeuromarkError::CapabilityUnavailable(reason)) => {
            assert!(reason.contains("object-detection"));
            assert!(reason.contains("detector weights missing"));
        }
        other => panic!("expected a missing capability, got {:?}", other),
    }
}

#[tokio::test]
async fn default_settings_without_detector_endpoint_refuse_to_start() {
    let state = AppState::from_settings(&Settings::default()).unwrap();

    let err = state.engine.ensure_required().await.unwrap_err();
    assert!(
        err.to_string()
            .contains("no model endpoint configured for object-detection")
    );
}
