// src/engine/pipeline.rs
use crate::errors::NeuromarkError;
use crate::models::{AnalyzerKind, AnalyzerResult, DecodedImage};
use crate::services::CapabilityRegistry;
use crate::services::analyzers::Analyzer;
use futures_util::FutureExt;
use log::{debug, warn};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Fans one image out to the requested analyzers. A fault in one analyzer
/// never affects the others or the caller.
pub struct AnalysisPipeline {
    registry: Arc<CapabilityRegistry>,
    timeout: Duration,
}

impl AnalysisPipeline {
    pub fn new(registry: Arc<CapabilityRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Requested kinds plus the kinds every run includes.
    pub fn resolve_kinds(requested: &BTreeSet<AnalyzerKind>) -> BTreeSet<AnalyzerKind> {
        requested
            .iter()
            .copied()
            .chain(AnalyzerKind::REQUIRED)
            .collect()
    }

    /// One result per resolved kind. Dropping the returned future aborts
    /// every in-flight invocation.
    pub async fn run(
        &self,
        image: Arc<DecodedImage>,
        requested: &BTreeSet<AnalyzerKind>,
    ) -> BTreeMap<AnalyzerKind, AnalyzerResult> {
        let kinds = Self::resolve_kinds(requested);
        let mut results = BTreeMap::new();
        let mut join_set: JoinSet<(AnalyzerKind, AnalyzerResult)> = JoinSet::new();

        for kind in kinds.iter().copied() {
            let capability = self.registry.capability(kind).await;
            let analyzer = match (capability.available, self.registry.analyzer(kind)) {
                (true, Some(analyzer)) => analyzer,
                _ => {
                    let reason = capability
                        .reason
                        .unwrap_or_else(|| "no analyzer registered".to_string());
                    debug!("Skipping {}: {}", kind, reason);
                    results.insert(kind, AnalyzerResult::Unavailable(reason));
                    continue;
                }
            };

            let image = image.clone();
            let timeout = self.timeout;
            join_set.spawn(async move { (kind, invoke(analyzer, image, timeout).await) });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((kind, result)) => {
                    results.insert(kind, result);
                }
                Err(e) => warn!("Analyzer task did not complete: {}", e),
            }
        }

        // A task lost to cancellation still owes its kind an entry.
        for kind in kinds {
            results
                .entry(kind)
                .or_insert_with(|| AnalyzerResult::Failed("analyzer task was cancelled".into()));
        }

        results
    }

    /// Run a single analyzer, honouring availability and the time budget.
    pub async fn run_one(&self, kind: AnalyzerKind, image: Arc<DecodedImage>) -> AnalyzerResult {
        let capability = self.registry.capability(kind).await;
        match (capability.available, self.registry.analyzer(kind)) {
            (true, Some(analyzer)) => invoke(analyzer, image, self.timeout).await,
            _ => AnalyzerResult::Unavailable(
                capability
                    .reason
                    .unwrap_or_else(|| "no analyzer registered".to_string()),
            ),
        }
    }
}

async fn invoke(
    analyzer: Arc<dyn Analyzer>,
    image: Arc<DecodedImage>,
    timeout: Duration,
) -> AnalyzerResult {
    let kind = analyzer.kind();
    let started = Instant::now();

    let outcome = tokio::time::timeout(
        timeout,
        AssertUnwindSafe(analyzer.analyze(image)).catch_unwind(),
    )
    .await;

    let result = match outcome {
        Err(_) => {
            let err = NeuromarkError::TimeoutExceeded(timeout);
            warn!("Analyzer {} failed: {}", kind, err);
            AnalyzerResult::Failed(err.to_string())
        }
        Ok(Err(panic)) => {
            let message = panic_message(panic.as_ref());
            warn!("Analyzer {} panicked: {}", kind, message);
            AnalyzerResult::Failed(format!("Analyzer panicked: {}", message))
        }
        Ok(Ok(Err(NeuromarkError::CapabilityUnavailable(reason)))) => {
            AnalyzerResult::Unavailable(reason)
        }
        Ok(Ok(Err(e))) => {
            warn!("Analyzer {} failed: {}", kind, e);
            AnalyzerResult::Failed(e.to_string())
        }
        Ok(Ok(Ok(payload))) if payload.kind() != kind => {
            warn!("Analyzer {} returned a {} payload", kind, payload.kind());
            AnalyzerResult::Failed(format!(
                "analyzer returned a {} payload",
                payload.kind()
            ))
        }
        Ok(Ok(Ok(payload))) => AnalyzerResult::Ok(payload),
    };

    debug!(
        "Analyzer {} finished in {}ms",
        kind,
        started.elapsed().as_millis()
    );
    result
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
