// src/services/capabilities.rs
use crate::models::AnalyzerKind;
use crate::services::analyzers::Analyzer;
use futures_util::future::join_all;
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capability {
    pub available: bool,
    pub reason: Option<String>,
}

impl Capability {
    fn available() -> Self {
        Self {
            available: true,
            reason: None,
        }
    }

    fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
        }
    }
}

/// Which analyzer kinds can run in this process. Each analyzer is probed at
/// most once; later queries read the cached outcome.
pub struct CapabilityRegistry {
    analyzers: BTreeMap<AnalyzerKind, Arc<dyn Analyzer>>,
    probed: OnceCell<BTreeMap<AnalyzerKind, Capability>>,
}

impl CapabilityRegistry {
    pub fn new(analyzers: Vec<Arc<dyn Analyzer>>) -> Self {
        Self {
            analyzers: analyzers.into_iter().map(|a| (a.kind(), a)).collect(),
            probed: OnceCell::new(),
        }
    }

    /// Probe every analyzer concurrently. Safe to call from many tasks; only
    /// the first caller does the work.
    pub async fn initialize(&self) -> &BTreeMap<AnalyzerKind, Capability> {
        self.probed.get_or_init(|| self.probe_all()).await
    }

    async fn probe_all(&self) -> BTreeMap<AnalyzerKind, Capability> {
        let probes = AnalyzerKind::ALL.into_iter().map(|kind| async move {
            let capability = match self.analyzers.get(&kind) {
                Some(analyzer) => match analyzer.probe().await {
                    Ok(()) => {
                        info!("Capability {} available", kind);
                        Capability::available()
                    }
                    Err(reason) => {
                        warn!("Capability {} unavailable: {}", kind, reason);
                        Capability::unavailable(reason)
                    }
                },
                None => Capability::unavailable("no analyzer registered"),
            };
            (kind, capability)
        });

        join_all(probes).await.into_iter().collect()
    }

    pub async fn capability(&self, kind: AnalyzerKind) -> Capability {
        self.initialize()
            .await
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Capability::unavailable("no analyzer registered"))
    }

    pub async fn is_available(&self, kind: AnalyzerKind) -> bool {
        self.capability(kind).await.available
    }

    pub fn analyzer(&self, kind: AnalyzerKind) -> Option<Arc<dyn Analyzer>> {
        self.analyzers.get(&kind).cloned()
    }

    pub async fn snapshot(&self) -> BTreeMap<AnalyzerKind, Capability> {
        self.initialize().await.clone()
    }
}
