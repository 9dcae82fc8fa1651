//! Bootstrap gate.
//!
//! Map creation and the sample-data fetch run as two independent tasks. Each
//! reports exactly one [`BootstrapEvent`] over a channel; whoever owns the
//! coordinator applies those events in arrival order, interleaved with user
//! commands, so the coordinator is never touched from two places at once.

use std::sync::Arc;

use catalog::{MapConfig, MapProvider, MapSession};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::coordinator::DatasetSessionCoordinator;
use crate::source::{SampleDataSource, SamplePair};
use crate::state::Readiness;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    Map,
    Data,
}

impl std::fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapStage::Map => write!(f, "map initialization"),
            BootstrapStage::Data => write!(f, "sample data load"),
        }
    }
}

/// Why a session never became ready.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} failed: {reason}")]
pub struct BootstrapFailure {
    pub stage: BootstrapStage,
    pub reason: String,
}

impl BootstrapFailure {
    pub fn new(stage: BootstrapStage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

/// Completion of one bootstrap task.
pub enum BootstrapEvent {
    MapReady(Box<dyn MapSession>),
    DataReady(SamplePair),
    Failed(BootstrapFailure),
}

impl std::fmt::Debug for BootstrapEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapEvent::MapReady(_) => f.write_str("MapReady(..)"),
            BootstrapEvent::DataReady(pair) => f.debug_tuple("DataReady").field(pair).finish(),
            BootstrapEvent::Failed(failure) => f.debug_tuple("Failed").field(failure).finish(),
        }
    }
}

/// Receiving end of the two bootstrap tasks.
pub struct BootstrapGate {
    rx: mpsc::UnboundedReceiver<BootstrapEvent>,
}

impl BootstrapGate {
    /// Spawns both tasks on the current tokio runtime. Neither waits on the other.
    pub fn start(
        provider: Arc<dyn MapProvider>,
        config: MapConfig,
        source: Arc<dyn SampleDataSource>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let map_tx = tx.clone();
        tokio::spawn(async move {
            let event = match provider.create_session(config).await {
                Ok(map) => BootstrapEvent::MapReady(map),
                Err(e) => {
                    warn!("map initialization failed: {e}");
                    BootstrapEvent::Failed(BootstrapFailure::new(
                        BootstrapStage::Map,
                        e.to_string(),
                    ))
                }
            };
            // The receiver may be gone if the session was dropped first.
            let _ = map_tx.send(event);
        });

        tokio::spawn(async move {
            let event = match source.fetch().await {
                Ok(pair) => BootstrapEvent::DataReady(pair),
                Err(e) => {
                    warn!("sample data load failed: {e}");
                    BootstrapEvent::Failed(BootstrapFailure::new(
                        BootstrapStage::Data,
                        e.to_string(),
                    ))
                }
            };
            let _ = tx.send(event);
        });

        Self { rx }
    }

    /// Waits for the next task to finish. `None` once both have reported.
    pub async fn next_event(&mut self) -> Option<BootstrapEvent> {
        self.rx.recv().await
    }

    /// Applies completions until the coordinator is ready or has failed.
    ///
    /// A task that exits without reporting (e.g. it panicked) is recorded as a
    /// failure instead of leaving the session pending forever.
    pub async fn drive(mut self, coordinator: &mut DatasetSessionCoordinator) -> Readiness {
        while let Some(event) = self.next_event().await {
            coordinator.apply(event);
            match coordinator.readiness() {
                Readiness::Pending { .. } => continue,
                readiness => return readiness,
            }
        }
        coordinator.on_bootstrap_closed();
        let readiness = coordinator.readiness();
        info!("bootstrap finished: {readiness}");
        readiness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SamplePayload, SourceError, StaticSampleSource};
    use catalog::{BoxFuture, InMemoryMapProvider};
    use serde_json::json;
    use std::time::Duration;

    fn config() -> MapConfig {
        MapConfig {
            api_key: "key".to_string(),
            container: "map".to_string(),
        }
    }

    fn pair() -> SamplePair {
        SamplePair::new(
            SamplePayload::new("a", "A", json!(1)),
            SamplePayload::new("b", "B", json!(2)),
        )
    }

    struct FailingSource;

    impl SampleDataSource for FailingSource {
        fn fetch(&self) -> BoxFuture<'_, Result<SamplePair, SourceError>> {
            Box::pin(async { Err(SourceError::Count(3)) })
        }
    }

    struct PanickingSource;

    impl SampleDataSource for PanickingSource {
        fn fetch(&self) -> BoxFuture<'_, Result<SamplePair, SourceError>> {
            panic!("source blew up")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completions_arrive_in_finish_order() {
        let provider =
            Arc::new(InMemoryMapProvider::new().with_startup_delay(Duration::from_secs(2)));
        let source = Arc::new(StaticSampleSource::new(pair()));
        let mut gate = BootstrapGate::start(provider, config(), source);

        assert!(matches!(gate.next_event().await, Some(BootstrapEvent::DataReady(_))));
        assert!(matches!(gate.next_event().await, Some(BootstrapEvent::MapReady(_))));
        assert!(gate.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_data_does_not_block_map() {
        let provider = Arc::new(InMemoryMapProvider::new());
        let source =
            Arc::new(StaticSampleSource::new(pair()).with_delay(Duration::from_secs(3)));
        let mut gate = BootstrapGate::start(provider, config(), source);
        let mut coordinator = DatasetSessionCoordinator::new();

        let first = gate.next_event().await.unwrap();
        assert!(matches!(first, BootstrapEvent::MapReady(_)));
        coordinator.apply(first);
        assert_eq!(
            coordinator.readiness(),
            Readiness::Pending {
                map: false,
                data: true
            }
        );

        assert_eq!(gate.drive(&mut coordinator).await, Readiness::Ready);
    }

    #[tokio::test]
    async fn source_failure_is_recorded() {
        let provider = Arc::new(InMemoryMapProvider::new());
        let gate = BootstrapGate::start(provider, config(), Arc::new(FailingSource));
        let mut coordinator = DatasetSessionCoordinator::new();

        let readiness = gate.drive(&mut coordinator).await;
        let Readiness::Failed(failure) = readiness else {
            panic!("expected failure, got {readiness:?}");
        };
        assert_eq!(failure.stage, BootstrapStage::Data);
        assert!(failure.reason.contains("exactly two"));
    }

    #[tokio::test]
    async fn map_failure_is_recorded() {
        let provider = Arc::new(InMemoryMapProvider::new());
        let bad = MapConfig {
            api_key: String::new(),
            container: "map".to_string(),
        };
        let source = Arc::new(StaticSampleSource::new(pair()));
        let gate = BootstrapGate::start(provider, bad, source);
        let mut coordinator = DatasetSessionCoordinator::new();

        let readiness = gate.drive(&mut coordinator).await;
        assert!(matches!(
            readiness,
            Readiness::Failed(BootstrapFailure {
                stage: BootstrapStage::Map,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn silent_task_exit_becomes_failure() {
        let provider = Arc::new(InMemoryMapProvider::new());
        let gate = BootstrapGate::start(provider, config(), Arc::new(PanickingSource));
        let mut coordinator = DatasetSessionCoordinator::new();

        let readiness = gate.drive(&mut coordinator).await;
        assert_eq!(
            readiness,
            Readiness::Failed(BootstrapFailure::new(
                BootstrapStage::Data,
                "task exited without a result"
            ))
        );
    }
}
