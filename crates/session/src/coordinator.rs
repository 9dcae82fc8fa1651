//! Dataset session coordinator.
//!
//! Owns the map handle, the round-robin sample pair and the inspected
//! snapshot, and decides for every user operation whether it runs, is
//! skipped, or fails:
//!
//! - before both bootstrap halves arrive every operation is skipped with
//!   [`SkipReason::NotReady`] and the map is never called;
//! - operations that need a dataset on an empty map fail with
//!   [`SessionError::NoDataset`] and change nothing;
//! - provider errors propagate as [`SessionError::Map`]; nothing is retried or
//!   rolled back.
//!
//! The demonstration keeps at most one dataset on the map. "The first
//! dataset" is index 0 of [`MapSession::list_datasets`].

use catalog::{Dataset, DatasetUpdate, DatasetWithData, MapSession};
use foundation::Rgb;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use runtime::{EventBus, Metrics};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::gate::{BootstrapEvent, BootstrapFailure, BootstrapStage};
use crate::source::SamplePair;
use crate::state::{Phase, ReadySession, Readiness};

/// Label written by [`DatasetSessionCoordinator::update_dataset`].
pub const UPDATED_LABEL: &str = "Updated Dataset";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Update,
    Replace,
    Display,
    Remove,
    CloseInspection,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Add,
        Operation::Update,
        Operation::Replace,
        Operation::Display,
        Operation::Remove,
        Operation::CloseInspection,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Update => "update",
            Operation::Replace => "replace",
            Operation::Display => "display",
            Operation::Remove => "remove",
            Operation::CloseInspection => "close",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Why an operation did nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotReady(Readiness),
    AlreadyHasDataset,
    NothingInspected,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotReady(readiness) => write!(f, "{readiness}"),
            SkipReason::AlreadyHasDataset => write!(
                f,
                "Dataset already added to the map. (Example is limited to one dataset)."
            ),
            SkipReason::NothingInspected => write!(f, "No dataset is being displayed."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped(SkipReason),
}

pub struct DatasetSessionCoordinator {
    phase: Phase,
    events: EventBus,
    metrics: Metrics,
    rng: StdRng,
}

impl Default for DatasetSessionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetSessionCoordinator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Uses `rng` for update colors; seed it for reproducible sessions.
    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            phase: Phase::default(),
            events: EventBus::new(),
            metrics: Metrics::new(),
            rng,
        }
    }

    pub fn apply(&mut self, event: BootstrapEvent) {
        match event {
            BootstrapEvent::MapReady(map) => self.on_map_ready(map),
            BootstrapEvent::DataReady(pair) => self.on_data_ready(pair),
            BootstrapEvent::Failed(failure) => self.on_bootstrap_failed(failure),
        }
    }

    /// Accepts the map once; later deliveries are dropped.
    pub fn on_map_ready(&mut self, map: Box<dyn MapSession>) {
        let accepted = match &mut self.phase {
            Phase::Booting { map: slot, .. } if slot.is_none() => {
                *slot = Some(map);
                true
            }
            _ => false,
        };
        if accepted {
            info!("map initialized");
            self.events.emit("bootstrap", "map ready");
        } else {
            warn!("map delivered twice; keeping the first");
            self.events.emit("bootstrap", "duplicate map ignored");
        }
        self.promote();
    }

    /// Accepts the sample pair once; later deliveries are dropped.
    pub fn on_data_ready(&mut self, pair: SamplePair) {
        let accepted = match &mut self.phase {
            Phase::Booting { pair: slot, .. } if slot.is_none() => {
                *slot = Some(pair);
                true
            }
            _ => false,
        };
        if accepted {
            info!("sample data loaded");
            self.events.emit("bootstrap", "data ready");
        } else {
            warn!("sample data delivered twice; keeping the first");
            self.events.emit("bootstrap", "duplicate data ignored");
        }
        self.promote();
    }

    /// Records the first failure; the session stays unready for good.
    pub fn on_bootstrap_failed(&mut self, failure: BootstrapFailure) {
        if let Phase::Booting {
            failure: slot @ None,
            ..
        } = &mut self.phase
        {
            warn!("session cannot start: {failure}");
            self.events.emit("bootstrap", format!("failed: {failure}"));
            *slot = Some(failure);
        } else {
            debug!("ignoring bootstrap failure after start: {failure}");
        }
    }

    /// Both bootstrap tasks are gone; a half still missing will never arrive.
    pub fn on_bootstrap_closed(&mut self) {
        if let Readiness::Pending { map, .. } = self.readiness() {
            let stage = if map {
                BootstrapStage::Map
            } else {
                BootstrapStage::Data
            };
            self.on_bootstrap_failed(BootstrapFailure::new(
                stage,
                "task exited without a result",
            ));
        }
    }

    fn promote(&mut self) {
        let was_ready = self.readiness().is_ready();
        self.phase.promote();
        if !was_ready && self.readiness().is_ready() {
            info!("session ready");
            self.events.emit("bootstrap", "ready");
            let datasets = self.datasets().len() as i64;
            self.metrics.set_gauge("map.datasets", datasets);
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.phase.readiness()
    }

    /// Whether the presentation layer should enable its controls.
    pub fn controls_enabled(&self) -> bool {
        self.readiness().is_ready()
    }

    /// Current round-robin order, once the data has arrived.
    pub fn pair(&self) -> Option<&SamplePair> {
        match &self.phase {
            Phase::Ready(session) => Some(&session.pair),
            Phase::Booting { pair, .. } => pair.as_ref(),
        }
    }

    /// Where the map is mounted, once it exists.
    pub fn container(&self) -> Option<&str> {
        match &self.phase {
            Phase::Ready(session) => Some(session.map.container()),
            Phase::Booting { map: Some(map), .. } => Some(map.container()),
            Phase::Booting { map: None, .. } => None,
        }
    }

    /// The map's listing, or empty while no map exists.
    pub fn datasets(&self) -> Vec<Dataset> {
        match &self.phase {
            Phase::Ready(session) => session.map.list_datasets(),
            Phase::Booting { map: Some(map), .. } => map.list_datasets(),
            Phase::Booting { map: None, .. } => Vec::new(),
        }
    }

    pub fn inspected(&self) -> Option<&DatasetWithData> {
        match &self.phase {
            Phase::Ready(session) => session.inspected.as_ref(),
            Phase::Booting { .. } => None,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn execute(&mut self, op: Operation) -> Result<Outcome, SessionError> {
        match op {
            Operation::Add => self.add_dataset(),
            Operation::Update => self.update_dataset(),
            Operation::Replace => self.replace_dataset(),
            Operation::Display => self.display_dataset(),
            Operation::Remove => self.remove_dataset(),
            Operation::CloseInspection => self.close_inspection(),
        }
    }

    /// Adds the next payload, unless the map already holds a dataset.
    pub fn add_dataset(&mut self) -> Result<Outcome, SessionError> {
        let result = self.try_add();
        self.finish(Operation::Add, result)
    }

    /// Relabels the first dataset and gives it a fresh random color.
    pub fn update_dataset(&mut self) -> Result<Outcome, SessionError> {
        let result = self.try_update();
        self.finish(Operation::Update, result)
    }

    /// Swaps the next payload on the map for the alternate, then rotates the pair.
    pub fn replace_dataset(&mut self) -> Result<Outcome, SessionError> {
        let result = self.try_replace();
        self.finish(Operation::Replace, result)
    }

    /// Snapshots the first dataset with its data for inspection.
    pub fn display_dataset(&mut self) -> Result<Outcome, SessionError> {
        let result = self.try_display();
        self.finish(Operation::Display, result)
    }

    pub fn remove_dataset(&mut self) -> Result<Outcome, SessionError> {
        let result = self.try_remove();
        self.finish(Operation::Remove, result)
    }

    pub fn close_inspection(&mut self) -> Result<Outcome, SessionError> {
        let result = self.try_close();
        self.finish(Operation::CloseInspection, result)
    }

    fn try_add(&mut self) -> Result<Outcome, SessionError> {
        let session = match ready_session(&mut self.phase) {
            Ok(session) => session,
            Err(skip) => return Ok(skip),
        };
        if !session.map.list_datasets().is_empty() {
            return Ok(Outcome::Skipped(SkipReason::AlreadyHasDataset));
        }
        let added = session.map.add_dataset(session.pair.next().clone())?;
        debug!("added dataset {}", added.id);
        Ok(Outcome::Applied)
    }

    fn try_update(&mut self) -> Result<Outcome, SessionError> {
        let session = match ready_session(&mut self.phase) {
            Ok(session) => session,
            Err(skip) => return Ok(skip),
        };
        let first = first_dataset(session.map.as_ref())?;
        let update = DatasetUpdate {
            label: Some(UPDATED_LABEL.to_string()),
            color: Some(random_color(&mut self.rng)),
        };
        let updated = session.map.update_dataset(&first.id, update)?;
        debug!("dataset {} now {} / {}", updated.id, updated.label, updated.color);
        Ok(Outcome::Applied)
    }

    fn try_replace(&mut self) -> Result<Outcome, SessionError> {
        let session = match ready_session(&mut self.phase) {
            Ok(session) => session,
            Err(skip) => return Ok(skip),
        };
        let from = session.pair.next().id.clone();
        let replacement = session.pair.alternate().clone();
        let replaced = session.map.replace_dataset(&from, replacement)?;
        session.pair.rotate();
        debug!("replaced {from} with {}", replaced.id);
        Ok(Outcome::Applied)
    }

    fn try_display(&mut self) -> Result<Outcome, SessionError> {
        let session = match ready_session(&mut self.phase) {
            Ok(session) => session,
            Err(skip) => return Ok(skip),
        };
        let first = first_dataset(session.map.as_ref())?;
        let full = session.map.read_dataset_with_data(&first.id)?;
        session.inspected = Some(full);
        Ok(Outcome::Applied)
    }

    fn try_remove(&mut self) -> Result<Outcome, SessionError> {
        let session = match ready_session(&mut self.phase) {
            Ok(session) => session,
            Err(skip) => return Ok(skip),
        };
        let first = first_dataset(session.map.as_ref())?;
        session.map.remove_dataset(&first.id)?;
        Ok(Outcome::Applied)
    }

    fn try_close(&mut self) -> Result<Outcome, SessionError> {
        let session = match ready_session(&mut self.phase) {
            Ok(session) => session,
            Err(skip) => return Ok(skip),
        };
        if session.inspected.take().is_some() {
            Ok(Outcome::Applied)
        } else {
            Ok(Outcome::Skipped(SkipReason::NothingInspected))
        }
    }

    fn finish(
        &mut self,
        op: Operation,
        result: Result<Outcome, SessionError>,
    ) -> Result<Outcome, SessionError> {
        match &result {
            Ok(Outcome::Applied) => {
                info!("{op}: applied");
                self.events.emit("op.applied", op.name());
                self.metrics.inc_counter("ops.applied", 1);
            }
            Ok(Outcome::Skipped(reason)) => {
                info!("{op}: skipped. {reason}");
                self.events.emit("op.skipped", format!("{op}: {reason}"));
                self.metrics.inc_counter("ops.skipped", 1);
            }
            Err(e) => {
                warn!("{op} failed: {e}");
                self.events.emit("op.failed", format!("{op}: {e}"));
                self.metrics.inc_counter("ops.failed", 1);
            }
        }
        if self.controls_enabled() {
            let datasets = self.datasets().len() as i64;
            self.metrics.set_gauge("map.datasets", datasets);
        }
        result
    }
}

fn ready_session(phase: &mut Phase) -> Result<&mut ReadySession, Outcome> {
    let readiness = phase.readiness();
    match phase {
        Phase::Ready(session) => Ok(session),
        Phase::Booting { .. } => Err(Outcome::Skipped(SkipReason::NotReady(readiness))),
    }
}

fn first_dataset(map: &dyn MapSession) -> Result<Dataset, SessionError> {
    map.list_datasets()
        .into_iter()
        .next()
        .ok_or(SessionError::NoDataset)
}

/// Each channel uniform over `0..=255`, drawn fresh on every call.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Rgb {
    Rgb::new(rng.gen(), rng.gen(), rng.gen())
}
