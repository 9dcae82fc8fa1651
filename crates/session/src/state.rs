use catalog::{DatasetWithData, MapSession};

use crate::gate::BootstrapFailure;
use crate::source::SamplePair;

/// Where the session is in its lifecycle.
///
/// The map and the sample pair arrive independently while `Booting`; once both
/// are present the session moves to `Ready` and never leaves it.
pub(crate) enum Phase {
    Booting {
        map: Option<Box<dyn MapSession>>,
        pair: Option<SamplePair>,
        failure: Option<BootstrapFailure>,
    },
    Ready(ReadySession),
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Booting {
            map: None,
            pair: None,
            failure: None,
        }
    }
}

/// Everything a user operation may touch.
///
/// In this demonstration flow at most one dataset is attached to `map` at a
/// time; "the first dataset" is index 0 of its listing.
pub(crate) struct ReadySession {
    pub(crate) map: Box<dyn MapSession>,
    pub(crate) pair: SamplePair,
    /// Snapshot taken by the last display; never refreshed behind the user's back.
    pub(crate) inspected: Option<DatasetWithData>,
}

impl Phase {
    pub(crate) fn readiness(&self) -> Readiness {
        match self {
            Phase::Ready(_) => Readiness::Ready,
            Phase::Booting {
                failure: Some(f), ..
            } => Readiness::Failed(f.clone()),
            Phase::Booting { map, pair, .. } => Readiness::Pending {
                map: map.is_none(),
                data: pair.is_none(),
            },
        }
    }

    /// Moves to `Ready` once both halves are present and nothing failed.
    pub(crate) fn promote(&mut self) {
        *self = match std::mem::take(self) {
            Phase::Booting {
                map: Some(map),
                pair: Some(pair),
                failure: None,
            } => Phase::Ready(ReadySession {
                map,
                pair,
                inspected: None,
            }),
            other => other,
        };
    }
}

/// Whether user operations are available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// `true` marks the half still outstanding.
    Pending { map: bool, data: bool },
    /// A bootstrap task failed; the session will never become ready.
    Failed(BootstrapFailure),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Readiness::Ready => write!(f, "Ready."),
            Readiness::Pending { map: true, data: true } => {
                write!(f, "Map not yet initialized. Data not yet loaded.")
            }
            Readiness::Pending { map: true, .. } => write!(f, "Map not yet initialized."),
            Readiness::Pending { data: true, .. } => write!(f, "Data not yet loaded."),
            // Both halves present but not yet promoted; only observable mid-event.
            Readiness::Pending { .. } => write!(f, "Starting."),
            Readiness::Failed(failure) => write!(f, "Startup failed: {failure}."),
        }
    }
}
