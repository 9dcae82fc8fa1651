//! Dataset session for an embedded map.
//!
//! [`BootstrapGate`] starts the map and the sample-data fetch side by side and
//! feeds their completions to a [`DatasetSessionCoordinator`], which runs the
//! user operations once both have arrived.

pub mod coordinator;
pub mod error;
pub mod gate;
pub mod source;
mod state;

pub use coordinator::*;
pub use error::SessionError;
pub use gate::*;
pub use source::*;
pub use state::Readiness;
