pub mod color;
pub mod ids;

// Foundation crate: small, well-tested primitives only.
pub use color::*;
pub use ids::*;
