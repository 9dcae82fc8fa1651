use catalog::MapError;

/// Failure of a single user operation. Never fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The operation needs a dataset on the map and there is none.
    #[error("No dataset.")]
    NoDataset,
    #[error(transparent)]
    Map(#[from] MapError),
}
