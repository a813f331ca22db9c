//! Errors surfaced by the index adapter (spec §4.1): "any engine error is surfaced as
//! `RetrievalBackendFailure`; the adapter never silently returns empty."

use cairn_core::ids::ChunkId;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage engine failure: {0}")]
    Backend(String),

    #[error("chunk not found: {0}")]
    ChunkNotFound(ChunkId),
}

impl From<StoreError> for cairn_error::Error {
    fn from(value: StoreError) -> Self {
        cairn_error::Error::RetrievalBackendFailure(value.to_string())
    }
}
