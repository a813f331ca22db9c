//! Errors surfaced by the hybrid retriever (spec §4.2: "surfaces `RetrievalBackendFailure`
//! only if every sub-retriever fails").

#[derive(thiserror::Error, Debug)]
pub enum RetrieveError {
    #[error("all sub-retrievers failed: {0}")]
    AllSubRetrieversFailed(String),

    #[error(transparent)]
    Store(#[from] cairn_store::StoreError),
}

impl From<RetrieveError> for cairn_error::Error {
    fn from(value: RetrieveError) -> Self {
        cairn_error::Error::RetrievalBackendFailure(value.to_string())
    }
}
