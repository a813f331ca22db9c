//! Router-level error handling.
//!
//! Per spec §4.4, only `RetrievalBackendFailure` during RETRIEVE is propagated to the
//! caller; every other node failure is downgraded to an abstention artifact. This type
//! exists only for the one propagated path.

#[derive(thiserror::Error, Debug)]
pub enum RouterError {
    #[error(transparent)]
    Retrieve(#[from] cairn_retrieve::RetrieveError),
}

impl From<RouterError> for cairn_error::Error {
    fn from(value: RouterError) -> Self {
        match value {
            RouterError::Retrieve(e) => e.into(),
        }
    }
}
