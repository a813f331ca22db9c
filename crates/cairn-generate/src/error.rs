//! Errors surfaced by the answer generator (spec §4.3, §7).

#[derive(thiserror::Error, Debug)]
pub enum GenerateError {
    #[error("generation backend unavailable: {0}")]
    Backend(String),

    #[error("structured response did not conform to schema: {0}")]
    Malformed(String),
}

impl From<GenerateError> for cairn_error::Error {
    fn from(value: GenerateError) -> Self {
        match value {
            GenerateError::Backend(msg) => cairn_error::Error::GenerationBackendFailure(msg),
            GenerateError::Malformed(msg) => cairn_error::Error::StructuredResponseMalformed(msg),
        }
    }
}
