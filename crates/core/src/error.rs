use thiserror::Error;

/// Failures of the structuring and mapping stages
#[derive(Debug, Error)]
pub enum NoteError {
    /// Model output is not valid JSON once the code fence is removed
    #[error("model output is not valid JSON: {source}")]
    StructureParse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    /// Model output parsed but does not match the note shape
    #[error("invalid value at `{field}`: {message}")]
    StructureValidation { field: String, message: String },

    /// The note reached the mapper in a state upstream stages should have rejected
    #[error("cannot map note: {0}")]
    Mapping(String),
}

impl NoteError {
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        NoteError::StructureValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}
