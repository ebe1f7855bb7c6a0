/// Everything that can stop a document edit from being applied.
///
/// None of these reach the host shell: commands turn them into no-ops and the
/// compositor turns highlighting failures into "keep the last good layer".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("Stale position {pos} (document size {size})")]
    StalePosition { pos: usize, size: usize },

    #[error("Unexpected node at {pos}: expected {expected}")]
    UnexpectedNode { pos: usize, expected: String },

    #[error("Unsupported step: {0}")]
    UnsupportedStep(String),
}

impl EngineError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        EngineError::SchemaViolation(message.into())
    }

    /// True for the errors callers should treat as "the position no longer
    /// points where you think it does".
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            EngineError::StalePosition { .. } | EngineError::UnexpectedNode { .. }
        )
    }
}

/// Failure while reading the HTML interchange format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterchangeError {
    #[error("Document does not fit the schema: {0}")]
    Schema(#[from] EngineError),
}

pub type EngineResult<T> = Result<T, EngineError>;
