use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The store could not be read. Distinct from a student with no activity.
    #[error("activity data unavailable: {0}")]
    DataUnavailable(#[from] sqlx::Error),

    #[error("student not found: {0}")]
    StudentNotFound(String),

    #[error("activity {0} not found")]
    ActivityNotFound(Uuid),

    #[error("unknown {kind} value: {value}")]
    InvalidValue { kind: &'static str, value: String },

    #[error("validation failed: {0}")]
    Validation(String),
}
