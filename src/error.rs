use thiserror::Error;

pub type GradebookResult<T> = Result<T, GradebookError>;

/// Failures surfaced by gradebook operations. Every variant is raised before
/// any state is touched, so the previous state is always intact.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradebookError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    NotReady(String),

    #[error("weights must total 100 (currently {total:.2})")]
    SchemaInvalid { total: f64 },

    #[error("{0}")]
    Persistence(String),
}

impl GradebookError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::NotReady(_) => "not_ready",
            Self::SchemaInvalid { .. } => "schema_invalid",
            Self::Persistence(_) => "persistence_failed",
        }
    }
}

impl From<anyhow::Error> for GradebookError {
    fn from(e: anyhow::Error) -> Self {
        Self::Persistence(format!("{e:#}"))
    }
}
